pub mod dispatcher;
pub mod errors;
pub mod key_manager;
pub mod outputs;
pub mod providers;
pub mod wizard;
pub mod workflow;
