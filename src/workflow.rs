pub mod session_file;
pub mod state;
pub mod step;
