use thiserror::Error;

/// Errors raised by a single backend invocation.
///
/// Only `Transport` is retryable; the dispatcher surfaces the other
/// variants to the caller immediately.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("{provider} API error: {message}")]
    Api {
        provider: &'static str,
        message: String,
    },

    #[error("invalid response from {provider}: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Transport(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}

/// Errors returned by the dispatcher boundary.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No backend has a credential configured. Reported without any
    /// network I/O or retry delay.
    #[error("no providers available")]
    NoProvidersAvailable,

    /// A backend rejected the request at the application level.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// Failure of the best-effort JSON extractor. The raw text is carried
/// along so a failed response can still be inspected.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("no JSON object found in response")]
    NoJsonObject,

    #[error("response contained malformed JSON: {source}")]
    Parse {
        source: serde_json::Error,
        raw: String,
    },
}

/// Errors from the step flow layered over the dispatcher and the store.
#[derive(Error, Debug)]
pub enum WizardError {
    #[error("step {0} is locked until the preceding steps are completed")]
    StepLocked(usize),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}
