use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// A normalized reply from one backend invocation.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub model: String,
    pub usage: Usage,
}

/// One generation request as issued by a workflow step. Created per user
/// action and consumed once.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: i32,
}

/// Base trait for text-generation backends (OpenAI, Anthropic, Gemini).
///
/// The prompt is sent as a single user-role message; the reply is
/// normalized into a [`Completion`]. Implementations report application
/// errors as [`ProviderError::Api`] and network failures as
/// [`ProviderError::Transport`].
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Static catalog of model identifiers this backend serves.
    fn models(&self) -> &'static [&'static str];

    fn default_model(&self) -> &'static str {
        self.models()[0]
    }

    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: i32,
    ) -> Result<Completion, ProviderError>;
}
