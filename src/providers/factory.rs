use strum_macros::EnumIter;

use super::{
    anthropic::AnthropicProvider, base::Provider, configs::ProviderConfig, google::GoogleProvider,
    openai::OpenAiProvider,
};
use crate::errors::ProviderError;

/// The three interchangeable backends. Declaration order doubles as the
/// fixed fallback preference order used by the dispatcher.
#[derive(EnumIter, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenAi,
    Google,
    Anthropic,
}

impl ProviderType {
    /// Resolve a requested model name to its backend family by prefix
    /// convention: `gpt-*` and `o1-*` are OpenAI, `claude-*` is
    /// Anthropic, `gemini-*` is Google. Unknown names match nothing.
    pub fn for_model(model: &str) -> Option<ProviderType> {
        if model.starts_with("gpt") || model.starts_with("o1") {
            Some(ProviderType::OpenAi)
        } else if model.starts_with("claude") {
            Some(ProviderType::Anthropic)
        } else if model.starts_with("gemini") {
            Some(ProviderType::Google)
        } else {
            None
        }
    }
}

pub fn get_provider(config: ProviderConfig) -> Result<Box<dyn Provider + Send + Sync>, ProviderError> {
    match config {
        ProviderConfig::OpenAi(openai_config) => Ok(Box::new(OpenAiProvider::new(openai_config)?)),
        ProviderConfig::Anthropic(anthropic_config) => {
            Ok(Box::new(AnthropicProvider::new(anthropic_config)?))
        }
        ProviderConfig::Google(google_config) => Ok(Box::new(GoogleProvider::new(google_config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_routing() {
        assert_eq!(ProviderType::for_model("gpt-4"), Some(ProviderType::OpenAi));
        assert_eq!(
            ProviderType::for_model("o1-preview"),
            Some(ProviderType::OpenAi)
        );
        assert_eq!(
            ProviderType::for_model("claude-3-5-sonnet-20240620"),
            Some(ProviderType::Anthropic)
        );
        assert_eq!(
            ProviderType::for_model("gemini-1.5-pro"),
            Some(ProviderType::Google)
        );
        assert_eq!(ProviderType::for_model("llama-3"), None);
        assert_eq!(ProviderType::for_model(""), None);
    }
}
