pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const ANTHROPIC_HOST: &str = "https://api.anthropic.com";
pub const GOOGLE_HOST: &str = "https://generativelanguage.googleapis.com";

// Unified enum to wrap different provider configurations
pub enum ProviderConfig {
    OpenAi(OpenAiProviderConfig),
    Anthropic(AnthropicProviderConfig),
    Google(GoogleProviderConfig),
}

pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
}

impl OpenAiProviderConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            host: OPENAI_HOST.to_string(),
            api_key,
        }
    }
}

pub struct AnthropicProviderConfig {
    pub host: String,
    pub api_key: String,
}

impl AnthropicProviderConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            host: ANTHROPIC_HOST.to_string(),
            api_key,
        }
    }
}

pub struct GoogleProviderConfig {
    pub host: String,
    pub api_key: String,
}

impl GoogleProviderConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            host: GOOGLE_HOST.to_string(),
            api_key,
        }
    }
}
