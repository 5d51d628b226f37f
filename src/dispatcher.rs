use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::errors::{DispatchError, ProviderError};
use crate::key_manager::{Credentials, Environment};
use crate::providers::base::{GenerationRequest, Provider};
use crate::providers::configs::{
    AnthropicProviderConfig, GoogleProviderConfig, OpenAiProviderConfig, ProviderConfig,
};
use crate::providers::factory::{get_provider, ProviderType};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY_SECS: (f64, f64) = (1.0, 3.0);

/// A successful generation, normalized across backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    pub content: String,
    pub model_used: String,
    pub tokens_used: i32,
}

/// Availability of each backend after configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub openai: bool,
    pub google: bool,
    pub anthropic: bool,
}

/// Routes generation requests to one of three backends.
///
/// Requested models are matched to a backend by name prefix; when the
/// matching backend is not available the first available backend in the
/// fixed preference order (OpenAI, Gemini, Anthropic) takes the request
/// with its own default model. Transport failures are retried with a
/// jittered backoff; application errors are surfaced immediately.
pub struct Dispatcher {
    // Held in preference order; entries exist only for available backends.
    providers: Vec<(ProviderType, Box<dyn Provider + Send + Sync>)>,
    retry_delay_secs: (f64, f64),
}

impl Dispatcher {
    pub fn new(providers: Vec<(ProviderType, Box<dyn Provider + Send + Sync>)>) -> Self {
        Self {
            providers,
            retry_delay_secs: RETRY_DELAY_SECS,
        }
    }

    /// Probe each backend's canonical credential and configure the ones
    /// that are present. Zero available backends is a valid state; it is
    /// reported through [`DispatchError::NoProvidersAvailable`] on the
    /// first generation call rather than raised here.
    pub fn from_environment(env: &impl Environment) -> Self {
        let credentials = Credentials::load(env);
        let mut providers: Vec<(ProviderType, Box<dyn Provider + Send + Sync>)> = Vec::new();

        let configured: [(ProviderType, Option<ProviderConfig>); 3] = [
            (
                ProviderType::OpenAi,
                credentials
                    .openai
                    .map(|key| ProviderConfig::OpenAi(OpenAiProviderConfig::new(key))),
            ),
            (
                ProviderType::Google,
                credentials
                    .google
                    .map(|key| ProviderConfig::Google(GoogleProviderConfig::new(key))),
            ),
            (
                ProviderType::Anthropic,
                credentials
                    .anthropic
                    .map(|key| ProviderConfig::Anthropic(AnthropicProviderConfig::new(key))),
            ),
        ];

        for (kind, config) in configured {
            let Some(config) = config else {
                info!(provider = ?kind, "no credential configured, provider unavailable");
                continue;
            };
            match get_provider(config) {
                Ok(provider) => {
                    info!(provider = provider.name(), "provider configured");
                    providers.push((kind, provider));
                }
                Err(err) => {
                    warn!(provider = ?kind, error = %err, "provider failed to initialize, marked unavailable");
                }
            }
        }

        if providers.is_empty() {
            warn!("no providers available; generation calls will fail fast");
        }

        Self::new(providers)
    }

    /// Override the retry backoff window. Tests use this to keep the
    /// jittered sleeps short.
    pub fn with_retry_delay(mut self, min_secs: f64, max_secs: f64) -> Self {
        self.retry_delay_secs = (min_secs, max_secs);
        self
    }

    pub fn provider_status(&self) -> ProviderStatus {
        let has = |kind| self.providers.iter().any(|(k, _)| *k == kind);
        ProviderStatus {
            openai: has(ProviderType::OpenAi),
            google: has(ProviderType::Google),
            anthropic: has(ProviderType::Anthropic),
        }
    }

    /// The static model catalog of every available backend, in backend
    /// declaration order.
    pub fn available_models(&self) -> Vec<String> {
        self.providers
            .iter()
            .flat_map(|(_, p)| p.models().iter().map(|m| m.to_string()))
            .collect()
    }

    /// Resolve the requested model to a backend and the model actually
    /// sent to it. A prefix match wins only if that backend is
    /// available; otherwise the first available backend handles the
    /// request with its own default model.
    fn resolve(&self, requested: &str) -> (&(dyn Provider + Send + Sync), String) {
        if let Some(kind) = ProviderType::for_model(requested) {
            if let Some((_, provider)) = self.providers.iter().find(|(k, _)| *k == kind) {
                return (provider.as_ref(), requested.to_string());
            }
        }
        let (_, provider) = &self.providers[0];
        (provider.as_ref(), provider.default_model().to_string())
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<Generation, DispatchError> {
        if self.providers.is_empty() {
            return Err(DispatchError::NoProvidersAvailable);
        }

        let mut last_error = String::new();
        for attempt in 1..=MAX_ATTEMPTS {
            let (provider, model) = self.resolve(&request.model);

            match provider
                .complete(&model, &request.prompt, request.temperature, request.max_tokens)
                .await
            {
                Ok(completion) => {
                    return Ok(Generation {
                        tokens_used: completion.usage.total_tokens.unwrap_or_default(),
                        content: completion.content,
                        model_used: completion.model,
                    });
                }
                Err(err) if err.is_retryable() => {
                    warn!(
                        provider = provider.name(),
                        attempt, error = %err, "transport failure"
                    );
                    last_error = err.to_string();
                    if attempt < MAX_ATTEMPTS {
                        sleep(self.jitter()).await;
                    }
                }
                Err(err @ ProviderError::Api { .. })
                | Err(err @ ProviderError::InvalidResponse { .. }) => {
                    // Application-level rejections do not improve with
                    // retries; surface them as-is.
                    return Err(DispatchError::Provider(err));
                }
                Err(err) => return Err(DispatchError::Provider(err)),
            }
        }

        Err(DispatchError::RetriesExhausted {
            attempts: MAX_ATTEMPTS,
            last_error,
        })
    }

    fn jitter(&self) -> Duration {
        let (min, max) = self.retry_delay_secs;
        let secs = rand::thread_rng().gen_range(min..max);
        Duration::from_secs_f64(secs)
    }
}
