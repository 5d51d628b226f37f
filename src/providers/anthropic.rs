use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Completion, Provider, Usage};
use super::configs::AnthropicProviderConfig;
use crate::errors::ProviderError;

pub const ANTHROPIC_MODELS: &[&str] = &["claude-3-5-sonnet-20240620"];

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Result<Usage, ProviderError> {
        let usage = data
            .get("usage")
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: "anthropic",
                message: "no usage data in response".to_string(),
            })?;

        let input_tokens = usage
            .get("input_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let output_tokens = usage
            .get("output_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let total_tokens = match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        };

        Ok(Usage::new(input_tokens, output_tokens, total_tokens))
    }

    async fn post(&self, payload: Value) -> Result<Value, ProviderError> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(ProviderError::Transport(format!("server error: {}", status)))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ProviderError::Api {
                    provider: "anthropic",
                    message: format!("request failed: {} - {}", status, body),
                })
            }
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn models(&self) -> &'static [&'static str] {
        ANTHROPIC_MODELS
    }

    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: i32,
    ) -> Result<Completion, ProviderError> {
        let payload = json!({
            "model": model,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "messages": [{
                "role": "user",
                "content": prompt
            }]
        });

        let response = self.post(payload).await?;

        if let Some(error) = response.get("error") {
            return Err(ProviderError::Api {
                provider: "anthropic",
                message: error.to_string(),
            });
        }

        let content = response
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|first| first.get("text"))
            .and_then(|text| text.as_str())
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: "anthropic",
                message: "missing content text".to_string(),
            })?
            .to_string();

        let usage = Self::get_usage(&response)?;

        Ok(Completion {
            content,
            model: model.to_string(),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_mock_server(response_body: Value) -> (MockServer, AnthropicProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test_api_key"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let config = AnthropicProviderConfig {
            host: mock_server.uri(),
            api_key: "test_api_key".to_string(),
        };

        let provider = AnthropicProvider::new(config).unwrap();
        (mock_server, provider)
    }

    #[tokio::test]
    async fn test_complete_basic() -> Result<(), ProviderError> {
        let response_body = json!({
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "content": [{
                "type": "text",
                "text": "{\"headline\": \"Beat Keto Flu in 48 Hours\"}"
            }],
            "usage": {
                "input_tokens": 40,
                "output_tokens": 18
            }
        });

        let (_, provider) = setup_mock_server(response_body).await;

        let completion = provider
            .complete("claude-3-5-sonnet-20240620", "Write the hero copy.", 0.7, 2000)
            .await?;

        assert_eq!(
            completion.content,
            "{\"headline\": \"Beat Keto Flu in 48 Hours\"}"
        );
        // Token total is the sum of input and output as reported by the API.
        assert_eq!(completion.usage.total_tokens, Some(58));

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_content_is_invalid_response() {
        let response_body = json!({
            "id": "msg_456",
            "type": "message",
            "content": []
        });

        let (_, provider) = setup_mock_server(response_body).await;
        let result = provider
            .complete("claude-3-5-sonnet-20240620", "hi", 0.7, 100)
            .await;

        assert!(matches!(
            result,
            Err(ProviderError::InvalidResponse { provider: "anthropic", .. })
        ));
    }

    #[tokio::test]
    async fn test_overloaded_is_transport() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529))
            .mount(&mock_server)
            .await;

        let config = AnthropicProviderConfig {
            host: mock_server.uri(),
            api_key: "test_api_key".to_string(),
        };
        let provider = AnthropicProvider::new(config).unwrap();

        let result = provider
            .complete("claude-3-5-sonnet-20240620", "hi", 0.7, 100)
            .await;
        assert!(matches!(result, Err(ProviderError::Transport(_))));
    }
}
