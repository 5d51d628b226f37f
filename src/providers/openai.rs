use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Completion, Provider, Usage};
use super::configs::OpenAiProviderConfig;
use crate::errors::ProviderError;

pub const OPENAI_MODELS: &[&str] = &["gpt-4", "gpt-3.5-turbo"];

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Result<Usage, ProviderError> {
        let usage = data
            .get("usage")
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: "openai",
                message: "no usage data in response".to_string(),
            })?;

        let input_tokens = usage
            .get("prompt_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let output_tokens = usage
            .get("completion_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let total_tokens = usage
            .get("total_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32)
            .or_else(|| match (input_tokens, output_tokens) {
                (Some(input), Some(output)) => Some(input + output),
                _ => None,
            });

        Ok(Usage::new(input_tokens, output_tokens, total_tokens))
    }

    async fn post(&self, payload: Value) -> Result<Value, ProviderError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
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
                    provider: "openai",
                    message: format!("request failed: {} - {}", status, body),
                })
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn models(&self) -> &'static [&'static str] {
        OPENAI_MODELS
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
            "messages": [{
                "role": "user",
                "content": prompt
            }],
            "temperature": temperature,
            "max_tokens": max_tokens
        });

        let response = self.post(payload).await?;

        if let Some(error) = response.get("error") {
            return Err(ProviderError::Api {
                provider: "openai",
                message: error.to_string(),
            });
        }

        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: "openai",
                message: "missing message content".to_string(),
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
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_mock_server(response_body: Value) -> (MockServer, OpenAiProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let config = OpenAiProviderConfig {
            host: mock_server.uri(),
            api_key: "test_api_key".to_string(),
        };

        let provider = OpenAiProvider::new(config).unwrap();
        (mock_server, provider)
    }

    #[tokio::test]
    async fn test_complete_basic() -> Result<(), ProviderError> {
        let response_body = json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "{\"core_value_proposition\": \"fast relief\"}"
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 12,
                "completion_tokens": 15,
                "total_tokens": 27
            }
        });

        let (_, provider) = setup_mock_server(response_body).await;

        let completion = provider.complete("gpt-4", "Research this product.", 0.3, 3000).await?;

        assert_eq!(
            completion.content,
            "{\"core_value_proposition\": \"fast relief\"}"
        );
        assert_eq!(completion.model, "gpt-4");
        assert_eq!(completion.usage.input_tokens, Some(12));
        assert_eq!(completion.usage.output_tokens, Some(15));
        assert_eq!(completion.usage.total_tokens, Some(27));

        Ok(())
    }

    #[tokio::test]
    async fn test_total_tokens_summed_when_absent() -> Result<(), ProviderError> {
        let response_body = json!({
            "choices": [{
                "message": {"role": "assistant", "content": "ok"}
            }],
            "usage": {
                "prompt_tokens": 10,
                "completion_tokens": 5
            }
        });

        let (_, provider) = setup_mock_server(response_body).await;
        let completion = provider.complete("gpt-4", "hi", 0.7, 100).await?;
        assert_eq!(completion.usage.total_tokens, Some(15));
        Ok(())
    }

    #[tokio::test]
    async fn test_server_error_is_transport() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let config = OpenAiProviderConfig {
            host: mock_server.uri(),
            api_key: "test_api_key".to_string(),
        };
        let provider = OpenAiProvider::new(config).unwrap();

        let result = provider.complete("gpt-4", "hi", 0.7, 100).await;
        assert!(matches!(result, Err(ProviderError::Transport(_))));
    }

    #[tokio::test]
    async fn test_bad_request_is_api_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string("{\"error\": \"invalid key\"}"),
            )
            .mount(&mock_server)
            .await;

        let config = OpenAiProviderConfig {
            host: mock_server.uri(),
            api_key: "revoked".to_string(),
        };
        let provider = OpenAiProvider::new(config).unwrap();

        let result = provider.complete("gpt-4", "hi", 0.7, 100).await;
        match result {
            Err(ProviderError::Api { provider, message }) => {
                assert_eq!(provider, "openai");
                assert!(message.contains("invalid key"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
