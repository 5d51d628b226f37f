use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Completion, Provider, Usage};
use super::configs::GoogleProviderConfig;
use crate::errors::ProviderError;

pub const GOOGLE_MODELS: &[&str] = &["gemini-1.5-pro"];

pub struct GoogleProvider {
    client: Client,
    config: GoogleProviderConfig,
}

impl GoogleProvider {
    pub fn new(config: GoogleProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, model: &str, payload: Value) -> Result<Value, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.host.trim_end_matches('/'),
            model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
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
                    provider: "google",
                    message: format!("request failed: {} - {}", status, body),
                })
            }
        }
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn models(&self) -> &'static [&'static str] {
        GOOGLE_MODELS
    }

    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: i32,
    ) -> Result<Completion, ProviderError> {
        let payload = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}]
            }],
            "generationConfig": {
                "temperature": temperature,
                "maxOutputTokens": max_tokens
            }
        });

        let response = self.post(model, payload).await?;

        if let Some(error) = response.get("error") {
            return Err(ProviderError::Api {
                provider: "google",
                message: error.to_string(),
            });
        }

        let content = response["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: "google",
                message: "missing candidate text".to_string(),
            })?
            .to_string();

        // The generateContent endpoint does not report usage for this
        // request shape, so the total is an intentionally rough estimate
        // of one token per four characters.
        let estimated = (content.len() / 4) as i32;
        let usage = Usage::new(None, None, Some(estimated));

        Ok(Completion {
            content,
            model: model.to_string(),
            usage,
        })
    }
}
