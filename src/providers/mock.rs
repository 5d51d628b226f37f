use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::base::{Completion, Provider, Usage};
use crate::errors::ProviderError;

/// A scripted provider for tests: returns pre-configured outcomes in
/// order and records every call it receives.
pub struct MockProvider {
    name: &'static str,
    models: &'static [&'static str],
    responses: Arc<Mutex<Vec<Result<Completion, ProviderError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    pub fn new(
        name: &'static str,
        models: &'static [&'static str],
        responses: Vec<Result<Completion, ProviderError>>,
    ) -> Self {
        Self {
            name,
            models,
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn completion(content: &str, model: &str, tokens: i32) -> Completion {
        Completion {
            content: content.to_string(),
            model: model.to_string(),
            usage: Usage::new(None, None, Some(tokens)),
        }
    }

    /// Models this mock was asked to serve, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn models(&self) -> &'static [&'static str] {
        self.models
    }

    async fn complete(
        &self,
        model: &str,
        _prompt: &str,
        _temperature: f32,
        _max_tokens: i32,
    ) -> Result<Completion, ProviderError> {
        self.calls.lock().unwrap().push(model.to_string());

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Out of scripted responses; answer with an empty completion.
            Ok(Completion {
                content: String::new(),
                model: model.to_string(),
                usage: Usage::default(),
            })
        } else {
            responses.remove(0)
        }
    }
}
