//! Shared helpers for unit tests

use crate::config::LLMConfig;
use crate::llm::router::LLMRouter;
use crate::llm::{GenerationRequest, LLMError, LLMProvider, LLMResponse, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Responder = dyn Fn(&GenerationRequest) -> Result<LLMResponse> + Send + Sync;

/// Provider whose answers are computed from the request
pub struct ScriptedProvider {
    structured: bool,
    responder: Box<Responder>,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new<F>(structured: bool, responder: F) -> Self
    where
        F: Fn(&GenerationRequest) -> Result<LLMResponse> + Send + Sync + 'static,
    {
        Self {
            structured,
            responder: Box::new(responder),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always fails with a generation error
    pub fn failing() -> Self {
        Self::new(true, |_| Err(LLMError::ProviderUnavailable("offline".to_string())))
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn is_local(&self) -> bool {
        true
    }

    fn supports_structured_output(&self) -> bool {
        self.structured
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.responder)(request)
    }
}

/// Last user message of a request
pub fn user_prompt(request: &GenerationRequest) -> &str {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == crate::llm::MessageRole::User)
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

/// System message of a request
pub fn system_prompt(request: &GenerationRequest) -> &str {
    request
        .messages
        .iter()
        .find(|m| m.role == crate::llm::MessageRole::System)
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

/// Router over a single provider with fast retries
pub fn router_with(provider: ScriptedProvider) -> Arc<LLMRouter> {
    let config = LLMConfig {
        timeout_secs: 5,
        max_retries: 1,
        retry_base_delay_ms: 1,
        ..Default::default()
    };
    Arc::new(LLMRouter::new(vec![Box::new(provider)], Arc::new(config)))
}
