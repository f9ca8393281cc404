//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use baton_engine::config::LLMConfig;
use baton_engine::llm::router::LLMRouter;
use baton_engine::llm::{
    GenerationRequest, LLMError, LLMProvider, LLMResponse, MessageRole, Result,
};
use sdk::errors::EngineError;
use sdk::specialist::Specialist;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Provider that plans a fixed list of steps, answers every task with
/// `Result: <task>` and merges everything it is asked to synthesize.
pub struct ScenarioProvider {
    steps: Vec<String>,
    fail_synthesis: bool,
    pub calls: Arc<AtomicUsize>,
}

impl ScenarioProvider {
    pub fn new(steps: &[&str]) -> Self {
        Self {
            steps: steps.iter().map(|s| s.to_string()).collect(),
            fail_synthesis: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_synthesis(mut self) -> Self {
        self.fail_synthesis = true;
        self
    }
}

fn message(request: &GenerationRequest, role: MessageRole) -> String {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == role)
        .map(|m| m.content.clone())
        .unwrap_or_default()
}

#[async_trait]
impl LLMProvider for ScenarioProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn is_local(&self) -> bool {
        true
    }

    fn supports_structured_output(&self) -> bool {
        true
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if request.schema.is_some() {
            return Ok(LLMResponse::Structured(json!({ "tasks": self.steps })));
        }

        let system = message(request, MessageRole::System);
        let user = message(request, MessageRole::User);

        if system.starts_with("You are the Synthesizer") {
            if self.fail_synthesis {
                return Err(LLMError::ProviderUnavailable("synthesis down".to_string()));
            }
            return Ok(LLMResponse::Text(format!("FINAL REPORT\n{}", user)));
        }

        Ok(LLMResponse::Text(format!("Result: {}", user)))
    }
}

/// Router over one provider with millisecond retries
pub fn router(provider: impl LLMProvider + 'static) -> Arc<LLMRouter> {
    let config = LLMConfig {
        timeout_secs: 5,
        max_retries: 1,
        retry_base_delay_ms: 1,
        ..Default::default()
    };
    Arc::new(LLMRouter::new(vec![Box::new(provider)], Arc::new(config)))
}

/// Specialist that always fails
pub struct FailingSpecialist {
    pub id: String,
}

#[async_trait]
impl Specialist for FailingSpecialist {
    fn id(&self) -> &str {
        &self.id
    }

    async fn handle(&self, _task: &str) -> std::result::Result<String, EngineError> {
        Err(EngineError::SpecialistFailed {
            id: self.id.clone(),
            reason: "notes are unreadable".to_string(),
        })
    }
}

/// Specialist that records every task it receives
pub struct RecordingSpecialist {
    pub id: String,
    pub seen: Arc<Mutex<Vec<String>>>,
}

impl RecordingSpecialist {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Specialist for RecordingSpecialist {
    fn id(&self) -> &str {
        &self.id
    }

    async fn handle(&self, task: &str) -> std::result::Result<String, EngineError> {
        self.seen.lock().unwrap().push(task.to_string());
        Ok(format!("{} handled: {}", self.id, task))
    }
}
