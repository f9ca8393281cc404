//! LLM-backed specialist
//!
//! The stock `Specialist` implementation: a system prompt from the
//! `[[specialists]]` config table, driven by the shared router.

use crate::config::SpecialistConfig;
use crate::llm::router::LLMRouter;
use crate::llm::Message;
use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::specialist::Specialist;
use std::sync::Arc;

pub struct LlmSpecialist {
    id: String,
    description: String,
    system_prompt: String,
    router: Arc<LLMRouter>,
}

impl LlmSpecialist {
    pub fn new(config: &SpecialistConfig, router: Arc<LLMRouter>) -> Self {
        let system_prompt = if config.system_prompt.trim().is_empty() {
            format!(
                "You are the '{}' specialist. {}",
                config.id, config.description
            )
        } else {
            config.system_prompt.clone()
        };

        Self {
            id: config.id.clone(),
            description: config.description.clone(),
            system_prompt,
            router,
        }
    }
}

#[async_trait]
impl Specialist for LlmSpecialist {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn handle(&self, task: &str) -> Result<String, EngineError> {
        let messages = vec![Message::system(&self.system_prompt), Message::user(task)];
        let output = self.router.generate_text(messages).await?;
        Ok(output)
    }
}
