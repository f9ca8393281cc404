//! Conductor Executor
//!
//! Handles tasks that no specialist claims: one generation call per task,
//! with the run goal as context.

use crate::conductor::types::Task;
use crate::llm::router::LLMRouter;
use crate::llm::Message;
use sdk::errors::EngineError;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Executes generic tasks through the LLM router
pub struct Executor {
    router: Arc<LLMRouter>,
}

impl Executor {
    pub fn new(router: Arc<LLMRouter>) -> Self {
        Self { router }
    }

    /// Execute a single task and return its result text
    pub async fn execute(&self, task: &Task, goal: &str) -> Result<String, EngineError> {
        let start = Instant::now();

        let system = Message::system(format!(
            "You are executing one step of a larger plan.\n\
            Overall goal: {}\n\n\
            Complete the step below and answer with the finished result only. \
            Be concrete and self-contained: your answer is merged with the other \
            steps into the final report.",
            goal
        ));
        let messages = vec![system, Message::user(&task.description)];

        debug!("Task {} sent to executor", task.id);

        match self.router.generate_text(messages).await {
            Ok(output) if output.trim().is_empty() => {
                warn!("Task {} produced an empty answer", task.id);
                Err(EngineError::Generation(format!(
                    "empty answer for task {}",
                    task.id
                )))
            }
            Ok(output) => {
                info!(
                    "Task {} completed in {:.1}s ({} chars)",
                    task.id,
                    start.elapsed().as_secs_f64(),
                    output.len()
                );
                Ok(output)
            }
            Err(e) => {
                warn!(
                    "Task {} failed after {:.1}s: {}",
                    task.id,
                    start.elapsed().as_secs_f64(),
                    e
                );
                Err(e.into())
            }
        }
    }
}
