//! Specialist Registry
//!
//! Process-wide mapping from specialist id to handler. Built once at startup,
//! then shared read-only (`Arc<SpecialistRegistry>`) with every run.
//!
//! `delegate` is the single entry point:
//! - an unknown id fails immediately with `EngineError::UnknownSpecialist`,
//!   before any handler or network call;
//! - a handler error, panic or timeout is turned into a failed `Delegation`
//!   whose content carries the failure marker and the task, so the calling
//!   run records it instead of aborting. Handlers run on their own tokio
//!   task, which is what contains a panic (release builds abort instead).

use crate::conductor::specialist::LlmSpecialist;
use crate::config::SpecialistConfig;
use crate::llm::router::LLMRouter;
use crate::secrets::scrub_secrets;
use sdk::errors::EngineError;
use sdk::specialist::Specialist;
use sdk::types::SpecialistInfo;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Prefix of every failed delegation record
pub const DELEGATION_FAILED_MARKER: &str = "[DELEGATION FAILED]";

/// Failure record stored in place of a specialist result
pub fn failure_marker(specialist: &str, reason: &str, task: &str) -> String {
    format!(
        "{} {}: {}\n\nTask: {}",
        DELEGATION_FAILED_MARKER,
        specialist,
        scrub_secrets(reason),
        task
    )
}

/// Result of one delegation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegation {
    pub specialist: String,
    pub content: String,
    pub failed: bool,
}

pub struct SpecialistRegistry {
    specialists: Vec<Arc<dyn Specialist>>,
    handler_timeout: Duration,
}

impl SpecialistRegistry {
    pub fn new(handler_timeout: Duration) -> Self {
        Self {
            specialists: Vec::new(),
            handler_timeout,
        }
    }

    /// Build the registry from `[[specialists]]`, one `LlmSpecialist` each.
    ///
    /// Handlers get the router's whole call budget, so rate-limit retries
    /// and failover finish before the handler timeout fires.
    pub fn from_config(
        specialists: &[SpecialistConfig],
        router: Arc<LLMRouter>,
    ) -> Result<Self, EngineError> {
        let mut registry = Self::new(router.call_budget());
        for config in specialists {
            registry.register(Arc::new(LlmSpecialist::new(config, Arc::clone(&router))))?;
        }
        Ok(registry)
    }

    /// Register a handler under its id; ids must be unique
    pub fn register(&mut self, specialist: Arc<dyn Specialist>) -> Result<(), EngineError> {
        if self.contains(specialist.id()) {
            return Err(EngineError::Config(format!(
                "Duplicate specialist id '{}'",
                specialist.id()
            )));
        }
        debug!("Registered specialist '{}'", specialist.id());
        self.specialists.push(specialist);
        Ok(())
    }

    fn get(&self, id: &str) -> Option<&Arc<dyn Specialist>> {
        self.specialists.iter().find(|s| s.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Registered ids, in registration order
    pub fn ids(&self) -> Vec<String> {
        self.specialists.iter().map(|s| s.id().to_string()).collect()
    }

    pub fn describe(&self) -> Vec<SpecialistInfo> {
        self.specialists.iter().map(|s| s.info()).collect()
    }

    pub fn handler_timeout(&self) -> Duration {
        self.handler_timeout
    }

    pub fn len(&self) -> usize {
        self.specialists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specialists.is_empty()
    }

    /// Send `task` to specialist `id`
    pub async fn delegate(&self, id: &str, task: &str) -> Result<Delegation, EngineError> {
        let specialist = self
            .get(id)
            .ok_or_else(|| EngineError::UnknownSpecialist {
                id: id.to_string(),
                available: self.ids(),
            })?;

        let start = Instant::now();
        let handler = Arc::clone(specialist);
        let input = task.to_string();
        let mut join = tokio::spawn(async move { handler.handle(&input).await });
        let outcome = tokio::time::timeout(self.handler_timeout, &mut join).await;

        let failed = |reason: String| Delegation {
            specialist: id.to_string(),
            content: failure_marker(id, &reason, task),
            failed: true,
        };

        let delegation = match outcome {
            Ok(Ok(Ok(content))) => {
                info!(
                    "Specialist '{}' finished in {:.1}s",
                    id,
                    start.elapsed().as_secs_f64()
                );
                Delegation {
                    specialist: id.to_string(),
                    content,
                    failed: false,
                }
            }
            Ok(Ok(Err(e))) => {
                warn!("Specialist '{}' failed: {}", id, e);
                failed(e.to_string())
            }
            Ok(Err(join_error)) => {
                let reason = if join_error.is_panic() {
                    "handler panicked"
                } else {
                    "handler was cancelled"
                };
                let e = EngineError::SpecialistFailed {
                    id: id.to_string(),
                    reason: reason.to_string(),
                };
                warn!("Specialist '{}' aborted: {}", id, reason);
                failed(e.to_string())
            }
            Err(_) => {
                join.abort();
                let e = EngineError::GenerationTimeout(self.handler_timeout.as_secs());
                warn!("Specialist '{}' timed out", id);
                failed(e.to_string())
            }
        };

        Ok(delegation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, LLMConfig};
    use crate::llm::{LLMError, LLMResponse};
    use crate::testing::ScriptedProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Upper;

    #[async_trait]
    impl Specialist for Upper {
        fn id(&self) -> &str {
            "upper"
        }

        async fn handle(&self, task: &str) -> Result<String, EngineError> {
            Ok(task.to_uppercase())
        }
    }

    struct Broken;

    #[async_trait]
    impl Specialist for Broken {
        fn id(&self) -> &str {
            "broken"
        }

        async fn handle(&self, _task: &str) -> Result<String, EngineError> {
            Err(EngineError::SpecialistFailed {
                id: "broken".to_string(),
                reason: "token sk-abcdefghijklmnopqrstuvwxyz rejected".to_string(),
            })
        }
    }

    struct Slow;

    #[async_trait]
    impl Specialist for Slow {
        fn id(&self) -> &str {
            "slow"
        }

        async fn handle(&self, _task: &str) -> Result<String, EngineError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
    }

    struct Panicky;

    #[async_trait]
    impl Specialist for Panicky {
        fn id(&self) -> &str {
            "panicky"
        }

        async fn handle(&self, task: &str) -> Result<String, EngineError> {
            panic!("cannot handle {task}");
        }
    }

    fn registry() -> SpecialistRegistry {
        let mut registry = SpecialistRegistry::new(Duration::from_millis(50));
        registry.register(Arc::new(Upper)).unwrap();
        registry.register(Arc::new(Broken)).unwrap();
        registry.register(Arc::new(Slow)).unwrap();
        registry.register(Arc::new(Panicky)).unwrap();
        registry
    }

    #[tokio::test]
    async fn test_delegate_success() {
        let delegation = registry().delegate("upper", "shout").await.unwrap();
        assert_eq!(delegation.content, "SHOUT");
        assert!(!delegation.failed);
    }

    #[tokio::test]
    async fn test_unknown_specialist_lists_ids() {
        let err = registry().delegate("poet", "a sonnet").await.unwrap_err();
        match &err {
            EngineError::UnknownSpecialist { id, available } => {
                assert_eq!(id, "poet");
                assert_eq!(available, &vec!["upper", "broken", "slow", "panicky"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("upper, broken, slow, panicky"));
    }

    #[tokio::test]
    async fn test_handler_error_becomes_marker() {
        let registry = registry();
        let first = registry.delegate("broken", "Summarize notes").await.unwrap();
        let second = registry.delegate("broken", "Summarize notes").await.unwrap();

        assert!(first.failed);
        assert!(first.content.starts_with("[DELEGATION FAILED] broken:"));
        assert!(first.content.ends_with("Task: Summarize notes"));
        assert!(!first.content.contains("sk-abcdefghijklmnopqrstuvwxyz"));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_handler_timeout_becomes_marker() {
        let delegation = registry().delegate("slow", "wait").await.unwrap();
        assert!(delegation.failed);
        assert!(delegation.content.contains("timed out"));
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_marker() {
        let delegation = registry().delegate("panicky", "Summarize notes").await.unwrap();
        assert!(delegation.failed);
        assert!(delegation.content.starts_with("[DELEGATION FAILED] panicky:"));
        assert!(delegation.content.contains("handler panicked"));
        assert!(delegation.content.ends_with("Task: Summarize notes"));
    }

    #[tokio::test]
    async fn test_configured_specialist_outlasts_rate_limit_backoff() {
        let rate_limited = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&rate_limited);
        let provider = ScriptedProvider::new(false, move |_| {
            if flag.swap(true, Ordering::SeqCst) {
                Ok(LLMResponse::Text("summary ok".to_string()))
            } else {
                Err(LLMError::RateLimitExceeded)
            }
        });
        let config = LLMConfig {
            timeout_secs: 1,
            max_retries: 1,
            retry_base_delay_ms: 1500,
            ..Default::default()
        };
        let router = Arc::new(LLMRouter::new(vec![Box::new(provider)], Arc::new(config)));

        let specialists = Config::default_config().specialists;
        let registry = SpecialistRegistry::from_config(&specialists, router).unwrap();
        assert!(registry.handler_timeout() >= Duration::from_millis(3500));

        let delegation = registry
            .delegate("summarizer", "Summarize the notes")
            .await
            .unwrap();
        assert!(!delegation.failed, "{}", delegation.content);
        assert_eq!(delegation.content, "summary ok");
        assert!(rate_limited.load(Ordering::SeqCst));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = registry();
        assert!(registry.register(Arc::new(Upper)).is_err());
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.describe()[0].id, "upper");
    }
}
