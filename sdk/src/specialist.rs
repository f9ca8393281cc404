//! Specialist trait
//!
//! A specialist is a narrowly-scoped worker the orchestrator delegates tasks
//! to. It sees only the task description, never the caller's run state, so
//! each specialist can be exercised on its own.

use crate::errors::EngineError;
use crate::types::SpecialistInfo;
use async_trait::async_trait;

/// Trait that all specialists must implement
#[async_trait]
pub trait Specialist: Send + Sync {
    /// Registry identifier (e.g. "summarizer")
    fn id(&self) -> &str;

    /// One-line description shown in listings
    fn description(&self) -> &str {
        ""
    }

    /// Handle one task description and return the result text.
    ///
    /// Errors are caught by the registry and recorded as failed delegations,
    /// they never abort the orchestrating run.
    async fn handle(&self, task: &str) -> Result<String, EngineError>;

    /// Listing metadata
    fn info(&self) -> SpecialistInfo {
        SpecialistInfo {
            id: self.id().to_string(),
            description: self.description().to_string(),
        }
    }
}
