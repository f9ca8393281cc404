//! Conductor System
//!
//! Plans a goal into tasks, routes each task to the generic executor or a
//! specialist, and merges the results into one report.

pub mod executor;
pub mod orchestrator;
pub mod planner;
pub mod registry;
pub mod routing;
pub mod specialist;
pub mod synthesizer;
pub mod types;

pub use executor::Executor;
pub use orchestrator::Orchestrator;
pub use planner::Planner;
pub use registry::{Delegation, SpecialistRegistry};
pub use routing::{Route, TaskRouter};
pub use specialist::LlmSpecialist;
pub use synthesizer::{Synthesis, Synthesizer};
pub use types::{Phase, RunOutcome, RunState, StatusChange, Task, TaskStatus};
