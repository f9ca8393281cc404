//! Orchestrator
//!
//! The run state machine. Each call to [`Orchestrator::step`] applies exactly
//! one transition to a [`RunState`] and returns it:
//!
//! ```text
//! PLANNING ──> SELECTING ──> EXECUTING ──┐
//!                 ^  │  └──> DELEGATING ─┤
//!                 │  │                   │
//!                 │  └──> SYNTHESIZING   │
//!                 │           │          │
//!                 └───────────┴──────────┘
//!                 SELECTING ──> DONE
//! ```
//!
//! Before every transition the iteration budget and the cancellation token
//! are checked; either one routes the run straight to SYNTHESIZING (or DONE
//! once a final output exists). Only EXECUTING and DELEGATING consume budget.
//!
//! Nothing in here returns an error to the caller: generation failures mark
//! the task failed, and synthesis falls back to the raw scratch entries.

use crate::conductor::executor::Executor;
use crate::conductor::planner::Planner;
use crate::conductor::registry::{failure_marker, SpecialistRegistry};
use crate::conductor::routing::{Route, TaskRouter};
use crate::conductor::synthesizer::{fallback_report, Synthesizer};
use crate::conductor::types::{Phase, RunOutcome, RunState, TaskStatus};
use crate::config::{Config, OrchestratorConfig};
use crate::llm::router::LLMRouter;
use crate::secrets::scrub_secrets;
use sdk::errors::EngineError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Prefix of failed generic-execution records
pub const EXECUTION_FAILED_MARKER: &str = "[EXECUTION FAILED]";

/// Scratch key for a generically executed task
pub fn task_key(task_id: usize) -> String {
    format!("task_{}.md", task_id)
}

/// Scratch key for a delegated task, namespaced by specialist
pub fn delegated_key(specialist: &str, task_id: usize) -> String {
    format!("{}/task_{}.md", specialist, task_id)
}

pub struct Orchestrator {
    planner: Planner,
    task_router: TaskRouter,
    executor: Executor,
    registry: Arc<SpecialistRegistry>,
    synthesizer: Synthesizer,
    config: OrchestratorConfig,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        router: Arc<LLMRouter>,
        registry: Arc<SpecialistRegistry>,
        task_router: TaskRouter,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            planner: Planner::new(Arc::clone(&router), &config),
            task_router,
            executor: Executor::new(Arc::clone(&router)),
            registry,
            synthesizer: Synthesizer::new(router),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Wire up router, registry and routing table from the loaded config
    pub fn from_config(config: &Config, router: Arc<LLMRouter>) -> Result<Self, EngineError> {
        let registry = SpecialistRegistry::from_config(&config.specialists, Arc::clone(&router))?;
        Ok(Self::new(
            router,
            Arc::new(registry),
            TaskRouter::from_config(&config.specialists),
            config.orchestrator.clone(),
        ))
    }

    /// Use an external cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn registry(&self) -> &Arc<SpecialistRegistry> {
        &self.registry
    }

    /// Run a goal with the configured iteration budget
    pub async fn run_default(&self, goal: &str) -> RunOutcome {
        self.run(goal, self.config.max_iterations).await
    }

    /// Drive one run from PLANNING to DONE
    pub async fn run(&self, goal: &str, max_iterations: usize) -> RunOutcome {
        let state = RunState::new(goal, max_iterations);
        let span = info_span!("run", run_id = %state.run_id);

        async move {
            info!("Starting run: {} (budget {})", goal, max_iterations);
            let state = self.drive(state).await;
            info!(
                "Run finished after {} iteration(s), truncated={}, cancelled={}",
                state.iteration_count, state.truncated, state.cancelled
            );
            state.into_outcome()
        }
        .instrument(span)
        .await
    }

    /// Step until DONE
    pub async fn drive(&self, mut state: RunState) -> RunState {
        while state.phase != Phase::Done {
            state = self.step(state).await;
        }
        state
    }

    /// Apply a single transition
    pub async fn step(&self, mut state: RunState) -> RunState {
        self.check_limits(&mut state);

        debug!("Transition: {}", state.phase);

        match state.phase.clone() {
            Phase::Planning => self.plan(state).await,
            Phase::Selecting => self.select(state),
            Phase::Executing { task_id } => self.execute(state, task_id).await,
            Phase::Delegating {
                task_id,
                specialist,
            } => self.delegate(state, task_id, &specialist).await,
            Phase::Synthesizing => self.synthesize(state).await,
            Phase::Done => state,
        }
    }

    /// Budget and cancellation checks run ahead of every transition
    fn check_limits(&self, state: &mut RunState) {
        if matches!(state.phase, Phase::Synthesizing | Phase::Done) {
            return;
        }

        if self.cancel.is_cancelled() && !state.cancelled {
            warn!("Run cancelled in {}", state.phase);
            state.cancelled = true;
        }

        let over_budget = state.budget_exhausted();
        if over_budget && state.has_remaining_work() && !state.truncated {
            warn!(
                "Iteration budget of {} reached with work remaining",
                state.max_iterations
            );
            state.truncated = true;
        }

        if state.cancelled || over_budget {
            state.phase = if state.final_output.is_some() {
                Phase::Done
            } else {
                Phase::Synthesizing
            };
        }
    }

    async fn plan(&self, mut state: RunState) -> RunState {
        if state.todos.is_empty() {
            state.todos = self.planner.plan(&state.goal).await;
        }
        state.phase = Phase::Selecting;
        state
    }

    fn select(&self, mut state: RunState) -> RunState {
        if state.final_output.is_some() {
            state.phase = Phase::Done;
            return state;
        }

        state.phase = match state.next_pending() {
            Some(task) => match self.task_router.classify(&task.description) {
                Route::Delegate(specialist) => Phase::Delegating {
                    task_id: task.id,
                    specialist,
                },
                Route::Generic => Phase::Executing { task_id: task.id },
            },
            None => Phase::Synthesizing,
        };
        state
    }

    async fn execute(&self, mut state: RunState, task_id: usize) -> RunState {
        state.iteration_count += 1;
        state.phase = Phase::Selecting;

        let Some(task) = state.task(task_id).cloned() else {
            warn!("Task {} vanished before execution", task_id);
            return state;
        };

        if let Err(e) = state.set_status(task_id, TaskStatus::InProgress) {
            warn!("Skipping task {}: {}", task_id, e);
            return state;
        }

        let key = task_key(task_id);
        let (status, content) = match self.executor.execute(&task, &state.goal).await {
            Ok(output) => (TaskStatus::Completed, output),
            Err(e) => (
                TaskStatus::Failed,
                format!(
                    "{} {}: {}\n\nTask: {}",
                    EXECUTION_FAILED_MARKER,
                    task_id,
                    scrub_secrets(&e.to_string()),
                    task.description
                ),
            ),
        };

        state.scratch.write(&key, &content);
        if let Err(e) = state.finish_task(task_id, status, content) {
            warn!("Task {}: {}", task_id, e);
        }
        info!("Task {} {} -> {}", task_id, status, key);
        state
    }

    async fn delegate(&self, mut state: RunState, task_id: usize, specialist: &str) -> RunState {
        state.iteration_count += 1;
        state.phase = Phase::Selecting;

        let Some(task) = state.task(task_id).cloned() else {
            warn!("Task {} vanished before delegation", task_id);
            return state;
        };

        if let Err(e) = state.set_status(task_id, TaskStatus::InProgress) {
            warn!("Skipping task {}: {}", task_id, e);
            return state;
        }
        state.assign(task_id, specialist);

        let key = delegated_key(specialist, task_id);
        let pair = (task_id, specialist.to_string());

        if state.delegated.contains(&pair) || state.scratch.exists(&key) {
            warn!(
                "Task {} was already delegated to '{}', reusing {}",
                task_id, specialist, key
            );
            let previous = state.scratch.read(&key);
            if let Err(e) = state.finish_task(task_id, TaskStatus::Completed, previous) {
                warn!("Task {}: {}", task_id, e);
            }
            return state;
        }

        state.delegated.insert(pair);
        info!("Delegating task {} to '{}'", task_id, specialist);

        let (status, content) = match self.registry.delegate(specialist, &task.description).await
        {
            Ok(delegation) if delegation.failed => (TaskStatus::Failed, delegation.content),
            Ok(delegation) => (TaskStatus::Completed, delegation.content),
            Err(e) => {
                warn!("Delegation of task {} refused: {}", task_id, e);
                (
                    TaskStatus::Failed,
                    failure_marker(specialist, &e.to_string(), &task.description),
                )
            }
        };

        state.scratch.write(&key, &content);
        if let Err(e) = state.finish_task(task_id, status, content) {
            warn!("Task {}: {}", task_id, e);
        }
        info!("Task {} {} -> {}", task_id, status, key);
        state
    }

    async fn synthesize(&self, mut state: RunState) -> RunState {
        let report_key = self.config.final_report_key.clone();
        let entries = state.scratch.entries_excluding(&report_key);

        let text = if state.cancelled {
            // Cancelled runs skip the model call
            fallback_report(&state.goal, &entries)
        } else {
            self.synthesizer.synthesize(&state.goal, &entries).await.text
        };

        state.scratch.write(&report_key, &text);
        if let Err(e) = state.set_final_output(text) {
            warn!("Final output kept: {}", e);
        }
        info!("Final report written to {}", report_key);

        state.phase = Phase::Selecting;
        state
    }
}
