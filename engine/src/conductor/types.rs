//! Conductor Types
//!
//! Typed run state shared by every orchestrator transition: the task list,
//! the phase the state machine is in, the scratch store and the bookkeeping
//! needed to report how a run ended.

use crate::scratch::ScratchStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// Lifecycle of a task. Status only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Whether the status is final
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// pending -> in_progress -> {completed | failed}
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::InProgress)
                | (TaskStatus::InProgress, TaskStatus::Completed)
                | (TaskStatus::InProgress, TaskStatus::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One unit of planned work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: usize,
    pub description: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl Task {
    pub fn new(id: usize, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            status: TaskStatus::Pending,
            assigned_to: None,
            result: None,
        }
    }
}

/// Where the state machine goes next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    Planning,
    Selecting,
    Executing { task_id: usize },
    Delegating { task_id: usize, specialist: String },
    Synthesizing,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Planning => write!(f, "PLANNING"),
            Phase::Selecting => write!(f, "SELECTING"),
            Phase::Executing { task_id } => write!(f, "EXECUTING({})", task_id),
            Phase::Delegating {
                task_id,
                specialist,
            } => write!(f, "DELEGATING({} -> {})", task_id, specialist),
            Phase::Synthesizing => write!(f, "SYNTHESIZING"),
            Phase::Done => write!(f, "DONE"),
        }
    }
}

/// A recorded status change of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub task_id: usize,
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// Illegal run state mutations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("No task with id {0}")]
    UnknownTask(usize),

    #[error("Task {task_id} cannot move from {from} to {to}")]
    Backward {
        task_id: usize,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Final output is already set")]
    FinalOutputAlreadySet,
}

/// Aggregate state of a single run, owned by the orchestrator
#[derive(Debug, Clone)]
pub struct RunState {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub goal: String,
    pub todos: Vec<Task>,
    pub scratch: ScratchStore,
    pub iteration_count: usize,
    pub max_iterations: usize,
    pub phase: Phase,
    pub final_output: Option<String>,
    pub truncated: bool,
    pub cancelled: bool,
    pub history: Vec<StatusChange>,
    /// `(task_id, specialist_id)` pairs already sent to the registry
    pub delegated: HashSet<(usize, String)>,
}

impl RunState {
    pub fn new(goal: impl Into<String>, max_iterations: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            goal: goal.into(),
            todos: Vec::new(),
            scratch: ScratchStore::new(),
            iteration_count: 0,
            max_iterations,
            phase: Phase::Planning,
            final_output: None,
            truncated: false,
            cancelled: false,
            history: Vec::new(),
            delegated: HashSet::new(),
        }
    }

    pub fn task(&self, task_id: usize) -> Option<&Task> {
        self.todos.iter().find(|t| t.id == task_id)
    }

    fn task_mut(&mut self, task_id: usize) -> Option<&mut Task> {
        self.todos.iter_mut().find(|t| t.id == task_id)
    }

    /// First pending task in id order
    pub fn next_pending(&self) -> Option<&Task> {
        self.todos
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .min_by_key(|t| t.id)
    }

    /// Work left to do: planning has not happened or a task is still pending
    pub fn has_remaining_work(&self) -> bool {
        self.todos.is_empty() || self.next_pending().is_some()
    }

    pub fn budget_exhausted(&self) -> bool {
        self.iteration_count >= self.max_iterations
    }

    /// Move a task forward and record the change
    pub fn set_status(&mut self, task_id: usize, to: TaskStatus) -> Result<(), TransitionError> {
        let task = self
            .task_mut(task_id)
            .ok_or(TransitionError::UnknownTask(task_id))?;

        let from = task.status;
        if !from.can_transition_to(to) {
            return Err(TransitionError::Backward { task_id, from, to });
        }

        task.status = to;
        self.history.push(StatusChange { task_id, from, to });
        Ok(())
    }

    /// Mark a task done and attach its result
    pub fn finish_task(
        &mut self,
        task_id: usize,
        to: TaskStatus,
        result: String,
    ) -> Result<(), TransitionError> {
        self.set_status(task_id, to)?;
        if let Some(task) = self.task_mut(task_id) {
            task.result = Some(result);
        }
        Ok(())
    }

    pub fn assign(&mut self, task_id: usize, specialist: &str) {
        if let Some(task) = self.task_mut(task_id) {
            task.assigned_to = Some(specialist.to_string());
        }
    }

    /// Set the final output; only the first call succeeds
    pub fn set_final_output(&mut self, output: String) -> Result<(), TransitionError> {
        if self.final_output.is_some() {
            return Err(TransitionError::FinalOutputAlreadySet);
        }
        self.final_output = Some(output);
        Ok(())
    }

    pub fn into_outcome(self) -> RunOutcome {
        RunOutcome {
            run_id: self.run_id,
            goal: self.goal,
            started_at: self.started_at,
            final_output: self.final_output.unwrap_or_default(),
            todos: self.todos,
            files: self.scratch.into_map(),
            truncated: self.truncated,
            cancelled: self.cancelled,
            iterations: self.iteration_count,
            history: self.history,
        }
    }
}

/// What `run()` hands back to its caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub goal: String,
    pub started_at: DateTime<Utc>,
    pub final_output: String,
    pub todos: Vec<Task>,
    pub files: BTreeMap<String, String>,
    /// The iteration budget ended the run with work left
    pub truncated: bool,
    pub cancelled: bool,
    pub iterations: usize,
    pub history: Vec<StatusChange>,
}

impl RunOutcome {
    pub fn count_with_status(&self, status: TaskStatus) -> usize {
        self.todos.iter().filter(|t| t.status == status).count()
    }
}
