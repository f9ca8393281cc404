//! Conductor Planner
//!
//! Turns a natural-language goal into an ordered list of pending tasks.
//!
//! The planner asks for structured output first (`{"tasks": [string]}`).
//! When the provider cannot honour the schema or answers with something
//! unusable, it asks again for plain text and parses that defensively. It
//! never fails: an empty plan becomes a single task equal to the goal.

use crate::conductor::types::Task;
use crate::config::OrchestratorConfig;
use crate::llm::router::LLMRouter;
use crate::llm::{Message, OutputSchema};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};

const PLANNER_PROMPT: &str = "You are the Conductor Planner. Break the user's goal down into \
3 to 10 ordered, concrete and actionable steps. Each step must be doable on its own and \
described in one sentence. Do not add commentary.";

const TEXT_FORMAT_HINT: &str = "Answer with one step per line, numbered 1., 2., 3. and so on.";

pub struct Planner {
    router: Arc<LLMRouter>,
    max_todos: usize,
    min_task_chars: usize,
}

impl Planner {
    pub fn new(router: Arc<LLMRouter>, config: &OrchestratorConfig) -> Self {
        Self {
            router,
            max_todos: config.max_todos,
            min_task_chars: config.min_task_chars,
        }
    }

    /// JSON schema requested from structured-output providers
    pub fn plan_schema() -> OutputSchema {
        OutputSchema::new(
            "plan",
            json!({
                "type": "object",
                "properties": {
                    "tasks": {
                        "type": "array",
                        "items": { "type": "string" }
                    }
                },
                "required": ["tasks"]
            }),
        )
    }

    /// Generate the task list for a goal. Ids start at 0, all tasks pending.
    pub async fn plan(&self, goal: &str) -> Vec<Task> {
        let mut descriptions = self.plan_structured(goal).await;

        if descriptions.is_empty() {
            descriptions = self.plan_text(goal).await;
        }

        if descriptions.is_empty() {
            tracing::warn!("Planner produced no usable tasks, falling back to the goal itself");
            descriptions.push(goal.trim().to_string());
        }

        tracing::info!("Planned {} task(s)", descriptions.len());

        descriptions
            .into_iter()
            .enumerate()
            .map(|(id, description)| Task::new(id, description))
            .collect()
    }

    async fn plan_structured(&self, goal: &str) -> Vec<String> {
        let messages = vec![Message::system(PLANNER_PROMPT), Message::user(goal)];

        match self
            .router
            .generate_structured(messages, Self::plan_schema())
            .await
        {
            Ok(value) => {
                let steps = steps_from_json(&value, self.min_task_chars, self.max_todos);
                if steps.is_empty() {
                    tracing::warn!("Structured plan was empty or malformed, retrying as text");
                }
                steps
            }
            Err(e) => {
                tracing::debug!("Structured planning unavailable ({}), retrying as text", e);
                Vec::new()
            }
        }
    }

    async fn plan_text(&self, goal: &str) -> Vec<String> {
        let messages = vec![
            Message::system(format!("{}\n{}", PLANNER_PROMPT, TEXT_FORMAT_HINT)),
            Message::user(goal),
        ];

        match self.router.generate_text(messages).await {
            Ok(content) => parse_plan_text(&content, self.min_task_chars, self.max_todos),
            Err(e) => {
                tracing::warn!("Planner generation failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Pull step descriptions out of `{"tasks": [...]}` or a bare array
fn steps_from_json(value: &Value, min_chars: usize, max_todos: usize) -> Vec<String> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("tasks").or_else(|| map.get("steps")) {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("description").and_then(Value::as_str),
            _ => None,
        })
        .map(clean_line)
        .filter(|line| line.chars().count() >= min_chars)
        .take(max_todos)
        .collect()
}

fn list_marker() -> Option<&'static Regex> {
    static MARKER: OnceLock<Option<Regex>> = OnceLock::new();
    MARKER
        .get_or_init(|| {
            // Headings, bullets, "Step 3:" and "3." / "3)" / "(3)" numbering, repeated
            Regex::new(
                r"^(?:#{1,6}\s*|[-*•+]\s+|(?i:step)\s*\d+\s*[:.)\-]?\s*|\(?\d+[.)]\s+|\d+:\s*)+",
            )
            .ok()
        })
        .as_ref()
}

/// Strip list markers, numbering and markdown emphasis from one line
pub fn clean_line(line: &str) -> String {
    let without_emphasis = line.replace("**", "").replace("__", "");
    let trimmed = without_emphasis.trim();
    let stripped = match list_marker() {
        Some(marker) => marker.replace(trimmed, "").to_string(),
        None => trimmed.to_string(),
    };
    stripped.trim().trim_matches('`').trim().to_string()
}

/// JSON plan carried by a text answer: the whole answer, a fenced block,
/// or a `{"tasks": [...]}` object inside prose. Bare arrays inside prose
/// are list items, not plans.
fn json_plan(content: &str) -> Option<Value> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if let Some(inner) = crate::llm::extract_fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str(inner.trim()) {
            return Some(value);
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if start >= end {
        return None;
    }
    match serde_json::from_str(&trimmed[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Parse free-text model output into step descriptions.
///
/// A JSON plan (see [`json_plan`]) wins over line parsing. Otherwise each
/// line is cleaned; blank lines, lines shorter than `min_chars` and
/// preamble lines ending in `:` are dropped, and at most `max_todos` steps
/// are kept.
pub fn parse_plan_text(content: &str, min_chars: usize, max_todos: usize) -> Vec<String> {
    if let Some(value) = json_plan(content) {
        let steps = steps_from_json(&value, min_chars, max_todos);
        if !steps.is_empty() {
            return steps;
        }
    }

    content
        .lines()
        .map(clean_line)
        .filter(|line| !line.ends_with(':'))
        .filter(|line| line.chars().count() >= min_chars)
        .take(max_todos)
        .collect()
}
