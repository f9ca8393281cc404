//! Integration tests for the Orchestrator
//!
//! End-to-end runs against scripted providers and fake registries:
//! - generic execution of a full plan
//! - a failing specialist
//! - iteration budget truncation
//! - unknown specialists
//! - duplicate delegation avoidance

mod common;

use common::{router, FailingSpecialist, RecordingSpecialist, ScenarioProvider};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use baton_engine::conductor::{
    Orchestrator, SpecialistRegistry, TaskRouter, TaskStatus,
};
use baton_engine::config::{Config, OrchestratorConfig};
use sdk::errors::EngineError;

const LAUNCH_STEPS: [&str; 4] = [
    "Define the target audience",
    "Set the launch price",
    "Write the announcement copy",
    "Book the launch venue",
];

#[tokio::test]
async fn test_product_launch_executes_every_task_generically() {
    let provider = ScenarioProvider::new(&LAUNCH_STEPS);
    let orchestrator = Orchestrator::from_config(&Config::default_config(), router(provider)).unwrap();

    let outcome = orchestrator.run("Plan a product launch", 15).await;

    assert_eq!(outcome.todos.len(), 4);
    assert_eq!(outcome.count_with_status(TaskStatus::Completed), 4);
    assert!(outcome.todos.iter().all(|t| t.assigned_to.is_none()));
    assert!(!outcome.truncated);
    assert!(!outcome.cancelled);
    assert_eq!(outcome.iterations, 4);

    // One entry per task plus the final report
    assert_eq!(outcome.files.len(), 5);
    assert!(outcome.final_output.starts_with("FINAL REPORT"));
    for id in 0..4 {
        let key = format!("task_{}.md", id);
        assert!(outcome.files.contains_key(&key));
        assert!(outcome.final_output.contains(&format!("--- {} ---", key)));
    }
    for step in LAUNCH_STEPS {
        assert!(outcome.final_output.contains(&format!("Result: {}", step)));
    }
    assert_eq!(outcome.files["final_report.md"], outcome.final_output);
}

#[tokio::test]
async fn test_failing_summarizer_is_recorded_and_run_completes() {
    let config = Config::default_config();
    let llm = router(ScenarioProvider::new(&[
        "Collect the attached notes",
        "Summarize the attached notes",
    ]));

    let mut registry = SpecialistRegistry::new(Duration::from_secs(5));
    registry
        .register(Arc::new(FailingSpecialist {
            id: "summarizer".to_string(),
        }))
        .unwrap();

    let orchestrator = Orchestrator::new(
        llm,
        Arc::new(registry),
        TaskRouter::from_config(&config.specialists),
        config.orchestrator.clone(),
    );

    let outcome = orchestrator
        .run("summarize the attached notes", 15)
        .await;

    assert_eq!(outcome.todos[0].status, TaskStatus::Completed);
    assert_eq!(outcome.todos[1].status, TaskStatus::Failed);
    assert_eq!(outcome.todos[1].assigned_to.as_deref(), Some("summarizer"));

    let record = &outcome.files["summarizer/task_1.md"];
    assert!(record.starts_with("[DELEGATION FAILED] summarizer:"));
    assert!(record.contains("notes are unreadable"));
    assert!(record.contains("Summarize the attached notes"));

    assert!(!outcome.final_output.is_empty());
    assert!(outcome.final_output.contains("[DELEGATION FAILED]"));
}

#[tokio::test]
async fn test_budget_of_one_truncates_five_task_goal() {
    let provider = ScenarioProvider::new(&[
        "Define the target audience",
        "Set the launch price",
        "Write the announcement copy",
        "Book the launch venue",
        "Send the press invitations",
    ]);
    let orchestrator = Orchestrator::from_config(&Config::default_config(), router(provider)).unwrap();

    let outcome = orchestrator.run("Plan a product launch", 1).await;

    assert!(outcome.truncated);
    assert_eq!(outcome.iterations, 1);
    assert_eq!(outcome.todos.len(), 5);
    assert_eq!(outcome.count_with_status(TaskStatus::Pending), 4);

    let task_entries = outcome
        .files
        .keys()
        .filter(|k| k.as_str() != "final_report.md")
        .count();
    assert!(task_entries < 5);
    assert!(!outcome.final_output.is_empty());
}

#[tokio::test]
async fn test_synthesis_failure_falls_back_to_raw_results() {
    let provider = ScenarioProvider::new(&LAUNCH_STEPS[..2]).failing_synthesis();
    let orchestrator = Orchestrator::from_config(&Config::default_config(), router(provider)).unwrap();

    let outcome = orchestrator.run("Plan a product launch", 15).await;

    assert!(outcome.final_output.starts_with("[UNSYNTHESIZED FALLBACK]"));
    assert!(outcome.final_output.contains("--- task_0.md ---"));
    assert!(outcome.final_output.contains("--- task_1.md ---"));
}

#[tokio::test]
async fn test_unknown_specialist_error_names_registered_ids() {
    let mut registry = SpecialistRegistry::new(Duration::from_secs(5));
    registry
        .register(Arc::new(RecordingSpecialist::new("summarizer")))
        .unwrap();
    registry
        .register(Arc::new(RecordingSpecialist::new("researcher")))
        .unwrap();

    let err = registry
        .delegate("debt_specialist", "Plan repayments")
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::UnknownSpecialist { .. }));
    let message = err.to_string();
    assert!(message.contains("debt_specialist"));
    assert!(message.contains("summarizer, researcher"));
}

#[tokio::test]
async fn test_route_to_unregistered_specialist_fails_task() {
    let mut task_router = TaskRouter::new();
    task_router.add_route("astrologer", &["horoscope".to_string()]);

    let orchestrator = Orchestrator::new(
        router(ScenarioProvider::new(&["Read the horoscope for launch day"])),
        Arc::new(SpecialistRegistry::new(Duration::from_secs(5))),
        task_router,
        OrchestratorConfig::default(),
    );

    let outcome = orchestrator.run("Pick a lucky launch day", 15).await;

    assert_eq!(outcome.todos[0].status, TaskStatus::Failed);
    let record = &outcome.files["astrologer/task_0.md"];
    assert!(record.starts_with("[DELEGATION FAILED] astrologer:"));
    assert!(record.contains("Unknown specialist 'astrologer'"));
    assert!(!outcome.final_output.is_empty());
}

#[tokio::test]
async fn test_each_task_delegated_at_most_once() {
    let config = Config::default_config();
    let summarizer = RecordingSpecialist::new("summarizer");
    let researcher = RecordingSpecialist::new("researcher");
    let summarizer_seen = Arc::clone(&summarizer.seen);
    let researcher_seen = Arc::clone(&researcher.seen);

    let mut registry = SpecialistRegistry::new(Duration::from_secs(5));
    registry.register(Arc::new(summarizer)).unwrap();
    registry.register(Arc::new(researcher)).unwrap();

    let orchestrator = Orchestrator::new(
        router(ScenarioProvider::new(&[
            "Research the competitors",
            "Summarize the competitor research",
            "Research pricing models",
            "Summarize the pricing findings",
        ])),
        Arc::new(registry),
        TaskRouter::from_config(&config.specialists),
        config.orchestrator.clone(),
    );

    let outcome = orchestrator.run("Prepare a market brief", 15).await;

    // "Summarize the competitor research" matches summarizer first (config order)
    let summarized = summarizer_seen.lock().unwrap().clone();
    let researched = researcher_seen.lock().unwrap().clone();
    assert_eq!(summarized.len(), 2);
    assert_eq!(researched.len(), 2);

    let unique: HashSet<&String> = summarized.iter().chain(researched.iter()).collect();
    assert_eq!(unique.len(), 4);

    assert_eq!(outcome.count_with_status(TaskStatus::Completed), 4);
    assert!(outcome.files.contains_key("researcher/task_0.md"));
    assert!(outcome.files.contains_key("summarizer/task_1.md"));
}

#[tokio::test]
async fn test_status_history_is_monotonic() {
    let provider = ScenarioProvider::new(&LAUNCH_STEPS);
    let orchestrator = Orchestrator::from_config(&Config::default_config(), router(provider)).unwrap();

    let outcome = orchestrator.run("Plan a product launch", 15).await;

    for task in &outcome.todos {
        let changes: Vec<(TaskStatus, TaskStatus)> = outcome
            .history
            .iter()
            .filter(|c| c.task_id == task.id)
            .map(|c| (c.from, c.to))
            .collect();
        assert_eq!(
            changes,
            vec![
                (TaskStatus::Pending, TaskStatus::InProgress),
                (TaskStatus::InProgress, TaskStatus::Completed),
            ]
        );
    }
}

#[tokio::test]
async fn test_outcome_serializes_for_json_output() {
    let provider = ScenarioProvider::new(&LAUNCH_STEPS[..1]);
    let orchestrator = Orchestrator::from_config(&Config::default_config(), router(provider)).unwrap();

    let outcome = orchestrator.run_default("Plan a product launch").await;
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["todos"][0]["status"], "completed");
    assert_eq!(json["truncated"], false);
    assert!(json["files"]["task_0.md"].is_string());
    assert!(json["run_id"].is_string());
}
