//! Integration tests for configuration management
//!
//! These tests verify that the Config struct can be loaded from disk,
//! validated, and rejected with useful messages.

use std::fs;
use tempfile::TempDir;

use baton_engine::config::Config;
use sdk::errors::{BatonErrorExt, EngineError};

#[test]
fn test_load_full_config_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r#"
[core]
log_level = "debug"

[llm]
default_provider = "groq"
timeout_secs = 30
max_retries = 5
retry_base_delay_ms = 250

[llm.ollama]
base_url = "http://localhost:11434"
model = "qwen2.5:7b"

[llm.groq]
base_url = "https://api.groq.com/openai/v1"
model = "llama-3.1-8b-instant"

[orchestrator]
max_iterations = 8
max_todos = 6
min_task_chars = 4
final_report_key = "report.md"

[[specialists]]
id = "debt_specialist"
description = "Plans debt repayment"
keywords = ["debt", "loan"]
system_prompt = "You are a debt specialist."
"#;
    fs::write(&config_path, toml_content).unwrap();

    let config = Config::load_from_path(&config_path).unwrap();

    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.llm.default_provider, "groq");
    assert_eq!(config.llm.timeout_secs, 30);
    assert_eq!(config.llm.max_retries, 5);
    assert_eq!(config.llm.ollama.model, "qwen2.5:7b");
    assert_eq!(config.llm.openai.model, "gpt-4o-mini");
    assert_eq!(config.orchestrator.max_iterations, 8);
    assert_eq!(config.orchestrator.final_report_key, "report.md");
    assert_eq!(config.specialists.len(), 1);
    assert_eq!(config.specialists[0].keywords, vec!["debt", "loan"]);
}

#[test]
fn test_partial_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[orchestrator]\nmax_iterations = 3\n").unwrap();

    let config = Config::load_from_path(&config_path).unwrap();

    assert_eq!(config.orchestrator.max_iterations, 3);
    assert_eq!(config.orchestrator.max_todos, 10);
    assert_eq!(config.orchestrator.min_task_chars, 6);
    assert_eq!(config.llm.timeout_secs, 120);
    assert_eq!(config.llm.retry_base_delay_ms, 5000);
    let ids: Vec<&str> = config.specialists.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["summarizer", "researcher"]);
}

#[test]
fn test_invalid_log_level_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[core]\nlog_level = \"chatty\"\n").unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
    assert!(err.to_string().contains("chatty"));
    assert!(!err.is_recoverable());
}

#[test]
fn test_missing_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = Config::load_from_path(&temp_dir.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_malformed_toml_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[llm\ndefault_provider = ").unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config"));
}

#[test]
fn test_default_config_written_back_loads() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nested").join("config.toml");
    fs::create_dir_all(config_path.parent().unwrap()).unwrap();

    let config = Config::default_config();
    fs::write(&config_path, toml::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = Config::load_from_path(&config_path).unwrap();
    assert_eq!(loaded.specialists, config.specialists);
    assert_eq!(loaded.llm.groq.model, config.llm.groq.model);
}
