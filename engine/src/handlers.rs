//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - run: Execute a goal through the orchestrator
//! - specialists: List registered specialists
//! - config show / path / set-key: Inspect configuration, store API keys
//! - doctor: Validate configuration and check providers

use anyhow::{Context, Result};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::conductor::{Orchestrator, RunOutcome, TaskStatus};
use crate::config::Config;
use crate::llm::ollama::OllamaProvider;
use crate::llm::openai::OpenAIProvider;
use crate::llm::router::LLMRouter;
use crate::llm::LLMProvider;
use crate::secrets::SecretManager;

/// Keychain service name for stored API keys
pub const KEYCHAIN_SERVICE: &str = "baton";

/// Cloud providers and the secret each one needs
const CLOUD_PROVIDERS: [(&str, &str); 2] = [("openai", "openai_api_key"), ("groq", "groq_api_key")];

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Build the provider list: Ollama always, cloud providers only when their
/// API key is available (environment or keychain).
pub fn build_providers(config: &Config) -> Vec<Box<dyn LLMProvider>> {
    let mut providers: Vec<Box<dyn LLMProvider>> = vec![Box::new(OllamaProvider::new(
        config.llm.ollama.base_url.clone(),
        config.llm.ollama.model.clone(),
    ))];

    let secret_manager = SecretManager::new(KEYCHAIN_SERVICE);

    for (name, secret) in CLOUD_PROVIDERS {
        match secret_manager.get_secret(secret) {
            Ok(api_key) => {
                let provider_config = if name == "groq" {
                    config.llm.groq.clone()
                } else {
                    config.llm.openai.clone()
                };
                providers.push(Box::new(OpenAIProvider::new(name, provider_config, api_key)));
            }
            Err(e) => tracing::debug!("Skipping provider {}: {}", name, e),
        }
    }

    providers
}

/// Build the shared LLM router from config
pub fn build_router(config: &Config) -> Arc<LLMRouter> {
    Arc::new(LLMRouter::new(
        build_providers(config),
        Arc::new(config.llm.clone()),
    ))
}

/// Text rendering of a finished run
pub fn render_outcome(outcome: &RunOutcome) -> String {
    let mut out = String::new();

    out.push_str(&outcome.final_output);
    out.push_str("\n\n");
    out.push_str(&format!(
        "Run {}: {} task(s), {} completed, {} failed, {} iteration(s)\n",
        outcome.run_id,
        outcome.todos.len(),
        outcome.count_with_status(TaskStatus::Completed),
        outcome.count_with_status(TaskStatus::Failed),
        outcome.iterations
    ));

    if outcome.truncated {
        out.push_str("Note: iteration budget reached, the report is partial\n");
    }
    if outcome.cancelled {
        out.push_str("Note: run was cancelled, the report is partial\n");
    }

    out
}

/// Iteration budget for a run: `--max-iterations` or the configured default.
/// Zero is rejected, as in config validation.
pub fn resolve_budget(max_iterations: Option<usize>, config: &Config) -> Result<usize> {
    match max_iterations {
        Some(0) => anyhow::bail!("--max-iterations must be greater than 0"),
        Some(budget) => Ok(budget),
        None => Ok(config.orchestrator.max_iterations),
    }
}

/// Run a goal through the orchestrator
///
/// Ctrl-C cancels the run cooperatively; the partial report is still printed.
pub async fn handle_run(
    goal: String,
    max_iterations: Option<usize>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let budget = resolve_budget(max_iterations, config)?;
    let router = build_router(config);
    let orchestrator = Orchestrator::from_config(config, router)
        .context("Failed to build the specialist registry")?;

    let token = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl-C received, finishing the run early");
            token.cancel();
        }
    });

    let outcome = orchestrator.run(&goal, budget).await;

    match format {
        OutputFormat::Text => print!("{}", render_outcome(&outcome)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }

    Ok(())
}

/// List registered specialists
pub async fn handle_specialists(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if config.specialists.is_empty() {
                println!("No specialists registered.");
                return Ok(());
            }
            println!("Registered specialists ({}):", config.specialists.len());
            println!();
            for specialist in &config.specialists {
                println!("  {}", specialist.id);
                if !specialist.description.is_empty() {
                    println!("    {}", specialist.description);
                }
                println!("    keywords: {}", specialist.keywords.join(", "));
            }
        }
        OutputFormat::Json => {
            let output = config
                .specialists
                .iter()
                .map(|s| {
                    json!({
                        "id": s.id,
                        "description": s.description,
                        "keywords": s.keywords,
                    })
                })
                .collect::<Vec<_>>();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// Print the effective configuration
pub async fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let toml_string =
                toml::to_string_pretty(config).context("Failed to serialize config")?;
            println!("{}", toml_string);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}

/// Resolve the config path in use: the `--config` override or the default
pub fn resolve_config_path(override_path: Option<&Path>) -> Result<PathBuf> {
    match override_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(Config::default_config_path()?),
    }
}

/// Print the configuration file path
pub async fn handle_config_path(override_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let path = resolve_config_path(override_path)?;
    match format {
        OutputFormat::Text => println!("{}", path.display()),
        OutputFormat::Json => println!(
            "{}",
            json!({ "path": path, "exists": path.exists() })
        ),
    }
    Ok(())
}

/// Store an API key for a cloud provider, reading the value from stdin
pub async fn handle_set_key(provider: &str) -> Result<()> {
    let secret = CLOUD_PROVIDERS
        .iter()
        .find(|(name, _)| *name == provider)
        .map(|(_, secret)| *secret)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown provider '{}'. Keys can be stored for: openai, groq",
                provider
            )
        })?;

    println!("Paste the {} API key and press Enter:", provider);
    let mut value = String::new();
    std::io::stdin()
        .read_line(&mut value)
        .context("Failed to read API key")?;
    let value = value.trim();
    if value.is_empty() {
        anyhow::bail!("Empty API key, nothing stored");
    }

    SecretManager::new(KEYCHAIN_SERVICE).set_secret(secret, value)?;
    println!("Stored {} in the OS keychain.", secret);
    Ok(())
}

/// Run system diagnostics
///
/// Checks configuration validity, provider health and API key availability.
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(String, String)> = Vec::new();

    // Check 1: Configuration validation
    match config.validate() {
        Ok(()) => checks.push(("Configuration".to_string(), "Valid".to_string())),
        Err(e) => {
            checks.push(("Configuration".to_string(), "Invalid".to_string()));
            issues.push(e.to_string());
        }
    }

    // Check 2: API keys
    let secret_manager = SecretManager::new(KEYCHAIN_SERVICE);
    for (name, secret) in CLOUD_PROVIDERS {
        let status = if secret_manager.has_secret(secret) {
            "Configured"
        } else {
            "Not configured"
        };
        checks.push((format!("{} API key", name), status.to_string()));
    }

    // Check 3: Provider health
    let router = build_router(config);
    let health = router.check_health().await;
    for (name, healthy) in &health {
        checks.push((
            format!("Provider {}", name),
            if *healthy { "Available" } else { "Not available" }.to_string(),
        ));
    }

    if !health.iter().any(|(_, healthy)| *healthy) {
        issues.push("No LLM providers available. Start Ollama or configure an API key.".to_string());
    } else if !health
        .iter()
        .any(|(name, healthy)| *healthy && *name == config.llm.default_provider)
    {
        issues.push(format!(
            "Default provider '{}' is not available, runs will fail over",
            config.llm.default_provider
        ));
    }

    // Check 4: Specialists
    checks.push((
        "Specialists".to_string(),
        format!("{} registered", config.specialists.len()),
    ));

    // Output results
    match format {
        OutputFormat::Text => {
            println!("Baton System Diagnostics");
            println!("============================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conductor::{RunState, Task};

    #[test]
    fn test_ollama_always_first() {
        let providers = build_providers(&Config::default_config());
        assert_eq!(providers[0].name(), "ollama");
    }

    #[test]
    fn test_render_outcome_flags_partial_runs() {
        let mut state = RunState::new("Plan a product launch", 1);
        state.todos = vec![Task::new(0, "Pick a date"), Task::new(1, "Write copy")];
        state.final_output = Some("Partial report".to_string());
        state.truncated = true;

        let text = render_outcome(&state.into_outcome());
        assert!(text.starts_with("Partial report"));
        assert!(text.contains("2 task(s), 0 completed, 0 failed"));
        assert!(text.contains("iteration budget reached"));
        assert!(!text.contains("cancelled"));
    }

    #[test]
    fn test_zero_budget_rejected() {
        let config = Config::default_config();
        let err = resolve_budget(Some(0), &config).unwrap_err();
        assert!(err.to_string().contains("greater than 0"));
        assert_eq!(resolve_budget(Some(3), &config).unwrap(), 3);
        assert_eq!(
            resolve_budget(None, &config).unwrap(),
            config.orchestrator.max_iterations
        );
    }

    #[tokio::test]
    async fn test_run_with_zero_budget_fails_before_running() {
        let err = handle_run(
            "Plan a product launch".to_string(),
            Some(0),
            &Config::default_config(),
            OutputFormat::Text,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("--max-iterations"));
    }

    #[test]
    fn test_resolve_config_path_override() {
        let path = resolve_config_path(Some(Path::new("/tmp/baton.toml"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/baton.toml"));
    }

    #[tokio::test]
    async fn test_set_key_rejects_unknown_provider() {
        let err = handle_set_key("anthropic").await.unwrap_err();
        assert!(err.to_string().contains("openai, groq"));
    }
}
