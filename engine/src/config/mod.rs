//! Configuration management
//!
//! This module handles loading, validation, and management of the Baton configuration.
//! Configuration is stored in TOML format at ~/.baton/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: log level
//! - **llm**: provider selection, per-call timeout, rate-limit retry policy
//! - **orchestrator**: iteration budget, plan size limits, final report key
//! - **specialists**: the specialist table and its routing keywords
//!
//! # Examples
//!
//! ```no_run
//! use baton_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Default provider: {}", config.llm.default_provider);
//! println!("Max iterations: {}", config.orchestrator.max_iterations);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Valid values for `core.log_level`
pub const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Valid values for `llm.default_provider`
pub const VALID_PROVIDERS: [&str; 3] = ["ollama", "openai", "groq"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Orchestrator limits
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Registered specialists
    #[serde(default = "default_specialists")]
    pub specialists: Vec<SpecialistConfig>,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Default LLM provider (ollama, openai, groq)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Timeout for a single generation or specialist call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries granted to a rate-limited provider before failing over
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between rate-limit retries; attempt N waits N times this
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// OpenAI provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Groq provider settings (OpenAI-compatible API)
    #[serde(default = "default_groq_config")]
    pub groq: OpenAIConfig,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            ollama: OllamaConfig::default(),
            openai: OpenAIConfig::default(),
            groq: default_groq_config(),
        }
    }
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for the chat-completions API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,
    // Note: API key read from the environment or OS keychain, not from config
}

/// Orchestrator limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum orchestrator transitions per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Maximum number of tasks kept from a plan
    #[serde(default = "default_max_todos")]
    pub max_todos: usize,

    /// Planned lines shorter than this are dropped
    #[serde(default = "default_min_task_chars")]
    pub min_task_chars: usize,

    /// Scratch key the synthesized report is stored under
    #[serde(default = "default_final_report_key")]
    pub final_report_key: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_todos: default_max_todos(),
            min_task_chars: default_min_task_chars(),
            final_report_key: default_final_report_key(),
        }
    }
}

/// One registered specialist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecialistConfig {
    /// Registry identifier
    pub id: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Routing keywords, matched case-insensitively against task descriptions
    #[serde(default)]
    pub keywords: Vec<String>,

    /// System prompt the specialist runs under
    #[serde(default)]
    pub system_prompt: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    5000
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_groq_config() -> OpenAIConfig {
    OpenAIConfig {
        base_url: "https://api.groq.com/openai/v1".to_string(),
        model: "llama-3.3-70b-versatile".to_string(),
    }
}

fn default_max_iterations() -> usize {
    15
}

fn default_max_todos() -> usize {
    10
}

fn default_min_task_chars() -> usize {
    6
}

fn default_final_report_key() -> String {
    "final_report.md".to_string()
}

fn default_specialists() -> Vec<SpecialistConfig> {
    vec![
        SpecialistConfig {
            id: "summarizer".to_string(),
            description: "Condenses notes and findings into a short, faithful summary"
                .to_string(),
            keywords: vec![
                "summarize".to_string(),
                "summarise".to_string(),
                "summary".to_string(),
            ],
            system_prompt: "You are a summarization specialist. Produce a concise, faithful \
                summary of the material in the task. Keep key facts and numbers, drop filler, \
                and do not add information that is not present."
                .to_string(),
        },
        SpecialistConfig {
            id: "researcher".to_string(),
            description: "Gathers background, facts and open questions on a topic".to_string(),
            keywords: vec![
                "research".to_string(),
                "investigate".to_string(),
                "analyze".to_string(),
                "analyse".to_string(),
            ],
            system_prompt: "You are a research specialist. Explain the background of the \
                topic in the task, list the key facts, name the main options or viewpoints, \
                and finish with open questions worth checking."
                .to_string(),
        },
    ]
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    /// Load configuration from the default location (~/.baton/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written, TOML parsing
    /// fails, or validation fails.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default_config();
        config.validate()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.baton/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".baton").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LLMConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            specialists: default_specialists(),
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` naming the offending value when:
    /// - the log level or default provider is unknown
    /// - `max_iterations` or `max_todos` is zero
    /// - a specialist id is empty, duplicated, or has no routing keywords
    pub fn validate(&self) -> Result<(), EngineError> {
        if !VALID_LOG_LEVELS.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        if !VALID_PROVIDERS.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.llm.default_provider,
                VALID_PROVIDERS.join(", ")
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(EngineError::Config(
                "llm.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.orchestrator.max_iterations == 0 {
            return Err(EngineError::Config(
                "orchestrator.max_iterations must be greater than 0".to_string(),
            ));
        }

        if self.orchestrator.max_todos == 0 {
            return Err(EngineError::Config(
                "orchestrator.max_todos must be greater than 0".to_string(),
            ));
        }

        if self.orchestrator.final_report_key.trim().is_empty() {
            return Err(EngineError::Config(
                "orchestrator.final_report_key must not be empty".to_string(),
            ));
        }

        if is_task_key(&self.orchestrator.final_report_key) {
            return Err(EngineError::Config(format!(
                "orchestrator.final_report_key '{}' collides with task result keys \
                (task_<n>.md, <specialist>/task_<n>.md)",
                self.orchestrator.final_report_key
            )));
        }

        let mut seen = HashSet::new();
        for specialist in &self.specialists {
            if specialist.id.trim().is_empty() {
                return Err(EngineError::Config(
                    "Specialist id must not be empty".to_string(),
                ));
            }
            if !seen.insert(specialist.id.as_str()) {
                return Err(EngineError::Config(format!(
                    "Duplicate specialist id '{}'",
                    specialist.id
                )));
            }
            if specialist.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(EngineError::Config(format!(
                    "Specialist '{}' has no routing keywords",
                    specialist.id
                )));
            }
        }

        Ok(())
    }
}

/// `task_<n>.md`, optionally under one `<specialist>/` prefix
fn is_task_key(key: &str) -> bool {
    let name = match key.split_once('/') {
        Some((_, name)) => name,
        None => key,
    };
    name.strip_prefix("task_")
        .and_then(|rest| rest.strip_suffix(".md"))
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}
