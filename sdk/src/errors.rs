//! Error types and handling
//!
//! This module provides the error types used throughout the Baton engine.
//! All errors implement the `BatonErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error messages never carry API keys. Provider errors are scrubbed by the
//! engine before they are wrapped here.

use thiserror::Error;

/// Trait for Baton error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait BatonErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around. Non-recoverable
    /// errors typically require a configuration change.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Generation**: model call failures, timeouts, rate limiting
/// - **Delegation**: unknown or failing specialists
/// - **Scratch store**: missing keys on edit/delete
///
/// # Examples
///
/// ```
/// use sdk::errors::{BatonErrorExt, EngineError};
///
/// let error = EngineError::UnknownSpecialist {
///     id: "poet".to_string(),
///     available: vec!["researcher".to_string(), "summarizer".to_string()],
/// };
/// assert!(error.to_string().contains("poet"));
/// assert!(error.to_string().contains("researcher, summarizer"));
/// assert!(!error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    #[error("All LLM providers exhausted: {0}")]
    AllProvidersExhausted(String),

    #[error("Generation timed out after {0}s")]
    GenerationTimeout(u64),

    #[error("Rate limited by {provider} after {attempts} attempts")]
    RateLimited { provider: String, attempts: u32 },

    #[error("Generation failed: {0}")]
    Generation(String),

    // Delegation errors
    #[error("Unknown specialist '{}'. Available specialists: {}", .id, .available.join(", "))]
    UnknownSpecialist { id: String, available: Vec<String> },

    #[error("Specialist '{id}' failed: {reason}")]
    SpecialistFailed { id: String, reason: String },

    // Scratch store errors
    #[error("Not found: {0}")]
    NotFound(String),

    // Keyring errors
    #[error("Keyring error: {0}")]
    Keyring(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BatonErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",

            Self::LLMProvider(_) => "LLM provider unavailable. Check your API keys and network",
            Self::AllProvidersExhausted(_) => "No LLM providers available. Check configuration",
            Self::GenerationTimeout(_) => {
                "LLM provider took too long to respond. Raise llm.timeout_secs or try again"
            }
            Self::RateLimited { .. } => "Rate limit exceeded. Please wait before trying again",
            Self::Generation(_) => "The model call failed. Try again",

            Self::UnknownSpecialist { .. } => {
                "The requested specialist is not registered. Run 'baton specialists'"
            }
            Self::SpecialistFailed { .. } => "A specialist failed while handling its task",

            Self::NotFound(_) => "Write the entry before editing or deleting it",

            Self::Keyring(_) => "Failed to access secure storage. Check system keychain",

            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::Config(_) | Self::AllProvidersExhausted(_) | Self::UnknownSpecialist { .. } => {
                false
            }

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}
