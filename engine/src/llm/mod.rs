//! LLM Provider Abstraction Layer
//!
//! This module provides a common interface for the model-generation
//! collaborator (Ollama, OpenAI, Groq). The `LLMProvider` trait defines the
//! contract every provider implements, and `router::LLMRouter` layers
//! timeouts, rate-limit retries and failover on top of it.
//!
//! A generation request may carry an `OutputSchema`. Structured output is an
//! optional capability: providers that cannot honour a schema return
//! `LLMError::StructuredOutputUnsupported` and callers fall back to text.

use async_trait::async_trait;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod ollama;
pub mod openai;
pub mod router;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Structured output not supported by {0}")]
    StructuredOutputUnsupported(String),

    #[error("All LLM providers exhausted, last error: {0}")]
    AllProvidersExhausted(Box<LLMError>),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<LLMError> for EngineError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::AllProvidersExhausted(last) => {
                EngineError::AllProvidersExhausted(crate::secrets::scrub_secrets(&last.to_string()))
            }
            LLMError::Timeout => EngineError::Generation("generation timed out".to_string()),
            LLMError::RateLimitExceeded => EngineError::RateLimited {
                provider: "unknown".to_string(),
                attempts: 1,
            },
            LLMError::ProviderUnavailable(msg) | LLMError::AuthenticationFailed(msg) => {
                EngineError::LLMProvider(crate::secrets::scrub_secrets(&msg))
            }
            other => EngineError::Generation(crate::secrets::scrub_secrets(&other.to_string())),
        }
    }
}

/// Message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,

    /// System message
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// JSON schema the response must validate against
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputSchema {
    /// Schema name (used by OpenAI-compatible `response_format`)
    pub name: String,

    /// JSON schema document
    pub schema: serde_json::Value,
}

impl OutputSchema {
    /// Create a new named schema
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// A single call to the generation collaborator
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Conversation to send
    pub messages: Vec<Message>,

    /// Requested structured output, if any
    pub schema: Option<OutputSchema>,
}

impl GenerationRequest {
    /// Free-text request
    pub fn text(messages: Vec<Message>) -> Self {
        Self {
            messages,
            schema: None,
        }
    }

    /// Structured request validated against `schema`
    pub fn structured(messages: Vec<Message>, schema: OutputSchema) -> Self {
        Self {
            messages,
            schema: Some(schema),
        }
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LLMResponse {
    /// Free-text answer
    Text(String),

    /// Parsed JSON answer to a structured request
    Structured(serde_json::Value),
}

impl LLMResponse {
    /// Text view of the response; structured values are rendered as JSON.
    pub fn into_text(self) -> String {
        match self {
            LLMResponse::Text(text) => text,
            LLMResponse::Structured(value) => value.to_string(),
        }
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "ollama", "openai", "groq")
    fn name(&self) -> &str;

    /// Returns true if this is a local provider (e.g., Ollama)
    fn is_local(&self) -> bool;

    /// Whether the provider honours `GenerationRequest::schema`
    fn supports_structured_output(&self) -> bool {
        false
    }

    /// Generate a response from the LLM
    ///
    /// # Returns
    /// * `Ok(LLMResponse::Text)` for text requests
    /// * `Ok(LLMResponse::Structured)` for schema requests the provider honoured
    /// * `Err(LLMError)` if the request fails
    async fn generate(&self, request: &GenerationRequest) -> Result<LLMResponse>;

    /// Check if the provider is currently healthy and available
    async fn check_health(&self) -> bool {
        true
    }
}

/// Extract the body of the first markdown code fence in the text.
///
/// Works even when there is trailing prose after the closing fence.
/// Returns `None` if no fenced block is found.
pub fn extract_fenced_block(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start_rel = after_opening.find('\n')? + 1;
    let body_start = fence_start + 3 + body_start_rel;

    let closing = content[body_start..].find("```")?;
    let body_end = body_start + closing;

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Parse a JSON value out of model text: the whole text, a fenced block, or
/// the outermost `{...}` / `[...]` span embedded in prose.
pub fn parse_json_lenient(content: &str) -> Option<serde_json::Value> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if let Some(inner) = extract_fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str(inner.trim()) {
            return Some(value);
        }
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str(&trimmed[start..=end]) {
                    return Some(value);
                }
            }
        }
    }

    None
}
