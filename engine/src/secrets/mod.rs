//! Secret lookup and scrubbing
//!
//! API keys never live in config.toml. `SecretManager` resolves them from the
//! environment first (`OPENAI_API_KEY`, `GROQ_API_KEY`) and then from the OS
//! keychain:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (libsecret)
//!
//! Lookups are non-interactive; a missing key simply leaves that provider
//! out of the router.
//!
//! The module also scrubs secret-looking strings from text before it is
//! logged or recorded in a scratch store.

use keyring::Entry;
use regex::Regex;
use sdk::errors::EngineError;
use std::sync::OnceLock;

/// Regex patterns for detecting common secret formats.
static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Initializes and returns the secret detection patterns.
///
/// Patterns match:
/// - OpenAI API keys: sk-[a-zA-Z0-9]{20,}
/// - Groq API keys: gsk_[a-zA-Z0-9]{20,}
/// - Bearer tokens: Bearer\s+[^\s]{20,}
fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        [
            r"sk-[a-zA-Z0-9\-_]{20,}",
            r"gsk_[a-zA-Z0-9]{20,}",
            r"Bearer\s+[^\s]{20,}",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

/// Replace every detected secret in `text` with `[REDACTED]`.
///
/// # Examples
/// ```
/// use baton_engine::secrets::scrub_secrets;
///
/// let scrubbed = scrub_secrets("My API key is sk-1234567890abcdefghij");
/// assert_eq!(scrubbed, "My API key is [REDACTED]");
/// ```
pub fn scrub_secrets(text: &str) -> String {
    let mut result = text.to_string();
    for pattern in get_secret_patterns() {
        result = pattern.replace_all(&result, "[REDACTED]").to_string();
    }
    result
}

/// Resolves API keys from the environment and the OS keychain.
pub struct SecretManager {
    service_name: String,
}

impl SecretManager {
    /// Creates a new SecretManager with the given keychain service name.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Environment variable consulted before the keychain for `key`
    /// (e.g. "groq_api_key" -> "GROQ_API_KEY").
    pub fn env_var_name(key: &str) -> String {
        key.to_uppercase()
    }

    /// Retrieves a secret.
    ///
    /// # Errors
    /// Returns `EngineError::Keyring` if neither the environment nor the
    /// keychain holds a value.
    pub fn get_secret(&self, key: &str) -> Result<String, EngineError> {
        if let Ok(value) = std::env::var(Self::env_var_name(key)) {
            if !value.trim().is_empty() {
                tracing::debug!("Resolved secret '{}' from environment", key);
                return Ok(value);
            }
        }

        let entry = Entry::new(&self.service_name, key).map_err(|e| {
            EngineError::Keyring(format!("Failed to create keyring entry: {}", e))
        })?;

        match entry.get_password() {
            Ok(secret) => {
                tracing::debug!("Retrieved secret '{}' from keychain", key);
                Ok(secret)
            }
            Err(keyring::Error::NoEntry) => Err(EngineError::Keyring(format!(
                "Secret '{}' not set. Export {} or store it in the keychain",
                key,
                Self::env_var_name(key)
            ))),
            Err(e) => Err(EngineError::Keyring(format!(
                "Failed to retrieve secret '{}': {}",
                key, e
            ))),
        }
    }

    /// Stores a secret in the OS keychain.
    pub fn set_secret(&self, key: &str, value: &str) -> Result<(), EngineError> {
        let entry = Entry::new(&self.service_name, key).map_err(|e| {
            EngineError::Keyring(format!("Failed to create keyring entry: {}", e))
        })?;

        entry.set_password(value).map_err(|e| {
            EngineError::Keyring(format!("Failed to store secret '{}': {}", key, e))
        })?;

        tracing::info!("Stored secret '{}' in keychain", key);
        Ok(())
    }

    /// Checks whether a secret is available without failing.
    pub fn has_secret(&self, key: &str) -> bool {
        self.get_secret(key).is_ok()
    }
}
