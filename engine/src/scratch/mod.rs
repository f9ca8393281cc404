//! Scratch Store
//!
//! In-memory key/content store that stages results between the orchestrator
//! and the synthesizer. Each run owns exactly one store; nothing here touches
//! disk.
//!
//! Semantics:
//! - `write` creates or overwrites, keeping the key's original position.
//! - `edit` replaces the whole value and refuses keys that were never written.
//! - `read` of a missing key returns an empty string instead of failing.
//! - `list` and `entries` follow insertion order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Errors raised by mutating operations on a missing key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScratchError {
    #[error("Scratch entry not found: {0}")]
    NotFound(String),
}

impl From<ScratchError> for sdk::errors::EngineError {
    fn from(err: ScratchError) -> Self {
        match err {
            ScratchError::NotFound(key) => sdk::errors::EngineError::NotFound(key),
        }
    }
}

/// A single named piece of content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScratchEntry {
    pub key: String,
    pub content: String,
}

/// Insertion-ordered key/content store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScratchStore {
    entries: Vec<ScratchEntry>,
}

impl ScratchStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }

    /// All keys, in insertion order
    pub fn list(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }

    /// Content under `key`, or an empty string when absent
    pub fn read(&self, key: &str) -> String {
        self.position(key)
            .map(|i| self.entries[i].content.clone())
            .unwrap_or_default()
    }

    /// Create or overwrite `key`
    pub fn write(&mut self, key: impl Into<String>, content: impl Into<String>) {
        let key = key.into();
        let content = content.into();

        match self.position(&key) {
            Some(i) => self.entries[i].content = content,
            None => self.entries.push(ScratchEntry { key, content }),
        }
    }

    /// Replace the content of an existing key
    pub fn edit(&mut self, key: &str, content: impl Into<String>) -> Result<(), ScratchError> {
        let i = self
            .position(key)
            .ok_or_else(|| ScratchError::NotFound(key.to_string()))?;
        self.entries[i].content = content.into();
        Ok(())
    }

    /// Remove `key`
    pub fn delete(&mut self, key: &str) -> Result<(), ScratchError> {
        let i = self
            .position(key)
            .ok_or_else(|| ScratchError::NotFound(key.to_string()))?;
        self.entries.remove(i);
        Ok(())
    }

    pub fn exists(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ordered snapshot of `(key, content)` pairs
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|e| (e.key.clone(), e.content.clone()))
            .collect()
    }

    /// Ordered snapshot without `skip_key`
    pub fn entries_excluding(&self, skip_key: &str) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter(|e| e.key != skip_key)
            .map(|e| (e.key.clone(), e.content.clone()))
            .collect()
    }

    /// Consume the store into a key -> content mapping
    pub fn into_map(self) -> BTreeMap<String, String> {
        self.entries
            .into_iter()
            .map(|e| (e.key, e.content))
            .collect()
    }
}
