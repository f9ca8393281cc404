//! Baton Engine Library
//!
//! This library provides the core functionality of the Baton orchestrator.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// LLM provider abstraction layer
pub mod llm;

/// In-memory scratch store shared by the stages of a run
pub mod scratch;

/// Conductor orchestration module
pub mod conductor;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;

#[cfg(test)]
pub(crate) mod testing;
