//! Baton SDK
//!
//! Shared library providing the specialist trait and error types.
//! This crate is used by the engine and by out-of-tree specialists.

/// Error types and handling
pub mod errors;

/// Specialist trait
pub mod specialist;

/// Specialist listing types
pub mod types;

// Re-export commonly used types
pub use errors::{BatonErrorExt, EngineError};
pub use specialist::Specialist;
pub use types::SpecialistInfo;
