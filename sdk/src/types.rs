//! Shared specialist types

use serde::{Deserialize, Serialize};

/// Listing metadata for a registered specialist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpecialistInfo {
    /// Registry identifier
    pub id: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,
}
