//! Domain error model.

use thiserror::Error;

/// Domain-level error.
///
/// Only deterministic failures of domain values (identifier parsing) live
/// here. Inventory-intelligence failures have their own taxonomy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
