//! Cross-cutting error types for Guild.
//!
//! Only programming-contract failures surface as `CoreError`. Runtime data
//! failures (a broken auditor, a corrupt cache entry, an unreadable log) are
//! turned into data by the crates that encounter them.

use thiserror::Error;

/// Errors raised while constructing core model values.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A severity string did not name one of the four known levels.
    #[error("Invalid severity: '{0}' (expected critical, high, medium or low)")]
    InvalidSeverity(String),

    /// A category string did not name one of the scoring categories.
    #[error("Invalid category: '{0}'")]
    InvalidCategory(String),

    /// Data failed validation (format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Canonical serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
