//! Flow reconstruction error types.

use std::path::PathBuf;

/// Errors from building a reconstructor or selecting log sources.
///
/// Individual unreadable files and unparseable lines are skipped, never
/// reported here.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// The configured (or requested) log directory does not exist.
    #[error("log directory not found: {}", .0.display())]
    LogDirMissing(PathBuf),

    /// The log directory exists but could not be listed.
    #[error("log directory unreadable: {path}: {source}")]
    LogDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stage or bypass pattern is not a valid regex.
    #[error("invalid pattern for {owner}: {source}")]
    InvalidPattern {
        owner: String,
        #[source]
        source: regex::Error,
    },

    /// The log file glob is invalid.
    #[error("invalid file glob: {0}")]
    InvalidGlob(#[from] globset::Error),

    /// The stage configuration cannot describe a canonical flow.
    #[error("invalid flow configuration: {0}")]
    InvalidConfig(String),
}
