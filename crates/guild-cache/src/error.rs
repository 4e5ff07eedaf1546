//! Cache error types.

use thiserror::Error;

/// Errors from cache writes and maintenance.
///
/// Reads never fail: a missing, stale or corrupt entry is a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem operation on the cache directory failed.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding an entry failed.
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The target could not be canonicalized into a key.
    #[error("cache key error: {0}")]
    Key(#[from] guild_core::CoreError),

    /// The atomic rename of a freshly written entry failed.
    #[error("cache persist error: {0}")]
    Persist(#[from] tempfile::PersistError),

    /// The cache was configured with unusable settings.
    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),
}
