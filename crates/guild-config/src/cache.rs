//! Result cache configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default freshness window: 24 hours.
const fn default_ttl_secs() -> u64 {
    86_400
}

const fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Cache directory. Falls back to the per-user cache dir when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Seconds a cached result stays fresh.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// When false, config-built cached auditors call through without
    /// reading or writing entries.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            ttl_secs: default_ttl_secs(),
            enabled: default_enabled(),
        }
    }
}

impl CacheConfig {
    /// The directory entries are stored in.
    ///
    /// Uses the configured `dir`, else `<user cache dir>/guild/results`, else
    /// `.guild/cache` relative to the working directory.
    #[must_use]
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::cache_dir().map_or_else(
                || PathBuf::from(".guild").join("cache"),
                |p| p.join("guild").join("results"),
            )
        })
    }
}
