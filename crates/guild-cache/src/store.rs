//! On-disk result store.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use guild_config::CacheConfig;
use guild_core::{AuditResult, Target};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::CacheError;
use crate::key::cache_key;

const ENTRY_EXTENSION: &str = "json";

/// The serialized form of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEnvelope {
    pub timestamp: DateTime<Utc>,
    pub auditor_id: String,
    pub target: Target,
    pub result: AuditResult,
}

/// Lifetime counters of a [`ResultCache`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// `hits / (hits + misses)`, or 0 before the first lookup.
    pub hit_rate: f64,
    pub total_entries: usize,
}

/// Content-addressed, TTL-bound cache of auditor results.
///
/// All methods take `&self`; counters are atomic so one cache can be shared
/// behind an `Arc` by auditors running concurrently.
#[derive(Debug)]
pub struct ResultCache {
    dir: PathBuf,
    ttl: TimeDelta,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ResultCache {
    /// Open (creating if needed) a cache rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidConfig` for a zero or out-of-range TTL and
    /// `CacheError::Io` if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self, CacheError> {
        if ttl.is_zero() {
            return Err(CacheError::InvalidConfig("ttl must be non-zero".into()));
        }
        let ttl = TimeDelta::from_std(ttl)
            .map_err(|e| CacheError::InvalidConfig(format!("ttl out of range: {e}")))?;
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    /// Open the cache described by `config`.
    ///
    /// # Errors
    ///
    /// See [`ResultCache::new`].
    pub fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        Self::new(
            config.resolved_dir(),
            Duration::from_secs(config.ttl_secs),
        )
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub const fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Look up a fresh result for `(auditor_id, target)`.
    pub fn get(&self, auditor_id: &str, target: &Target) -> Option<AuditResult> {
        self.get_at(auditor_id, target, Utc::now())
    }

    /// [`get`](Self::get) against an explicit clock.
    ///
    /// Absent, stale and undecodable entries are all misses. Stale entries are
    /// removed and counted as evictions.
    pub fn get_at(
        &self,
        auditor_id: &str,
        target: &Target,
        now: DateTime<Utc>,
    ) -> Option<AuditResult> {
        let key = match cache_key(auditor_id, target) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(auditor = auditor_id, error = %e, "cache key derivation failed");
                return self.miss();
            }
        };
        let path = self.entry_path(&key);

        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(auditor = auditor_id, %key, "cache miss");
                return self.miss();
            }
            Err(e) => {
                tracing::warn!(auditor = auditor_id, %key, error = %e, "cache entry unreadable");
                return self.miss();
            }
        };

        let envelope: CacheEnvelope = match serde_json::from_slice(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(auditor = auditor_id, %key, error = %e, "corrupt cache entry treated as miss");
                return self.miss();
            }
        };

        if now.signed_duration_since(envelope.timestamp) > self.ttl {
            tracing::debug!(auditor = auditor_id, %key, "cache entry expired");
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(%key, error = %e, "failed to remove expired cache entry");
                }
            }
            self.evictions.fetch_add(1, Ordering::Relaxed);
            return self.miss();
        }

        tracing::debug!(auditor = auditor_id, %key, "cache hit");
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(envelope.result)
    }

    /// Store `result` for `(auditor_id, target)`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the key cannot be derived or the write fails.
    pub fn set(
        &self,
        auditor_id: &str,
        target: &Target,
        result: &AuditResult,
    ) -> Result<(), CacheError> {
        self.set_at(auditor_id, target, result, Utc::now())
    }

    /// [`set`](Self::set) with an explicit entry timestamp.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the key cannot be derived or the write fails.
    pub fn set_at(
        &self,
        auditor_id: &str,
        target: &Target,
        result: &AuditResult,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let key = cache_key(auditor_id, target)?;
        let envelope = CacheEnvelope {
            timestamp: now,
            auditor_id: auditor_id.to_string(),
            target: target.clone(),
            result: result.clone(),
        };
        let payload = serde_json::to_vec(&envelope)?;

        // Same directory as the destination so the rename stays on one filesystem.
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&payload)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.entry_path(&key))?;

        tracing::debug!(auditor = auditor_id, %key, "cache entry written");
        Ok(())
    }

    /// Snapshot of the lifetime counters plus the current entry count.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        #[allow(clippy::cast_precision_loss)]
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        };
        CacheStats {
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            hit_rate,
            total_entries: self.entry_paths().map(|paths| paths.len()).unwrap_or(0),
        }
    }

    /// Remove every entry, or only those written for `auditor_id`.
    ///
    /// Returns the number of entries removed. When filtering by auditor,
    /// entries that cannot be decoded are left in place.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the directory cannot be listed or an entry
    /// cannot be removed.
    pub fn clear(&self, auditor_id: Option<&str>) -> Result<usize, CacheError> {
        let mut removed = 0;
        for path in self.entry_paths()? {
            let matches = match auditor_id {
                None => true,
                Some(id) => read_envelope(&path).is_some_and(|env| env.auditor_id == id),
            };
            if matches && remove_if_present(&path)? {
                removed += 1;
            }
        }
        tracing::debug!(auditor = ?auditor_id, removed, "cache cleared");
        Ok(removed)
    }

    /// Remove every entry older than the TTL.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the directory cannot be listed or an entry
    /// cannot be removed.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        self.purge_expired_at(Utc::now())
    }

    /// [`purge_expired`](Self::purge_expired) against an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`purge_expired`](Self::purge_expired).
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<usize, CacheError> {
        let mut removed = 0;
        for path in self.entry_paths()? {
            let Some(envelope) = read_envelope(&path) else {
                continue;
            };
            if now.signed_duration_since(envelope.timestamp) > self.ttl
                && remove_if_present(&path)?
            {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn miss(&self) -> Option<AuditResult> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{ENTRY_EXTENSION}"))
    }

    fn entry_paths(&self) -> Result<Vec<PathBuf>, CacheError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

fn read_envelope(path: &Path) -> Option<CacheEnvelope> {
    let raw = fs::read(path).ok()?;
    serde_json::from_slice(&raw).ok()
}

fn remove_if_present(path: &Path) -> Result<bool, CacheError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
