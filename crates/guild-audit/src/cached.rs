//! Result caching as a decorator over any auditor.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use guild_cache::{CacheError, ResultCache};
use guild_config::CacheConfig;
use guild_core::{AuditResult, Target};

use crate::auditor::Auditor;
use crate::error::AuditError;

/// Serves fresh results from a shared [`ResultCache`] and fills it on a miss.
///
/// Only successful results are stored. Concurrent misses for the same key may
/// both run the inner auditor; the last write wins. Cache file I/O runs on the
/// blocking pool. Without a cache every call goes straight to the inner auditor.
#[derive(Debug, Clone)]
pub struct CachedAuditor<A> {
    inner: A,
    auditor_id: String,
    cache: Option<Arc<ResultCache>>,
}

impl<A: Auditor> CachedAuditor<A> {
    /// Wrap `inner`, namespacing its entries under `auditor_id`.
    #[must_use]
    pub fn new(inner: A, auditor_id: impl Into<String>, cache: Arc<ResultCache>) -> Self {
        Self {
            inner,
            auditor_id: auditor_id.into(),
            cache: Some(cache),
        }
    }

    /// Wrap `inner` with a cache opened from `config`, or with no cache at all
    /// when `config.enabled` is false.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the cache directory cannot be opened.
    pub fn from_config(
        inner: A,
        auditor_id: impl Into<String>,
        config: &CacheConfig,
    ) -> Result<Self, CacheError> {
        let cache = if config.enabled {
            Some(Arc::new(ResultCache::from_config(config)?))
        } else {
            None
        };
        Ok(Self {
            inner,
            auditor_id: auditor_id.into(),
            cache,
        })
    }

    #[must_use]
    pub fn auditor_id(&self) -> &str {
        &self.auditor_id
    }

    #[must_use]
    pub const fn cache(&self) -> Option<&Arc<ResultCache>> {
        self.cache.as_ref()
    }
}

impl<A: Auditor> Auditor for CachedAuditor<A> {
    fn audit<'a>(&'a self, target: &'a Target) -> BoxFuture<'a, Result<AuditResult, AuditError>> {
        async move {
            let Some(cache) = &self.cache else {
                return self.inner.audit(target).await;
            };

            let lookup = {
                let cache = Arc::clone(cache);
                let id = self.auditor_id.clone();
                let target = target.clone();
                tokio::task::spawn_blocking(move || cache.get(&id, &target))
            };
            if let Some(hit) = lookup.await? {
                return Ok(hit);
            }

            let result = self.inner.audit(target).await?;

            let store = {
                let cache = Arc::clone(cache);
                let id = self.auditor_id.clone();
                let target = target.clone();
                let result = result.clone();
                tokio::task::spawn_blocking(move || cache.set(&id, &target, &result))
            };
            match store.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(auditor = %self.auditor_id, error = %e, "failed to cache audit result");
                }
                Err(e) => {
                    tracing::warn!(auditor = %self.auditor_id, error = %e, "cache write task did not complete");
                }
            }
            Ok(result)
        }
        .boxed()
    }

    fn scope(&self) -> String {
        if self.cache.is_some() {
            format!("{} (cached)", self.inner.scope())
        } else {
            self.inner.scope()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guild_core::{Category, Severity, Violation};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Counting {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Auditor for Counting {
        fn audit<'a>(&'a self, _target: &'a Target) -> BoxFuture<'a, Result<AuditResult, AuditError>> {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if self.fail {
                    return Err(AuditError::Failed("flaky".into()));
                }
                Ok(AuditResult::new("counting").with_violation(Violation::new(
                    Severity::Low,
                    Category::Quality,
                    "todo",
                    "TODO left",
                    "src/lib.rs has a TODO",
                )))
            }
            .boxed()
        }

        fn scope(&self) -> String {
            "counts calls".into()
        }
    }

    fn cache(dir: &std::path::Path) -> Arc<ResultCache> {
        Arc::new(ResultCache::new(dir, Duration::from_secs(3600)).unwrap())
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let auditor = CachedAuditor::new(
            Counting {
                calls: Arc::clone(&calls),
                fail: false,
            },
            "counting",
            cache(tmp.path()),
        );
        let target = Target::codebase("/repo");

        let first = auditor.audit(&target).await.unwrap();
        let second = auditor.audit(&target).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(auditor.cache().unwrap().stats().hits, 1);
    }

    #[tokio::test]
    async fn different_targets_do_not_share_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let auditor = CachedAuditor::new(
            Counting {
                calls: Arc::clone(&calls),
                fail: false,
            },
            "counting",
            cache(tmp.path()),
        );
        auditor.audit(&Target::codebase("/a")).await.unwrap();
        auditor.audit(&Target::codebase("/b")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_config_bypasses_the_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            dir: Some(tmp.path().join("results")),
            enabled: false,
            ..CacheConfig::default()
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let auditor = CachedAuditor::from_config(
            Counting {
                calls: Arc::clone(&calls),
                fail: false,
            },
            "counting",
            &config,
        )
        .unwrap();
        let target = Target::codebase("/repo");

        auditor.audit(&target).await.unwrap();
        auditor.audit(&target).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(auditor.cache().is_none());
        assert!(!tmp.path().join("results").exists());
        assert_eq!(auditor.scope(), "counts calls");
    }

    #[tokio::test]
    async fn enabled_config_opens_configured_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            dir: Some(tmp.path().join("results")),
            ..CacheConfig::default()
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let auditor = CachedAuditor::from_config(
            Counting {
                calls: Arc::clone(&calls),
                fail: false,
            },
            "counting",
            &config,
        )
        .unwrap();
        let target = Target::codebase("/repo");

        auditor.audit(&target).await.unwrap();
        auditor.audit(&target).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(auditor.cache().unwrap().dir(), tmp.path().join("results").as_path());
        assert_eq!(auditor.cache().unwrap().stats().total_entries, 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let tmp = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let auditor = CachedAuditor::new(
            Counting {
                calls: Arc::clone(&calls),
                fail: true,
            },
            "counting",
            cache(tmp.path()),
        );
        assert!(auditor.audit(&Target::empty()).await.is_err());
        assert!(auditor.audit(&Target::empty()).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(auditor.cache().unwrap().stats().total_entries, 0);
    }
}
