//! Concurrent fan-out of registered auditors over one target.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use guild_config::OrchestratorConfig;
use guild_core::Target;
use tokio::task::JoinSet;

use crate::auditor::Auditor;
use crate::composite::{CompositeResult, FailedAudit, IndividualResult};
use crate::error::AuditError;
use crate::history::RunHistory;
use crate::score::ScoreAggregator;

/// Holds the auditor registry and the run history.
///
/// Each run spawns one task per registered auditor against a shared, immutable
/// target. No timeout is imposed; a stalled auditor stalls the run.
pub struct Orchestrator {
    auditors: HashMap<String, Arc<dyn Auditor>>,
    aggregator: ScoreAggregator,
    history: RunHistory,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::from_config(&OrchestratorConfig::default())
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("auditors", &self.auditor_keys())
            .field("aggregator", &self.aggregator)
            .field("history", &self.history.len())
            .finish()
    }
}

impl Orchestrator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self {
            auditors: HashMap::new(),
            aggregator: ScoreAggregator::default(),
            history: RunHistory::new(config.history_limit),
        }
    }

    #[must_use]
    pub fn with_aggregator(mut self, aggregator: ScoreAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Register `auditor` under `key`, replacing any auditor already there.
    pub fn register_auditor(&mut self, key: impl Into<String>, auditor: impl Auditor + 'static) {
        self.register_shared(key, Arc::new(auditor));
    }

    /// [`register_auditor`](Self::register_auditor) for an already shared auditor.
    pub fn register_shared(&mut self, key: impl Into<String>, auditor: Arc<dyn Auditor>) {
        let key = key.into();
        if self.auditors.insert(key.clone(), auditor).is_some() {
            tracing::debug!(auditor = %key, "auditor re-registered");
        }
    }

    /// Remove the auditor under `key`. Returns whether one was registered.
    pub fn unregister_auditor(&mut self, key: &str) -> bool {
        self.auditors.remove(key).is_some()
    }

    /// Registered keys, sorted.
    #[must_use]
    pub fn auditor_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.auditors.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Scope description of every registered auditor.
    #[must_use]
    pub fn auditor_scopes(&self) -> BTreeMap<String, String> {
        self.auditors
            .iter()
            .map(|(key, auditor)| (key.clone(), auditor.scope()))
            .collect()
    }

    /// Run every registered auditor concurrently against `target`.
    ///
    /// Never fails: auditor errors and panics are collected into
    /// `failed_audits`. The result is appended to the run history.
    pub async fn run_comprehensive_audit(&mut self, target: Target) -> CompositeResult {
        let started_at = Utc::now();
        let clock = Instant::now();
        let target = Arc::new(target);

        tracing::info!(auditors = self.auditors.len(), kind = %target.kind(), "starting comprehensive audit");

        let mut set = JoinSet::new();
        let mut keys = HashMap::with_capacity(self.auditors.len());
        for (key, auditor) in &self.auditors {
            let auditor = Arc::clone(auditor);
            let target = Arc::clone(&target);
            let handle = set.spawn(async move { auditor.audit(&target).await });
            keys.insert(handle.id(), key.clone());
        }

        let mut completed = Vec::new();
        let mut failed = Vec::new();
        while let Some(joined) = set.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, outcome)) => (id, outcome),
                Err(e) => (e.id(), Err(AuditError::from(e))),
            };
            let key = keys.remove(&id).unwrap_or_else(|| id.to_string());
            match outcome {
                Ok(result) => {
                    tracing::debug!(auditor = %key, violations = result.violations().len(), "auditor finished");
                    completed.push(IndividualResult { key, result });
                }
                Err(e) => {
                    tracing::warn!(auditor = %key, error = %e, "auditor failed");
                    failed.push(FailedAudit {
                        key,
                        error: e.to_string(),
                    });
                }
            }
        }

        let composite =
            CompositeResult::assemble(started_at, clock.elapsed(), completed, failed, &self.aggregator);
        tracing::info!(
            run = composite.auditors_run,
            failed = composite.auditors_failed,
            violations = composite.total_violations,
            score = composite.guild_health_score.overall,
            evaluation = %composite.evaluation,
            "comprehensive audit finished"
        );

        self.history.push(composite.clone());
        composite
    }

    /// The most recent `limit` runs, newest last.
    #[must_use]
    pub fn history(&self, limit: usize) -> Vec<&CompositeResult> {
        self.history.recent(limit)
    }

    #[must_use]
    pub fn latest(&self) -> Option<&CompositeResult> {
        self.history.latest()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
