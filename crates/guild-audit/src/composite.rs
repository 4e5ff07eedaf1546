//! The aggregate output of one orchestrated run.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use guild_core::{AuditResult, Evaluation, Severity, Violation};
use serde::{Deserialize, Serialize};

use crate::recommendations::recommend;
use crate::score::{HealthScore, ScoreAggregator};

/// An auditor invocation that returned an error or panicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAudit {
    pub key: String,
    pub error: String,
}

/// One successful invocation, tagged with its registration key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualResult {
    pub key: String,
    pub result: AuditResult,
}

/// Summary figures over a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Successful auditors over auditors run; 0 when nothing ran.
    pub success_rate: f64,
    pub violations_per_auditor: BTreeMap<String, usize>,
    /// Metric entries across all successful results.
    pub metrics_reported: usize,
    /// Most frequent violation kind (ties go to the alphabetically first).
    pub most_common_kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    pub timestamp: DateTime<Utc>,
    pub duration_seconds: f64,
    pub auditors_run: usize,
    pub auditors_failed: usize,
    /// Completion order, not registration order.
    pub individual_results: Vec<IndividualResult>,
    /// Violations flattened in completion order.
    pub all_violations: Vec<Violation>,
    pub total_violations: usize,
    /// Violation count per severity; every severity is present.
    pub violation_breakdown: BTreeMap<Severity, usize>,
    pub guild_health_score: HealthScore,
    pub evaluation: Evaluation,
    pub failed_audits: Vec<FailedAudit>,
    pub recommendations: Vec<String>,
    pub statistics: RunStatistics,
}

impl CompositeResult {
    /// Score and summarize collected outcomes.
    #[must_use]
    pub fn assemble(
        timestamp: DateTime<Utc>,
        elapsed: Duration,
        individual_results: Vec<IndividualResult>,
        failed_audits: Vec<FailedAudit>,
        aggregator: &ScoreAggregator,
    ) -> Self {
        let all_violations: Vec<Violation> = individual_results
            .iter()
            .flat_map(|r| r.result.violations().iter().cloned())
            .collect();

        let mut violation_breakdown: BTreeMap<Severity, usize> =
            Severity::ALL.iter().map(|s| (*s, 0)).collect();
        for violation in &all_violations {
            *violation_breakdown.entry(violation.severity()).or_default() += 1;
        }

        let guild_health_score = aggregator.aggregate(&all_violations);
        let recommendations = recommend(&guild_health_score, &all_violations);
        let auditors_run = individual_results.len() + failed_audits.len();
        let statistics = statistics(&individual_results, &all_violations, auditors_run);

        Self {
            timestamp,
            duration_seconds: elapsed.as_secs_f64(),
            auditors_run,
            auditors_failed: failed_audits.len(),
            total_violations: all_violations.len(),
            evaluation: guild_health_score.evaluation,
            individual_results,
            all_violations,
            violation_breakdown,
            guild_health_score,
            failed_audits,
            recommendations,
            statistics,
        }
    }

    /// Result of the auditor registered under `key`, if it succeeded.
    #[must_use]
    pub fn result_for(&self, key: &str) -> Option<&AuditResult> {
        self.individual_results
            .iter()
            .find(|r| r.key == key)
            .map(|r| &r.result)
    }
}

#[allow(clippy::cast_precision_loss)]
fn statistics(
    results: &[IndividualResult],
    violations: &[Violation],
    auditors_run: usize,
) -> RunStatistics {
    let success_rate = if auditors_run == 0 {
        0.0
    } else {
        results.len() as f64 / auditors_run as f64
    };

    let violations_per_auditor = results
        .iter()
        .map(|r| (r.key.clone(), r.result.violations().len()))
        .collect();

    let metrics_reported = results.iter().map(|r| r.result.metrics().len()).sum();

    let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
    for violation in violations {
        *kinds.entry(violation.kind()).or_default() += 1;
    }
    // BTreeMap iterates alphabetically; keep the first of equal counts.
    let most_common_kind = kinds
        .into_iter()
        .fold(None::<(&str, usize)>, |best, (kind, count)| match best {
            Some((_, top)) if top >= count => best,
            _ => Some((kind, count)),
        })
        .map(|(kind, _)| kind.to_string());

    RunStatistics {
        success_rate,
        violations_per_auditor,
        metrics_reported,
        most_common_kind,
    }
}
