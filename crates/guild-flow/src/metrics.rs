//! Compliance metrics over a set of reconstructed timelines.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::timeline::ExecutionTimeline;

/// Stages an execution must show to count as complete.
pub const COMPLETION_THRESHOLD: usize = 4;

const BYPASS_PENALTY: f64 = 20.0;
const INCOMPLETE_PENALTY: f64 = 10.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplianceMetrics {
    pub total_executions: usize,
    /// Executions with at least [`COMPLETION_THRESHOLD`] canonical stages.
    pub complete_executions: usize,
    /// Fraction of executions that reached each canonical stage.
    pub per_stage_compliance_rate: BTreeMap<String, f64>,
    pub bypass_count: usize,
    /// `max(0, 100 - 20 * bypasses - 10 * incomplete executions)`.
    pub compliance_score: f64,
    /// 1.0 for executions that reached every canonical stage, else 0.0.
    pub execution_completeness: BTreeMap<String, f64>,
}

impl ComplianceMetrics {
    /// Compute metrics for `timelines` against the `canonical` stage list.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute<'a>(
        timelines: impl IntoIterator<Item = &'a ExecutionTimeline>,
        canonical: &[&str],
        bypass_count: usize,
    ) -> Self {
        let timelines: Vec<&ExecutionTimeline> = timelines.into_iter().collect();
        let total = timelines.len();
        if total == 0 {
            return Self::default();
        }

        let complete = timelines
            .iter()
            .filter(|t| t.present_count(canonical) >= COMPLETION_THRESHOLD)
            .count();

        let per_stage_compliance_rate = canonical
            .iter()
            .map(|stage| {
                let reached = timelines.iter().filter(|t| t.has_stage(stage)).count();
                ((*stage).to_string(), reached as f64 / total as f64)
            })
            .collect();

        let execution_completeness = timelines
            .iter()
            .map(|t| {
                let value = if t.is_fully_traversed(canonical) { 1.0 } else { 0.0 };
                (t.execution_id.clone(), value)
            })
            .collect();

        let penalty = BYPASS_PENALTY * bypass_count as f64
            + INCOMPLETE_PENALTY * (total - complete) as f64;

        Self {
            total_executions: total,
            complete_executions: complete,
            per_stage_compliance_rate,
            bypass_count,
            compliance_score: (100.0 - penalty).max(0.0),
            execution_completeness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::StageRecord;
    use chrono::{TimeZone, Utc};

    const CANONICAL: [&str; 5] = ["s1", "s2", "s3", "s4", "s5"];

    fn timeline(id: &str, stages: &[&str]) -> ExecutionTimeline {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut t = ExecutionTimeline::new(id, id, ts);
        for (i, stage) in stages.iter().enumerate() {
            t.record(
                *stage,
                StageRecord {
                    detected: true,
                    timestamp: ts,
                    evidence_line: String::new(),
                    source_file: "a.log".into(),
                    line_number: i + 1,
                },
            );
        }
        t
    }

    #[test]
    fn empty_input_is_all_zero() {
        let m = ComplianceMetrics::compute(std::iter::empty(), &CANONICAL, 0);
        assert_eq!(m, ComplianceMetrics::default());
        assert!((m.compliance_score - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn four_of_five_counts_as_complete() {
        let full = timeline("a", &CANONICAL);
        let four = timeline("b", &["s1", "s2", "s3", "s5"]);
        let two = timeline("c", &["s1", "s2"]);
        let m = ComplianceMetrics::compute([&full, &four, &two], &CANONICAL, 0);

        assert_eq!(m.total_executions, 3);
        assert_eq!(m.complete_executions, 2);
        assert!((m.compliance_score - 90.0).abs() < f64::EPSILON);
        assert!((m.per_stage_compliance_rate["s1"] - 1.0).abs() < f64::EPSILON);
        assert!((m.per_stage_compliance_rate["s4"] - 1.0 / 3.0).abs() < 1e-9);
        assert!((m.execution_completeness["a"] - 1.0).abs() < f64::EPSILON);
        assert!((m.execution_completeness["b"] - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn score_floors_at_zero() {
        let full = timeline("a", &CANONICAL);
        let m = ComplianceMetrics::compute([&full], &CANONICAL, 6);
        assert_eq!(m.bypass_count, 6);
        assert!((m.compliance_score - 0.0).abs() < f64::EPSILON);
    }
}
