//! Per-execution stage timelines.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Evidence that a stage was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub detected: bool,
    pub timestamp: DateTime<Utc>,
    pub evidence_line: String,
    pub source_file: String,
    /// 1-based line number inside `source_file`.
    pub line_number: usize,
}

/// Everything observed for one logical execution in one reconstruction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionTimeline {
    pub execution_id: String,
    task_id: String,
    start_time: DateTime<Utc>,
    stages: BTreeMap<String, StageRecord>,
}

impl ExecutionTimeline {
    /// Open a timeline from its first stage match.
    ///
    /// The task id and start time are fixed here and never change afterwards.
    #[must_use]
    pub fn new(
        execution_id: impl Into<String>,
        task_id: impl Into<String>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            task_id: task_id.into(),
            start_time,
            stages: BTreeMap::new(),
        }
    }

    /// Record a stage detection. A repeated detection replaces the earlier one.
    pub fn record(&mut self, stage: impl Into<String>, record: StageRecord) {
        self.stages.insert(stage.into(), record);
    }

    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    #[must_use]
    pub const fn stages(&self) -> &BTreeMap<String, StageRecord> {
        &self.stages
    }

    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageRecord> {
        self.stages.get(name)
    }

    #[must_use]
    pub fn has_stage(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    /// Canonical stages (in order) this execution never reached.
    #[must_use]
    pub fn missing_stages<'a>(&self, canonical: &[&'a str]) -> Vec<&'a str> {
        canonical
            .iter()
            .copied()
            .filter(|name| !self.has_stage(name))
            .collect()
    }

    /// Number of canonical stages present.
    #[must_use]
    pub fn present_count(&self, canonical: &[&str]) -> usize {
        canonical.iter().filter(|name| self.has_stage(name)).count()
    }

    /// Whether every canonical stage was reached.
    #[must_use]
    pub fn is_fully_traversed(&self, canonical: &[&str]) -> bool {
        self.present_count(canonical) == canonical.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CANONICAL: [&str; 3] = ["a", "b", "c"];

    fn record(hour: u32, line: usize) -> StageRecord {
        StageRecord {
            detected: true,
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap(),
            evidence_line: format!("line {line}"),
            source_file: "agent.log".into(),
            line_number: line,
        }
    }

    #[test]
    fn repeated_detection_overwrites() {
        let mut timeline = ExecutionTimeline::new("e", "t", record(1, 1).timestamp);
        timeline.record("a", record(1, 1));
        timeline.record("a", record(3, 9));
        assert_eq!(timeline.stage("a").unwrap().line_number, 9);
        assert_eq!(timeline.stages().len(), 1);
    }

    #[test]
    fn missing_stages_follow_canonical_order() {
        let mut timeline = ExecutionTimeline::new("e", "t", record(1, 1).timestamp);
        timeline.record("b", record(1, 1));
        assert_eq!(timeline.missing_stages(&CANONICAL), vec!["a", "c"]);
        assert_eq!(timeline.present_count(&CANONICAL), 1);
        assert!(!timeline.is_fully_traversed(&CANONICAL));
    }
}
