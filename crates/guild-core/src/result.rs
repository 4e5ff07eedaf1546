use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::enums::Severity;
use crate::violation::Violation;

/// Everything one auditor reported for one target.
///
/// Metric keys are unique: setting an existing key replaces its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AuditResult {
    auditor_name: String,
    violations: Vec<Violation>,
    #[serde(default)]
    metrics: BTreeMap<String, Value>,
    created_at: DateTime<Utc>,
}

impl AuditResult {
    #[must_use]
    pub fn new(auditor_name: impl Into<String>) -> Self {
        Self {
            auditor_name: auditor_name.into(),
            violations: Vec::new(),
            metrics: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn push_violation(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub fn extend_violations(&mut self, violations: impl IntoIterator<Item = Violation>) {
        self.violations.extend(violations);
    }

    /// Record a metric. Last write wins.
    pub fn set_metric(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metrics.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn with_violation(mut self, violation: Violation) -> Self {
        self.push_violation(violation);
        self
    }

    #[must_use]
    pub fn with_metric(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_metric(key, value);
        self
    }

    #[must_use]
    pub fn auditor_name(&self) -> &str {
        &self.auditor_name
    }

    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    #[must_use]
    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    #[must_use]
    pub const fn metrics(&self) -> &BTreeMap<String, Value> {
        &self.metrics
    }

    #[must_use]
    pub fn metric(&self, key: &str) -> Option<&Value> {
        self.metrics.get(key)
    }

    #[must_use]
    pub fn metric_f64(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).and_then(Value::as_f64)
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Number of violations at or above `severity`.
    #[must_use]
    pub fn count_at_least(&self, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity() >= severity)
            .count()
    }
}
