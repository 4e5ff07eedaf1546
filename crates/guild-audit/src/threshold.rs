//! Threshold alerting as a decorator over any auditor.

use futures::FutureExt;
use futures::future::BoxFuture;
use guild_core::{AuditResult, Category, Severity, Target, Violation};

use crate::auditor::Auditor;
use crate::error::AuditError;

/// Violation kind of the alert added by [`ThresholdAuditor`].
pub const THRESHOLD_EXCEEDED: &str = "threshold_exceeded";

/// Adds an alert when the wrapped auditor reports more than `limit`
/// violations at or above `severity`.
#[derive(Debug, Clone)]
pub struct ThresholdAuditor<A> {
    inner: A,
    severity: Severity,
    limit: usize,
    alert_category: Category,
}

impl<A: Auditor> ThresholdAuditor<A> {
    #[must_use]
    pub const fn new(inner: A, severity: Severity, limit: usize) -> Self {
        Self {
            inner,
            severity,
            limit,
            alert_category: Category::Process,
        }
    }

    /// Category the alert violation is filed under (default: process).
    #[must_use]
    pub const fn with_alert_category(mut self, category: Category) -> Self {
        self.alert_category = category;
        self
    }

    #[must_use]
    pub const fn inner(&self) -> &A {
        &self.inner
    }

    fn alert(&self, auditor: &str, count: usize) -> Violation {
        Violation::new(
            Severity::High,
            self.alert_category,
            THRESHOLD_EXCEEDED,
            format!("{auditor} exceeded its {} threshold", self.severity),
            format!(
                "{count} violation(s) at or above {} (limit {})",
                self.severity, self.limit
            ),
        )
        .with_metadata("count", count)
        .with_metadata("limit", self.limit)
        .with_metadata("severity", self.severity.as_str())
    }
}

impl<A: Auditor> Auditor for ThresholdAuditor<A> {
    fn audit<'a>(&'a self, target: &'a Target) -> BoxFuture<'a, Result<AuditResult, AuditError>> {
        async move {
            let mut result = self.inner.audit(target).await?;
            let count = result.count_at_least(self.severity);
            let exceeded = count > self.limit;
            if exceeded {
                tracing::info!(auditor = result.auditor_name(), count, limit = self.limit, "threshold exceeded");
                let alert = self.alert(result.auditor_name(), count);
                result.push_violation(alert);
            }
            result.set_metric(THRESHOLD_EXCEEDED, exceeded);
            Ok(result)
        }
        .boxed()
    }

    fn scope(&self) -> String {
        format!(
            "{} (alerts above {} {} violation(s))",
            self.inner.scope(),
            self.limit,
            self.severity
        )
    }
}
