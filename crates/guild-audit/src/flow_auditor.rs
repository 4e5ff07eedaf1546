//! Process-flow compliance as an auditor.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use guild_config::FlowConfig;
use guild_core::{AuditResult, Category, Severity, Target, Violation};
use guild_flow::{FlowError, FlowReconstructor, FlowReport, TraceRequest};
use serde_json::json;

use crate::auditor::Auditor;
use crate::error::AuditError;

/// Name reported on results produced by [`FlowAuditor`].
pub const FLOW_AUDITOR_NAME: &str = "flow";

/// Violation kind when the log scan exceeds its time budget.
pub const SCAN_TIMEOUT: &str = "scan_timeout";

/// Violation kind when the log directory does not exist.
pub const LOG_DIR_MISSING: &str = "log_dir_missing";

/// Runs a [`FlowReconstructor`] against the target's log window.
///
/// The scan runs on the blocking pool under `scan_timeout`. A scan that
/// overruns is reported as a HIGH violation; the blocking thread is left to
/// finish on its own.
#[derive(Debug, Clone)]
pub struct FlowAuditor {
    reconstructor: Arc<FlowReconstructor>,
    scan_timeout: Duration,
}

impl FlowAuditor {
    /// # Errors
    ///
    /// Returns `FlowError` if the stage, bypass or glob configuration is invalid.
    pub fn new(config: FlowConfig) -> Result<Self, FlowError> {
        let scan_timeout = Duration::from_secs(config.scan_timeout_secs);
        Ok(Self {
            reconstructor: Arc::new(FlowReconstructor::new(config)?),
            scan_timeout,
        })
    }

    #[must_use]
    pub const fn with_scan_timeout(mut self, scan_timeout: Duration) -> Self {
        self.scan_timeout = scan_timeout;
        self
    }

    #[must_use]
    pub const fn scan_timeout(&self) -> Duration {
        self.scan_timeout
    }
}

impl Auditor for FlowAuditor {
    fn audit<'a>(&'a self, target: &'a Target) -> BoxFuture<'a, Result<AuditResult, AuditError>> {
        async move {
            let request = TraceRequest::from_target(self.reconstructor.config(), target);
            let log_dir = request.log_dir.clone();
            let flow = Arc::clone(&self.reconstructor);

            let mut result = AuditResult::new(FLOW_AUDITOR_NAME);
            match run_bounded(self.scan_timeout, move || flow.reconstruct(&request)).await? {
                None => {
                    tracing::warn!(dir = %log_dir.display(), timeout = ?self.scan_timeout, "flow scan timed out");
                    result.push_violation(scan_timeout_violation(&log_dir, self.scan_timeout));
                    result.set_metric("timed_out", true);
                }
                Some(Ok(report)) => record_report(&mut result, report),
                Some(Err(FlowError::LogDirMissing(path))) => {
                    result.push_violation(missing_dir_violation(&path));
                    result.set_metric("files_scanned", 0);
                }
                Some(Err(e)) => return Err(e.into()),
            }
            Ok(result)
        }
        .boxed()
    }

    fn scope(&self) -> String {
        format!(
            "process-flow compliance across {} canonical stages",
            self.reconstructor.config().stages.len()
        )
    }
}

/// Run `work` on the blocking pool, giving up after `limit`.
///
/// Returns `Ok(None)` on timeout.
async fn run_bounded<T, F>(limit: Duration, work: F) -> Result<Option<T>, AuditError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(work)).await {
        Ok(joined) => Ok(Some(joined?)),
        Err(_) => Ok(None),
    }
}

fn record_report(result: &mut AuditResult, report: FlowReport) {
    let metrics = &report.metrics;
    result.set_metric("total_executions", metrics.total_executions);
    result.set_metric("complete_executions", metrics.complete_executions);
    result.set_metric("bypass_count", metrics.bypass_count);
    result.set_metric("compliance_score", metrics.compliance_score);
    result.set_metric("per_stage_compliance_rate", json!(metrics.per_stage_compliance_rate));
    result.set_metric("execution_completeness", json!(metrics.execution_completeness));
    result.set_metric("files_scanned", report.files_scanned);
    result.set_metric("lines_classified", report.lines_classified);
    result.extend_violations(report.violations);
}

fn scan_timeout_violation(dir: &Path, limit: Duration) -> Violation {
    Violation::new(
        Severity::High,
        Category::Process,
        SCAN_TIMEOUT,
        "Flow log scan timed out",
        format!(
            "Reconstructing flows from {} did not finish within {}s",
            dir.display(),
            limit.as_secs_f64()
        ),
    )
    .with_location(dir.display().to_string())
    .with_metadata("timeout_secs", limit.as_secs_f64())
    .with_suggested_fix("Narrow the trace window or raise flow.scan_timeout_secs")
}

fn missing_dir_violation(dir: &Path) -> Violation {
    Violation::new(
        Severity::High,
        Category::Process,
        LOG_DIR_MISSING,
        "Process log directory not found",
        format!("No process logs at {}", dir.display()),
    )
    .with_location(dir.display().to_string())
    .with_suggested_fix("Point flow.log_dir (or the target path) at the execution logs")
}
