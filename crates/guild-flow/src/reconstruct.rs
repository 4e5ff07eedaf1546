//! Timeline reconstruction and violation derivation.
//!
//! One run reads every selected source, classifies each line, groups stage
//! matches by execution id and then derives violations in a single post-pass:
//! missing stages, wrong order, stage timeouts and bypasses.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, TimeDelta, Utc};
use globset::GlobMatcher;
use guild_config::{FlowConfig, TimeoutPolicy};
use guild_core::target::{PARAM_TASK_ID, PARAM_WINDOW_HOURS};
use guild_core::{Category, Severity, Target, Violation};
use serde::Serialize;

use crate::classify::{ExecutionRef, LineClassifier};
use crate::error::FlowError;
use crate::metrics::ComplianceMetrics;
use crate::sources::{compile_glob, select_sources};
use crate::timeline::{ExecutionTimeline, StageRecord};

/// Execution id used for bypasses that resolve to no execution.
pub const UNKNOWN_EXECUTION: &str = "unknown";

/// Violation kinds emitted by the reconstructor.
pub mod kinds {
    pub const INCOMPLETE_FLOW: &str = "incomplete_flow";
    pub const WRONG_ORDER: &str = "wrong_order";
    pub const STAGE_TIMEOUT: &str = "stage_timeout";
    pub const PROCESS_BYPASS: &str = "process_bypass";
    pub const NO_EXECUTIONS: &str = "no_executions";
}

/// More missing stages than this escalates an incomplete flow to critical.
const CRITICAL_MISSING_STAGES: usize = 2;

/// What to reconstruct: where, how far back, and optionally which task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRequest {
    pub log_dir: PathBuf,
    pub window: TimeDelta,
    pub task_id: Option<String>,
}

impl TraceRequest {
    /// Resolve a request from configuration, letting the target override the
    /// log directory, window and task filter.
    #[must_use]
    pub fn from_target(config: &FlowConfig, target: &Target) -> Self {
        let hours = target
            .param_u64(PARAM_WINDOW_HOURS)
            .unwrap_or(config.window_hours);
        Self {
            log_dir: target.path().unwrap_or_else(|| config.log_dir.clone()),
            window: i64::try_from(hours)
                .ok()
                .and_then(TimeDelta::try_hours)
                .unwrap_or(TimeDelta::MAX),
            task_id: target.param_str(PARAM_TASK_ID).map(ToString::to_string),
        }
    }
}

/// A log line flagged as a deliberate stage or gate bypass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BypassEvent {
    pub execution_id: String,
    /// `None` when the line carries no recognizable timestamp.
    pub timestamp: Option<DateTime<Utc>>,
    pub line: String,
    pub source_file: String,
    pub line_number: usize,
}

/// One named chunk of log text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogText {
    pub name: String,
    pub content: String,
}

impl LogText {
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Output of one reconstruction run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowReport {
    pub timelines: BTreeMap<String, ExecutionTimeline>,
    pub bypasses: Vec<BypassEvent>,
    pub violations: Vec<Violation>,
    pub metrics: ComplianceMetrics,
    pub files_scanned: usize,
    pub lines_classified: usize,
}

/// Rebuilds per-execution stage timelines from free-text logs.
#[derive(Debug, Clone)]
pub struct FlowReconstructor {
    config: FlowConfig,
    classifier: LineClassifier,
    glob: GlobMatcher,
}

impl FlowReconstructor {
    /// Compile `config` into a reconstructor.
    ///
    /// # Errors
    ///
    /// Returns `FlowError` if the stage list is empty, a stage is unnamed or
    /// duplicated, or a pattern or glob does not compile.
    pub fn new(config: FlowConfig) -> Result<Self, FlowError> {
        if config.stages.is_empty() {
            return Err(FlowError::InvalidConfig("no canonical stages".into()));
        }
        let mut seen = std::collections::BTreeSet::new();
        for stage in &config.stages {
            if stage.name.is_empty() {
                return Err(FlowError::InvalidConfig("stage without a name".into()));
            }
            if !seen.insert(stage.name.as_str()) {
                return Err(FlowError::InvalidConfig(format!(
                    "duplicate stage '{}'",
                    stage.name
                )));
            }
        }
        let classifier = LineClassifier::new(&config)?;
        let glob = compile_glob(&config.file_glob)?;
        Ok(Self {
            config,
            classifier,
            glob,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Reconstruct from the log directory as of now.
    ///
    /// # Errors
    ///
    /// See [`reconstruct_at`](Self::reconstruct_at).
    pub fn reconstruct(&self, request: &TraceRequest) -> Result<FlowReport, FlowError> {
        self.reconstruct_at(request, Utc::now())
    }

    /// Reconstruct from the log directory against an explicit clock.
    ///
    /// Unreadable files are skipped; non-UTF-8 bytes are replaced.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::LogDirMissing` / `LogDirUnreadable` when the
    /// directory itself is unusable.
    pub fn reconstruct_at(
        &self,
        request: &TraceRequest,
        now: DateTime<Utc>,
    ) -> Result<FlowReport, FlowError> {
        let window_start = now
            .checked_sub_signed(request.window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let sources = select_sources(&request.log_dir, &self.glob, window_start)?;
        let texts: Vec<LogText> = sources
            .into_iter()
            .filter_map(|source| match fs::read(&source.path) {
                Ok(bytes) => Some(LogText::new(
                    source.path.display().to_string(),
                    String::from_utf8_lossy(&bytes).into_owned(),
                )),
                Err(e) => {
                    tracing::debug!(path = %source.path.display(), error = %e, "skipping unreadable log source");
                    None
                }
            })
            .collect();
        tracing::debug!(dir = %request.log_dir.display(), files = texts.len(), "log sources selected");
        Ok(self.analyze(&texts, now, request.task_id.as_deref()))
    }

    /// Reconstruct from already-loaded log text.
    ///
    /// Texts are processed in the given order; the first stage match seen for
    /// an execution fixes its start time and task id.
    #[must_use]
    pub fn analyze(
        &self,
        texts: &[LogText],
        now: DateTime<Utc>,
        task_filter: Option<&str>,
    ) -> FlowReport {
        let canonical = self.config.stage_names();
        let mut timelines: BTreeMap<String, ExecutionTimeline> = BTreeMap::new();
        let mut pending: Vec<(Option<ExecutionRef>, BypassEvent)> = Vec::new();
        let mut lines_classified = 0;

        for text in texts {
            for (idx, line) in text.content.lines().enumerate() {
                let Some(class) = self.classifier.classify(line, now) else {
                    continue;
                };
                lines_classified += 1;

                if let (Some(stage_idx), Some(timestamp), Some(execution)) =
                    (class.stage, class.timestamp, class.execution.as_ref())
                {
                    let timeline = timelines
                        .entry(execution.id().to_string())
                        .or_insert_with(|| {
                            ExecutionTimeline::new(execution.id(), execution.task_id(), timestamp)
                        });
                    timeline.record(
                        canonical[stage_idx],
                        StageRecord {
                            detected: true,
                            timestamp,
                            evidence_line: line.trim().to_string(),
                            source_file: text.name.clone(),
                            line_number: idx + 1,
                        },
                    );
                }

                if class.bypass {
                    pending.push((
                        class.execution,
                        BypassEvent {
                            execution_id: UNKNOWN_EXECUTION.to_string(),
                            timestamp: class.timestamp,
                            line: line.trim().to_string(),
                            source_file: text.name.clone(),
                            line_number: idx + 1,
                        },
                    ));
                }
            }
        }

        // Attribution waits until every source is grouped: a synthesized id
        // only resolves if some stage line opened that execution.
        let mut bypasses: Vec<BypassEvent> = pending
            .into_iter()
            .map(|(execution, mut event)| {
                if let Some(id) = resolve_bypass(execution.as_ref(), &timelines) {
                    event.execution_id = id.to_string();
                }
                event
            })
            .collect();

        if let Some(task) = task_filter {
            timelines.retain(|_, t| t.task_id() == task);
            bypasses.retain(|b| {
                b.execution_id == UNKNOWN_EXECUTION || timelines.contains_key(&b.execution_id)
            });
        }

        if timelines.is_empty() {
            return FlowReport {
                timelines,
                bypasses: Vec::new(),
                violations: vec![no_executions_violation(texts.len(), task_filter)],
                metrics: ComplianceMetrics::default(),
                files_scanned: texts.len(),
                lines_classified,
            };
        }

        let mut violations = Vec::new();
        for timeline in timelines.values() {
            violations.extend(missing_stage_violation(timeline, &canonical));
            violations.extend(order_violations(timeline, &canonical));
            violations.extend(self.timeout_violations(timeline, &canonical, now));
        }
        violations.extend(bypasses.iter().map(bypass_violation));

        let metrics = ComplianceMetrics::compute(timelines.values(), &canonical, bypasses.len());
        tracing::debug!(
            executions = metrics.total_executions,
            bypasses = metrics.bypass_count,
            score = metrics.compliance_score,
            "flow reconstructed"
        );

        FlowReport {
            timelines,
            bypasses,
            violations,
            metrics,
            files_scanned: texts.len(),
            lines_classified,
        }
    }

    fn timeout_violations(
        &self,
        timeline: &ExecutionTimeline,
        canonical: &[&str],
        now: DateTime<Utc>,
    ) -> Vec<Violation> {
        let last = canonical.len() - 1;
        let checked: Vec<usize> = match self.config.timeout_policy {
            TimeoutPolicy::EveryStage => (0..canonical.len())
                .filter(|&i| timeline.has_stage(canonical[i]))
                .collect(),
            TimeoutPolicy::Frontier => (0..canonical.len())
                .rev()
                .find(|&i| timeline.has_stage(canonical[i]))
                .filter(|&i| i != last)
                .into_iter()
                .collect(),
        };

        checked
            .into_iter()
            .filter_map(|i| {
                let stage = &self.config.stages[i];
                let record = timeline.stage(&stage.name)?;
                let budget = i64::try_from(stage.max_age_secs)
                    .ok()
                    .and_then(TimeDelta::try_seconds)
                    .unwrap_or(TimeDelta::MAX);
                let age = now.signed_duration_since(record.timestamp);
                (age > budget).then(|| {
                    Violation::new(
                        Severity::Medium,
                        Category::Process,
                        kinds::STAGE_TIMEOUT,
                        format!("Stage '{}' timed out", stage.name),
                        format!(
                            "Execution {} has been in stage '{}' for {}s (budget {}s) with no further progress",
                            timeline.execution_id,
                            stage.name,
                            age.num_seconds(),
                            stage.max_age_secs
                        ),
                    )
                    .with_location(location(record))
                    .with_metadata("execution_id", timeline.execution_id.as_str())
                    .with_metadata("stage", stage.name.as_str())
                    .with_metadata("age_secs", age.num_seconds())
                    .with_suggested_fix(format!(
                        "Advance or close execution {} past '{}'",
                        timeline.execution_id, stage.name
                    ))
                })
            })
            .collect()
    }
}

/// Execution a bypass line belongs to: an explicit marker always resolves, a
/// synthesized id only when that execution was reconstructed.
fn resolve_bypass<'a>(
    execution: Option<&'a ExecutionRef>,
    timelines: &BTreeMap<String, ExecutionTimeline>,
) -> Option<&'a str> {
    match execution? {
        ExecutionRef::Explicit { id, .. } => Some(id.as_str()),
        ExecutionRef::Synthesized(id) => timelines.contains_key(id).then_some(id.as_str()),
    }
}

fn location(record: &StageRecord) -> String {
    format!("{}:{}", record.source_file, record.line_number)
}

fn missing_stage_violation(timeline: &ExecutionTimeline, canonical: &[&str]) -> Option<Violation> {
    let missing = timeline.missing_stages(canonical);
    if missing.is_empty() {
        return None;
    }
    let severity = if missing.len() > CRITICAL_MISSING_STAGES {
        Severity::Critical
    } else {
        Severity::High
    };
    Some(
        Violation::new(
            severity,
            Category::Process,
            kinds::INCOMPLETE_FLOW,
            format!("Incomplete flow for {}", timeline.execution_id),
            format!(
                "Execution {} (task {}) is missing {} of {} stages: {}",
                timeline.execution_id,
                timeline.task_id(),
                missing.len(),
                canonical.len(),
                missing.join(", ")
            ),
        )
        .with_metadata("execution_id", timeline.execution_id.as_str())
        .with_metadata("task_id", timeline.task_id())
        .with_metadata("missing_stages", missing.clone())
        .with_suggested_fix(format!("Run the missing stages: {}", missing.join(", "))),
    )
}

fn order_violations(timeline: &ExecutionTimeline, canonical: &[&str]) -> Vec<Violation> {
    let present: Vec<(&str, &StageRecord)> = canonical
        .iter()
        .filter_map(|name| timeline.stage(name).map(|record| (*name, record)))
        .collect();
    if present.len() < 2 {
        return Vec::new();
    }

    let mut violations = Vec::new();
    for (i, (earlier, earlier_rec)) in present.iter().enumerate() {
        for (later, later_rec) in &present[i + 1..] {
            if later_rec.timestamp < earlier_rec.timestamp {
                violations.push(
                    Violation::new(
                        Severity::Medium,
                        Category::Process,
                        kinds::WRONG_ORDER,
                        format!("Stage '{later}' ran before '{earlier}'"),
                        format!(
                            "Execution {}: '{later}' at {} precedes '{earlier}' at {}",
                            timeline.execution_id,
                            later_rec.timestamp.to_rfc3339(),
                            earlier_rec.timestamp.to_rfc3339()
                        ),
                    )
                    .with_location(location(later_rec))
                    .with_metadata("execution_id", timeline.execution_id.as_str())
                    .with_metadata("earlier_stage", *earlier)
                    .with_metadata("later_stage", *later),
                );
            }
        }
    }
    violations
}

fn bypass_violation(event: &BypassEvent) -> Violation {
    let violation = Violation::new(
        Severity::Critical,
        Category::Integrity,
        kinds::PROCESS_BYPASS,
        format!("Process bypass in execution {}", event.execution_id),
        format!("Bypass marker found: {}", event.line),
    )
    .with_location(format!("{}:{}", event.source_file, event.line_number))
    .with_metadata("execution_id", event.execution_id.as_str())
    .with_suggested_fix("Re-run the skipped stage or gate and record its outcome");
    match event.timestamp {
        Some(ts) => violation.with_metadata("timestamp", ts.to_rfc3339()),
        None => violation,
    }
}

fn no_executions_violation(files_scanned: usize, task_filter: Option<&str>) -> Violation {
    let scope = task_filter.map_or_else(String::new, |task| format!(" for task {task}"));
    Violation::new(
        Severity::High,
        Category::Process,
        kinds::NO_EXECUTIONS,
        "No executions detected",
        format!("No stage activity found{scope} in {files_scanned} log source(s) inside the trace window"),
    )
    .with_metadata("files_scanned", files_scanned)
    .with_suggested_fix("Check the log directory, file glob and trace window")
}
