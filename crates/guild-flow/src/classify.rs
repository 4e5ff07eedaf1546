//! Per-line classification.
//!
//! A line is reduced to a [`LineClass`]: its timestamp, the execution it
//! belongs to, at most one canonical stage and an independent bypass flag.
//! A line may be both a stage match and a bypass match. Stage matches need a
//! timestamp; bypass matches do not.

use chrono::{DateTime, Utc};
use guild_config::{FlowConfig, StageConfig};
use regex::{Regex, RegexBuilder, RegexSet, RegexSetBuilder};

use crate::error::FlowError;
use crate::timestamp::TimestampExtractor;

/// Explicit execution id markers, in priority order.
const ID_MARKERS: [&str; 3] = ["task_id", "execution-id", "flow_id"];

/// Marker whose value also names the task an execution belongs to.
const TASK_MARKER: &str = "task_id";

/// Where a line's execution id came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionRef {
    /// An explicit marker such as `task_id: T-42`.
    Explicit { id: String, task_id: Option<String> },
    /// No marker; id derived from the hour bucket of the timestamp.
    Synthesized(String),
}

impl ExecutionRef {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Explicit { id, .. } | Self::Synthesized(id) => id,
        }
    }

    /// Task id carried by the line, falling back to the execution id.
    #[must_use]
    pub fn task_id(&self) -> &str {
        match self {
            Self::Explicit {
                task_id: Some(task),
                ..
            } => task,
            _ => self.id(),
        }
    }

    #[must_use]
    pub const fn is_explicit(&self) -> bool {
        matches!(self, Self::Explicit { .. })
    }
}

/// Classification of one usable line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineClass {
    pub timestamp: Option<DateTime<Utc>>,
    /// `None` only for an untimestamped line without an id marker.
    pub execution: Option<ExecutionRef>,
    /// Index into the canonical stage list. Always `None` without a timestamp.
    pub stage: Option<usize>,
    pub bypass: bool,
}

/// Compiled stage and bypass patterns.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    timestamps: TimestampExtractor,
    markers: Vec<(&'static str, Regex)>,
    stages: Vec<RegexSet>,
    bypass: RegexSet,
}

impl LineClassifier {
    /// Compile the patterns in `config`.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidPattern` naming the stage (or `bypass`) whose
    /// pattern does not compile.
    pub fn new(config: &FlowConfig) -> Result<Self, FlowError> {
        let markers = ID_MARKERS
            .iter()
            .map(|marker| {
                let pattern = format!(r"(?i)\b{}\s*[:=]\s*([A-Za-z0-9][A-Za-z0-9._-]*)", regex::escape(marker));
                Regex::new(&pattern)
                    .map(|re| (*marker, re))
                    .map_err(|source| FlowError::InvalidPattern {
                        owner: format!("marker {marker}"),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let stages = config
            .stages
            .iter()
            .map(compile_stage)
            .collect::<Result<Vec<_>, _>>()?;

        let bypass = RegexSetBuilder::new(&config.bypass_patterns)
            .case_insensitive(true)
            .build()
            .map_err(|source| FlowError::InvalidPattern {
                owner: "bypass".to_string(),
                source,
            })?;

        Ok(Self {
            timestamps: TimestampExtractor::new()?,
            markers,
            stages,
            bypass,
        })
    }

    /// Classify `line`.
    ///
    /// Yields `None` for a line with neither a recognizable timestamp nor a
    /// bypass marker.
    #[must_use]
    pub fn classify(&self, line: &str, reference: DateTime<Utc>) -> Option<LineClass> {
        let timestamp = self.timestamps.extract(line, reference);
        let bypass = self.bypass.is_match(line);
        if timestamp.is_none() && !bypass {
            return None;
        }
        let execution = self.execution_ref(line).or_else(|| {
            timestamp.map(|ts| ExecutionRef::Synthesized(format!("exec-{}", ts.format("%Y%m%d%H"))))
        });
        let stage = timestamp.and_then(|_| self.stages.iter().position(|set| set.is_match(line)));
        Some(LineClass {
            timestamp,
            execution,
            stage,
            bypass,
        })
    }

    fn execution_ref(&self, line: &str) -> Option<ExecutionRef> {
        let capture = |re: &Regex| re.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str().to_string());
        let task_id = self
            .markers
            .iter()
            .find(|(marker, _)| *marker == TASK_MARKER)
            .and_then(|(_, re)| capture(re));
        self.markers
            .iter()
            .find_map(|(_, re)| capture(re))
            .map(|id| ExecutionRef::Explicit { id, task_id })
    }
}

fn compile_stage(stage: &StageConfig) -> Result<RegexSet, FlowError> {
    // Validate each pattern on its own so the error names the culprit.
    for pattern in &stage.patterns {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| FlowError::InvalidPattern {
                owner: format!("stage '{}'", stage.name),
                source,
            })?;
    }
    RegexSetBuilder::new(&stage.patterns)
        .case_insensitive(true)
        .build()
        .map_err(|source| FlowError::InvalidPattern {
            owner: format!("stage '{}'", stage.name),
            source,
        })
}
