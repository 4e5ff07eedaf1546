//! Flow reconstruction configuration.
//!
//! Defines where process logs live, how far back to look, and the five
//! canonical stages (with their detection patterns and age budgets) that every
//! execution is expected to traverse in order.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Number of canonical stages an execution traverses.
pub const CANONICAL_STAGE_COUNT: usize = 5;

fn default_log_dir() -> PathBuf {
    PathBuf::from(".guild").join("logs")
}

fn default_file_glob() -> String {
    "*.log".to_string()
}

const fn default_window_hours() -> u64 {
    24
}

const fn default_scan_timeout_secs() -> u64 {
    30
}

/// How stage age budgets are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Every recorded stage older than its budget is flagged.
    #[default]
    EveryStage,
    /// Only the furthest-along stage of an execution that has not reached the
    /// final stage is flagged.
    Frontier,
}

/// One canonical stage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StageConfig {
    pub name: String,
    /// Regex patterns (matched case-insensitively). Any match classifies the line.
    pub patterns: Vec<String>,
    /// Maximum allowed age of the stage's last detection, in seconds.
    pub max_age_secs: u64,
}

impl StageConfig {
    fn new(name: &str, patterns: &[&str], max_age_secs: u64) -> Self {
        Self {
            name: name.to_string(),
            patterns: patterns.iter().map(ToString::to_string).collect(),
            max_age_secs,
        }
    }
}

fn default_stages() -> Vec<StageConfig> {
    vec![
        StageConfig::new(
            "intake",
            &[
                r"\btask (received|assigned|created)\b",
                r"\bintake\b",
            ],
            3_600,
        ),
        StageConfig::new(
            "planning",
            &[r"\bplan(ning)? (started|created|approved)\b", r"\bplanning\b"],
            14_400,
        ),
        StageConfig::new(
            "implementation",
            &[
                r"\bimplementation (started|in progress)\b",
                r"\bimplementing\b",
                r"\bcoding started\b",
            ],
            86_400,
        ),
        StageConfig::new(
            "review",
            &[
                r"\breview (requested|started|approved)\b",
                r"\bcode review\b",
            ],
            28_800,
        ),
        StageConfig::new(
            "completion",
            &[
                r"\btask (completed|closed|done)\b",
                r"\bcompletion\b",
                r"\bmerged\b",
            ],
            7_200,
        ),
    ]
}

fn default_bypass_patterns() -> Vec<String> {
    [
        r"--no-verify",
        r"\bskip(ped|ping)? (review|tests|checks|hooks)\b",
        r"\bbypass(ed|ing)?\b",
        r"\bforce[- ]push(ed)?\b",
        r"\boverrid(e|den|ing) (gate|check|review)\b",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlowConfig {
    /// Directory scanned for process logs.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// File name glob a log source must match.
    #[serde(default = "default_file_glob")]
    pub file_glob: String,

    /// Files last modified more than this many hours ago are skipped.
    #[serde(default = "default_window_hours")]
    pub window_hours: u64,

    /// Upper bound on one reconstruction run before the auditor gives up.
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,

    #[serde(default)]
    pub timeout_policy: TimeoutPolicy,

    /// Canonical stages, in their required order.
    #[serde(default = "default_stages")]
    pub stages: Vec<StageConfig>,

    /// Patterns marking a deliberately skipped stage or gate.
    #[serde(default = "default_bypass_patterns")]
    pub bypass_patterns: Vec<String>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            file_glob: default_file_glob(),
            window_hours: default_window_hours(),
            scan_timeout_secs: default_scan_timeout_secs(),
            timeout_policy: TimeoutPolicy::default(),
            stages: default_stages(),
            bypass_patterns: default_bypass_patterns(),
        }
    }
}

impl FlowConfig {
    /// Canonical stage names in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_define_five_ordered_stages() {
        let config = FlowConfig::default();
        assert_eq!(config.stages.len(), CANONICAL_STAGE_COUNT);
        assert_eq!(
            config.stage_names(),
            vec!["intake", "planning", "implementation", "review", "completion"]
        );
        assert!(config.stages.iter().all(|s| !s.patterns.is_empty()));
    }

    #[test]
    fn defaults_are_correct() {
        let config = FlowConfig::default();
        assert_eq!(config.file_glob, "*.log");
        assert_eq!(config.window_hours, 24);
        assert_eq!(config.scan_timeout_secs, 30);
        assert_eq!(config.timeout_policy, TimeoutPolicy::EveryStage);
        assert!(!config.bypass_patterns.is_empty());
    }
}
