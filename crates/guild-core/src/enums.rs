//! Severity, category, target kind and evaluation enums for Guild.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.
//! String parsing is case-insensitive so log- or user-supplied values such as
//! `"CRITICAL"` resolve to the same variant as `"critical"`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Severity of a violation.
///
/// Variants are declared lowest first so that the derived `Ord` places
/// `Critical` above everything else.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities, most severe first.
    pub const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    /// Score penalty applied to a category for one violation of this severity.
    #[must_use]
    pub const fn penalty(self) -> f64 {
        match self {
            Self::Critical => 50.0,
            Self::High => 20.0,
            Self::Medium => 5.0,
            Self::Low => 1.0,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(CoreError::InvalidSeverity(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Scoring category a violation counts against.
///
/// Each category carries a fixed weight in the overall health score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Integrity,
    Process,
    Quality,
    Collaboration,
}

impl Category {
    /// All categories in weight order.
    pub const ALL: [Self; 4] = [
        Self::Integrity,
        Self::Process,
        Self::Quality,
        Self::Collaboration,
    ];

    /// Weight of this category in the overall blend.
    #[must_use]
    pub const fn weight(self) -> f64 {
        match self {
            Self::Integrity => 40.0,
            Self::Process => 25.0,
            Self::Quality => 20.0,
            Self::Collaboration => 15.0,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integrity => "integrity",
            Self::Process => "process",
            Self::Quality => "quality",
            Self::Collaboration => "collaboration",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "integrity" => Ok(Self::Integrity),
            "process" => Ok(Self::Process),
            "quality" => Ok(Self::Quality),
            "collaboration" => Ok(Self::Collaboration),
            _ => Err(CoreError::InvalidCategory(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// TargetKind
// ---------------------------------------------------------------------------

/// What a [`Target`](crate::Target) describes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Codebase,
    FileSet,
    ProcessLogs,
    #[default]
    Empty,
}

impl TargetKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Codebase => "codebase",
            Self::FileSet => "file_set",
            Self::ProcessLogs => "process_logs",
            Self::Empty => "empty",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Qualitative label for an overall health score.
///
/// ```text
/// >= 90 excellent | >= 75 good | >= 60 fair | >= 40 poor | else critical
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl Evaluation {
    /// Bucket a 0-100 score into its band.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::Excellent
        } else if score >= 75.0 {
            Self::Good
        } else if score >= 60.0 {
            Self::Fair
        } else if score >= 40.0 {
            Self::Poor
        } else {
            Self::Critical
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("critical", Severity::Critical)]
    #[case("CRITICAL", Severity::Critical)]
    #[case(" High ", Severity::High)]
    #[case("medium", Severity::Medium)]
    #[case("Low", Severity::Low)]
    fn severity_parses_case_insensitively(#[case] input: &str, #[case] expected: Severity) {
        assert_eq!(input.parse::<Severity>().unwrap(), expected);
    }

    #[test]
    fn unknown_severity_is_rejected() {
        let err = "blocker".parse::<Severity>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidSeverity(ref s) if s == "blocker"));
    }

    #[test]
    fn severity_orders_critical_highest() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn category_weights_sum_to_hundred() {
        let total: f64 = Category::ALL.iter().map(|c| c.weight()).sum();
        assert!((total - 100.0).abs() < f64::EPSILON);
    }

    #[rstest]
    #[case(100.0, Evaluation::Excellent)]
    #[case(90.0, Evaluation::Excellent)]
    #[case(89.99, Evaluation::Good)]
    #[case(75.0, Evaluation::Good)]
    #[case(60.0, Evaluation::Fair)]
    #[case(40.0, Evaluation::Poor)]
    #[case(39.9, Evaluation::Critical)]
    #[case(0.0, Evaluation::Critical)]
    fn evaluation_bands(#[case] score: f64, #[case] expected: Evaluation) {
        assert_eq!(Evaluation::from_score(score), expected);
    }

    #[test]
    fn enums_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&TargetKind::ProcessLogs).unwrap(),
            "\"process_logs\""
        );
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
    }
}
