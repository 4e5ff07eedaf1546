//! Recommendations derived from a scored run.

use guild_core::{Category, Severity, Violation};

use crate::score::HealthScore;

/// Category scores below this get a recommendation.
pub const RECOMMENDATION_THRESHOLD: f64 = 70.0;

const fn category_advice(category: Category) -> &'static str {
    match category {
        Category::Integrity => {
            "Restore integrity: remove placeholder and mock implementations and stop bypassing verification gates"
        }
        Category::Process => {
            "Follow the canonical process: run every stage in order and close out stalled executions"
        }
        Category::Quality => {
            "Raise code quality: resolve TODO markers, naming violations and missing tests"
        }
        Category::Collaboration => {
            "Improve collaboration: request reviews and record decisions where the team can see them"
        }
    }
}

/// Build the recommendation list for one run.
///
/// A critical-count recommendation comes first when any critical violation is
/// present, followed by one fixed recommendation per category scoring below
/// [`RECOMMENDATION_THRESHOLD`], in category order.
#[must_use]
pub fn recommend(score: &HealthScore, violations: &[Violation]) -> Vec<String> {
    let mut out = Vec::new();

    let critical = violations
        .iter()
        .filter(|v| v.severity() == Severity::Critical)
        .count();
    if critical > 0 {
        out.push(format!(
            "Address {critical} critical violation(s) immediately before further work"
        ));
    }

    out.extend(
        score
            .per_category
            .iter()
            .filter(|(_, value)| **value < RECOMMENDATION_THRESHOLD)
            .map(|(category, _)| category_advice(*category).to_string()),
    );
    out
}
