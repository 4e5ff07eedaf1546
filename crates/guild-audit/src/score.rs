//! Violation list to health score.

use std::collections::BTreeMap;

use guild_core::{Category, Evaluation, Violation};
use serde::{Deserialize, Serialize};

const FULL_SCORE: f64 = 100.0;

/// Composite and per-category health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    /// Weighted blend of the category scores, 0-100.
    pub overall: f64,
    pub per_category: BTreeMap<Category, f64>,
    pub evaluation: Evaluation,
}

/// Turns violations into category scores and a weighted overall score.
///
/// Every category starts at 100 and loses each violation's severity penalty,
/// floored at 0. The overall score is normalized by the sum of weights.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreAggregator {
    weights: BTreeMap<Category, f64>,
}

impl Default for ScoreAggregator {
    fn default() -> Self {
        Self {
            weights: Category::ALL.iter().map(|c| (*c, c.weight())).collect(),
        }
    }
}

impl ScoreAggregator {
    /// Override the weight of one category. Negative weights are clamped to 0.
    #[must_use]
    pub fn with_weight(mut self, category: Category, weight: f64) -> Self {
        self.weights.insert(category, weight.max(0.0));
        self
    }

    #[must_use]
    pub fn weight(&self, category: Category) -> f64 {
        self.weights.get(&category).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.weights.values().sum()
    }

    #[must_use]
    pub fn aggregate(&self, violations: &[Violation]) -> HealthScore {
        let mut penalties: BTreeMap<Category, f64> =
            Category::ALL.iter().map(|c| (*c, 0.0)).collect();
        for violation in violations {
            *penalties.entry(violation.category()).or_default() += violation.severity().penalty();
        }

        let per_category: BTreeMap<Category, f64> = penalties
            .into_iter()
            .map(|(category, penalty)| (category, (FULL_SCORE - penalty).max(0.0)))
            .collect();

        let total_weight = self.total_weight();
        let overall = if total_weight > 0.0 {
            per_category
                .iter()
                .map(|(category, score)| self.weight(*category) * score)
                .sum::<f64>()
                / total_weight
        } else {
            FULL_SCORE
        };

        HealthScore {
            overall,
            evaluation: Evaluation::from_score(overall),
            per_category,
        }
    }
}
