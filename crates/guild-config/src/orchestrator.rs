//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

const fn default_history_limit() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// Maximum number of composite results kept in run history.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}
