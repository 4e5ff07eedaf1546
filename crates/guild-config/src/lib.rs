//! # guild-config
//!
//! Layered configuration loading for Guild using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`GUILD_*` prefix, `__` as separator)
//! 2. Project-level `.guild/config.toml`
//! 3. User-level `~/.config/guild/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `GUILD_CACHE__TTL_SECS` -> `cache.ttl_secs`,
//! `GUILD_FLOW__LOG_DIR` -> `flow.log_dir`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use guild_config::GuildConfig;
//!
//! let config = GuildConfig::load_with_dotenv().expect("config");
//! println!("cache ttl: {}s", config.cache.ttl_secs);
//! ```

mod cache;
mod error;
mod flow;
mod orchestrator;

pub use cache::CacheConfig;
pub use error::ConfigError;
pub use flow::{CANONICAL_STAGE_COUNT, FlowConfig, StageConfig, TimeoutPolicy};
pub use orchestrator::OrchestratorConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GuildConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub flow: FlowConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl GuildConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or the result is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or the result is invalid.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Extract and validate a config from an arbitrary figment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or the result is invalid.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the figment provider chain.
    ///
    /// This is public so tests can inspect the figment directly or add
    /// additional providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".guild/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("GUILD_").split("__"))
    }

    /// Reject values that would make the components misbehave.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field, or
    /// `ConfigError::InvalidStage` for an unnamed, duplicated or patternless stage.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.ttl_secs == 0 {
            return Err(invalid("cache.ttl_secs", "must be greater than zero"));
        }
        if self.orchestrator.history_limit == 0 {
            return Err(invalid(
                "orchestrator.history_limit",
                "must be greater than zero",
            ));
        }
        if self.flow.stages.len() != CANONICAL_STAGE_COUNT {
            return Err(invalid(
                "flow.stages",
                &format!(
                    "expected {CANONICAL_STAGE_COUNT} canonical stages, found {}",
                    self.flow.stages.len()
                ),
            ));
        }
        let mut seen = std::collections::BTreeSet::new();
        for stage in &self.flow.stages {
            let reason = if stage.name.trim().is_empty() {
                Some("stage name is empty")
            } else if !seen.insert(stage.name.as_str()) {
                Some("stage name is used more than once")
            } else if stage.patterns.is_empty() {
                Some("no detection patterns")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(ConfigError::InvalidStage {
                    stage: stage.name.clone(),
                    reason: reason.to_string(),
                });
            }
        }
        if self.flow.window_hours == 0 {
            return Err(invalid("flow.window_hours", "must be greater than zero"));
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("guild").join("config.toml"))
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = GuildConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.ttl_secs, 86_400);
        assert_eq!(config.orchestrator.history_limit, 100);
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let mut config = GuildConfig::default();
        config.cache.ttl_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "cache.ttl_secs"));
    }

    #[test]
    fn stage_without_patterns_is_rejected() {
        let mut config = GuildConfig::default();
        config.flow.stages[2].patterns.clear();
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidStage { ref stage, .. } if stage == "implementation")
        );
    }

    #[test]
    fn duplicate_stage_name_is_rejected() {
        let mut config = GuildConfig::default();
        config.flow.stages[4].name = "review".into();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidStage { ref stage, ref reason }
            if stage == "review" && reason.contains("more than once")));
        assert_eq!(
            err.to_string(),
            "invalid flow stage 'review': stage name is used more than once"
        );
    }

    #[test]
    fn wrong_stage_count_is_rejected() {
        let mut config = GuildConfig::default();
        config.flow.stages.pop();
        assert!(config.validate().is_err());
    }
}
