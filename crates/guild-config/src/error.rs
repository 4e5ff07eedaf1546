//! Errors raised while loading or validating Guild configuration.

/// Why a configuration could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A provider could not be read or the merged values do not fit the schema.
    #[error("failed to load configuration: {0}")]
    Figment(#[from] figment::Error),

    /// A scalar field is outside its accepted range.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// A canonical stage definition cannot be used for classification.
    #[error("invalid flow stage '{stage}': {reason}")]
    InvalidStage { stage: String, reason: String },
}
