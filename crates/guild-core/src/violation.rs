use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::enums::{Category, Severity};
use crate::errors::CoreError;

/// One compliance or quality finding.
///
/// Fields are private: a violation is built once through [`Violation::new`]
/// (or [`Violation::parse`]) and the consuming `with_*` methods, then only read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Violation {
    severity: Severity,
    category: Category,
    kind: String,
    title: String,
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    suggested_fix: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
    created_at: DateTime<Utc>,
}

impl Violation {
    #[must_use]
    pub fn new(
        severity: Severity,
        category: Category,
        kind: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            kind: kind.into(),
            title: title.into(),
            description: description.into(),
            location: None,
            suggested_fix: None,
            metadata: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Build a violation from a severity string.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidSeverity` if `severity` is not one of
    /// critical, high, medium or low.
    pub fn parse(
        severity: &str,
        category: Category,
        kind: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let severity = severity.parse::<Severity>()?;
        Ok(Self::new(severity, category, kind, title, description))
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_suggested_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Override the creation time (replayed or cached findings).
    #[must_use]
    pub const fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    #[must_use]
    pub fn suggested_fix(&self) -> Option<&str> {
        self.suggested_fix.as_deref()
    }

    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
