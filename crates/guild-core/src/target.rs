//! Audit targets.
//!
//! A `Target` is an opaque, immutable request: a kind tag plus a sorted map of
//! parameters. Because the map is a `BTreeMap` (and `serde_json` objects are
//! sorted too), serializing a target always yields the same bytes for the same
//! logical content. The result cache keys on exactly that serialization.

use std::collections::BTreeMap;
use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::enums::TargetKind;
use crate::errors::CoreError;

/// Parameter key for a filesystem root or log directory.
pub const PARAM_PATH: &str = "path";
/// Parameter key for an explicit list of files.
pub const PARAM_FILES: &str = "files";
/// Parameter key for a trace window, in hours.
pub const PARAM_WINDOW_HOURS: &str = "window_hours";
/// Parameter key for a task id filter.
pub const PARAM_TASK_ID: &str = "task_id";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Target {
    kind: TargetKind,
    #[serde(default)]
    params: BTreeMap<String, Value>,
}

impl Target {
    #[must_use]
    pub const fn new(kind: TargetKind) -> Self {
        Self {
            kind,
            params: BTreeMap::new(),
        }
    }

    /// The degenerate target. Auditors decide how to respond to it.
    #[must_use]
    pub const fn empty() -> Self {
        Self::new(TargetKind::Empty)
    }

    /// A source tree rooted at `path`.
    #[must_use]
    pub fn codebase(path: impl Into<PathBuf>) -> Self {
        Self::new(TargetKind::Codebase).with_path(path)
    }

    /// An explicit list of files.
    #[must_use]
    pub fn file_set<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let files: Vec<Value> = files
            .into_iter()
            .map(|p| Value::String(p.into().to_string_lossy().into_owned()))
            .collect();
        Self::new(TargetKind::FileSet).with_param(PARAM_FILES, Value::Array(files))
    }

    /// A window of process-execution logs.
    ///
    /// `dir` overrides the configured log directory, `window_hours` the
    /// configured trace window and `task_id` restricts reconstruction to a
    /// single task.
    #[must_use]
    pub fn process_logs(
        dir: Option<PathBuf>,
        window_hours: Option<u64>,
        task_id: Option<&str>,
    ) -> Self {
        let mut target = Self::new(TargetKind::ProcessLogs);
        if let Some(dir) = dir {
            target = target.with_path(dir);
        }
        if let Some(hours) = window_hours {
            target = target.with_param(PARAM_WINDOW_HOURS, hours);
        }
        if let Some(task_id) = task_id {
            target = target.with_param(PARAM_TASK_ID, task_id);
        }
        target
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_path(self, path: impl Into<PathBuf>) -> Self {
        let path = path.into().to_string_lossy().into_owned();
        self.with_param(PARAM_PATH, path)
    }

    #[must_use]
    pub const fn kind(&self) -> TargetKind {
        self.kind
    }

    #[must_use]
    pub const fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.params.get(key).and_then(Value::as_u64)
    }

    /// The `path` parameter, if present and non-empty.
    #[must_use]
    pub fn path(&self) -> Option<PathBuf> {
        self.param_str(PARAM_PATH)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }

    /// Files listed in the `files` parameter. Non-string entries are ignored.
    #[must_use]
    pub fn files(&self) -> Vec<PathBuf> {
        self.params
            .get(PARAM_FILES)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether this target carries nothing to audit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kind == TargetKind::Empty || self.params.is_empty()
    }

    /// Deterministic serialization used for content addressing.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Serialization` if a parameter cannot be encoded.
    pub fn canonical_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn canonical_json_ignores_insertion_order() {
        let a = Target::new(TargetKind::Codebase)
            .with_param("b", 2)
            .with_param("a", 1);
        let b = Target::new(TargetKind::Codebase)
            .with_param("a", 1)
            .with_param("b", 2);
        assert_eq!(a.canonical_json().unwrap(), b.canonical_json().unwrap());
    }

    #[test]
    fn canonical_json_sorts_nested_objects() {
        let a = Target::codebase("/src").with_param("opts", serde_json::json!({"z": 1, "a": 2}));
        assert_eq!(
            a.canonical_json().unwrap(),
            r#"{"kind":"codebase","params":{"opts":{"a":2,"z":1},"path":"/src"}}"#
        );
    }

    #[test]
    fn process_logs_sets_only_given_params() {
        let target = Target::process_logs(None, Some(6), Some("T-42"));
        assert_eq!(target.kind(), TargetKind::ProcessLogs);
        assert_eq!(target.path(), None);
        assert_eq!(target.param_u64(PARAM_WINDOW_HOURS), Some(6));
        assert_eq!(target.param_str(PARAM_TASK_ID), Some("T-42"));
    }

    #[test]
    fn file_set_roundtrips_paths() {
        let target = Target::file_set(["a.rs", "b/c.rs"]);
        assert_eq!(
            target.files(),
            vec![PathBuf::from("a.rs"), PathBuf::from("b/c.rs")]
        );
    }

    #[test]
    fn empty_and_paramless_targets_are_degenerate() {
        assert!(Target::empty().is_empty());
        assert!(Target::new(TargetKind::Codebase).is_empty());
        assert!(!Target::codebase(".").is_empty());
    }

    #[test]
    fn blank_path_is_treated_as_absent() {
        assert_eq!(Target::codebase("").path(), None);
    }
}
