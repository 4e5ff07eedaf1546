//! Log source selection.
//!
//! The staleness unit is the file, not the line: a file whose modification
//! time falls before the trace window is skipped wholesale, and every line of
//! a surviving file is classified regardless of the timestamp it carries.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use globset::{Glob, GlobMatcher};

use crate::error::FlowError;

/// A log file selected for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSource {
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
}

/// Compile the file-name glob.
///
/// # Errors
///
/// Returns `FlowError::InvalidGlob` if `pattern` is not a valid glob.
pub fn compile_glob(pattern: &str) -> Result<GlobMatcher, FlowError> {
    Ok(Glob::new(pattern)?.compile_matcher())
}

/// List files directly under `dir` whose name matches `matcher` and whose
/// modification time is not older than `window_start`.
///
/// Files modified after the reference clock (clock skew) are kept. Entries
/// whose metadata cannot be read are skipped. Results are sorted by path so
/// that reconstruction is deterministic.
///
/// # Errors
///
/// Returns `FlowError::LogDirMissing` if `dir` does not exist and
/// `FlowError::LogDirUnreadable` if it cannot be listed.
pub fn select_sources(
    dir: &Path,
    matcher: &GlobMatcher,
    window_start: DateTime<Utc>,
) -> Result<Vec<LogSource>, FlowError> {
    if !dir.is_dir() {
        return Err(FlowError::LogDirMissing(dir.to_path_buf()));
    }
    let entries = fs::read_dir(dir).map_err(|source| FlowError::LogDirUnreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut sources = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name() else {
            continue;
        };
        if !matcher.is_match(name) {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "skipping log source without metadata");
                continue;
            }
        };
        let modified: DateTime<Utc> = match metadata.modified() {
            Ok(time) => time.into(),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "skipping log source without mtime");
                continue;
            }
        };
        if modified < window_start {
            tracing::debug!(path = %path.display(), %modified, "log source outside trace window");
            continue;
        }
        sources.push(LogSource { path, modified });
    }
    sources.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(sources)
}
