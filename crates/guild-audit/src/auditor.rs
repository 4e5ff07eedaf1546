//! The auditor capability.

use futures::future::BoxFuture;
use guild_core::{AuditResult, Target};

use crate::error::AuditError;

/// One pluggable unit that inspects a [`Target`].
///
/// The orchestrator treats every auditor uniformly. An `Err` (or a panic) is
/// local to that invocation: it is recorded as a failed audit and never aborts
/// sibling auditors. Auditors that do unbounded work should bound it
/// themselves and report a violation instead of stalling the run.
///
/// Implementations box their future so the trait stays object-safe:
///
/// ```
/// use futures::FutureExt;
/// use futures::future::BoxFuture;
/// use guild_audit::{AuditError, Auditor};
/// use guild_core::{AuditResult, Target};
///
/// struct Noop;
///
/// impl Auditor for Noop {
///     fn audit<'a>(&'a self, _target: &'a Target) -> BoxFuture<'a, Result<AuditResult, AuditError>> {
///         async { Ok(AuditResult::new("noop")) }.boxed()
///     }
///
///     fn scope(&self) -> String {
///         "does nothing".into()
///     }
/// }
/// ```
pub trait Auditor: Send + Sync {
    fn audit<'a>(&'a self, target: &'a Target) -> BoxFuture<'a, Result<AuditResult, AuditError>>;

    /// Human-readable description of what this auditor inspects.
    fn scope(&self) -> String;
}
