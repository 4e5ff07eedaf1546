//! # guild-core
//!
//! Core types and error types for Guild.
//!
//! This crate provides the immutable data carried between every other Guild crate:
//! - [`Target`]: opaque description of what is being audited
//! - [`Violation`]: one compliance/quality finding
//! - [`AuditResult`]: the violations and metrics one auditor produced
//! - Severity, category and evaluation enums
//! - Cross-cutting error types

pub mod enums;
pub mod errors;
pub mod result;
pub mod target;
pub mod violation;

pub use enums::{Category, Evaluation, Severity, TargetKind};
pub use errors::CoreError;
pub use result::AuditResult;
pub use target::Target;
pub use violation::Violation;
