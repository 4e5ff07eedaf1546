//! # guild-flow
//!
//! Rebuilds per-execution process timelines from free-text logs and flags
//! process-compliance violations.
//!
//! Log sources are heterogeneous, append-only text files with no shared schema
//! and no guaranteed ordering on disk. A reconstruction run:
//! 1. Selects files in the log directory whose name matches the glob and whose
//!    modification time falls inside the trace window
//! 2. Classifies every line: timestamp, execution id, at most one canonical
//!    stage, and an independent bypass flag
//! 3. Groups stage matches into one [`ExecutionTimeline`] per execution
//! 4. Derives missing-stage, wrong-order, timeout and bypass violations
//! 5. Computes [`ComplianceMetrics`]

pub mod classify;
mod error;
pub mod metrics;
pub mod reconstruct;
pub mod sources;
pub mod timeline;
pub mod timestamp;

pub use error::FlowError;
pub use metrics::{COMPLETION_THRESHOLD, ComplianceMetrics};
pub use reconstruct::{
    BypassEvent, FlowReconstructor, FlowReport, LogText, TraceRequest, UNKNOWN_EXECUTION, kinds,
};
pub use timeline::{ExecutionTimeline, StageRecord};
