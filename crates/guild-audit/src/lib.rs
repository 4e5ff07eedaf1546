//! # guild-audit
//!
//! Runs pluggable auditors concurrently and folds their findings into one
//! scored, recommended and recorded [`CompositeResult`].
//!
//! - [`Auditor`]: the one capability every auditor implements
//! - [`Orchestrator`]: registry, fan-out/fan-in and bounded run history
//! - [`ScoreAggregator`]: violations to weighted category and overall scores
//! - [`ThresholdAuditor`] and [`CachedAuditor`]: decorators composable over
//!   any auditor
//! - [`FlowAuditor`]: process-flow compliance from execution logs
//!
//! # Usage
//!
//! ```no_run
//! use guild_audit::{FlowAuditor, Orchestrator};
//! use guild_config::GuildConfig;
//! use guild_core::Target;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = GuildConfig::default();
//! let mut orchestrator = Orchestrator::from_config(&config.orchestrator);
//! orchestrator.register_auditor("flow", FlowAuditor::new(config.flow)?);
//!
//! let composite = orchestrator
//!     .run_comprehensive_audit(Target::process_logs(None, Some(24), None))
//!     .await;
//! println!("{} ({:.1})", composite.evaluation, composite.guild_health_score.overall);
//! # Ok(())
//! # }
//! ```

mod auditor;
mod cached;
mod composite;
mod error;
mod flow_auditor;
mod history;
mod orchestrator;
mod recommendations;
mod score;
mod threshold;

pub use auditor::Auditor;
pub use cached::CachedAuditor;
pub use composite::{CompositeResult, FailedAudit, IndividualResult, RunStatistics};
pub use error::AuditError;
pub use flow_auditor::{FLOW_AUDITOR_NAME, FlowAuditor, LOG_DIR_MISSING, SCAN_TIMEOUT};
pub use history::RunHistory;
pub use orchestrator::Orchestrator;
pub use recommendations::{RECOMMENDATION_THRESHOLD, recommend};
pub use score::{HealthScore, ScoreAggregator};
pub use threshold::{THRESHOLD_EXCEEDED, ThresholdAuditor};
