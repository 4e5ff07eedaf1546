use guild_cache::CacheError;
use guild_core::CoreError;
use guild_flow::FlowError;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit failed: {0}")]
    Failed(String),

    #[error("auditor task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
