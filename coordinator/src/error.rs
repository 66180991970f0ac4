use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] arena_lifecycle::LifecycleError),

    #[error("store error: {0}")]
    Store(#[from] arena_store::StoreError),

    #[error("settlement error: {0}")]
    Settlement(#[from] arena_settlement::SettlementError),

    /// The record changed under us on every retry; the caller should
    /// re-read and resubmit.
    #[error("state for {0} is stale, retry the operation")]
    StaleState(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
