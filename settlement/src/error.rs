use arena_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettlementError {
    /// The record does not support a payout: the flag was never set and no
    /// external call was made.
    #[error("settlement precheck failed for {id}: {reason}")]
    PrecheckFailed { id: String, reason: String },

    /// The external call was made and failed; `payout_triggered` stays set
    /// and an operator must replay or investigate.
    #[error("settlement call failed for {id}: {reason}")]
    CallFailed { id: String, reason: String },

    #[error("settlement call for {id} timed out after {secs}s")]
    Timeout { id: String, secs: u64 },

    #[error("replay requires a triggered, unsettled payout for {0}")]
    ReplayNotEligible(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
