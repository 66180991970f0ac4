//! The escrow program client trait.
//!
//! Escrow accounts are derived from the challenge id on the program side,
//! so every call carries the id. Implementations submit transactions to the
//! chain; tests use the nullable client.

use arena_types::{ChallengeId, EscrowRef, PlayerAddress, StakeAmount};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A payout instruction for a decisive outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SettlementInstruction {
    pub challenge_id: ChallengeId,
    pub escrow_ref: EscrowRef,
    pub winner: PlayerAddress,
    pub amount: StakeAmount,
}

/// Confirmation of a submitted settlement or refund transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub txn: String,
}

/// Errors surfaced by the escrow program client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The program rejected the instruction.
    #[error("instruction rejected: {0}")]
    Rejected(String),

    /// The transaction never reached the program.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Interface to the escrow program.
///
/// Object-safe so the executor can hold `Arc<dyn SettlementClient>`;
/// methods return boxed futures for the same reason.
pub trait SettlementClient: Send + Sync {
    /// Pay the prize pool to the winner.
    fn settle(
        &self,
        instruction: SettlementInstruction,
    ) -> BoxFuture<'_, Result<SettlementReceipt, ClientError>>;

    /// Return a locked stake to its owner (funding timeout or cancelled
    /// tournament seat).
    fn refund(
        &self,
        challenge_id: ChallengeId,
        recipient: PlayerAddress,
    ) -> BoxFuture<'_, Result<SettlementReceipt, ClientError>>;
}
