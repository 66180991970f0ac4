//! Settlement execution for completed challenges.
//!
//! The executor turns a decisive outcome into exactly one payout call
//! against the escrow program. The `payout_triggered` flag on the challenge
//! record is the at-most-once guard: it is claimed under a conditional
//! write before any external call is made and never cleared, so a crash or
//! a concurrent executor can only ever skip, never double-pay.

pub mod client;
pub mod error;
pub mod executor;
pub mod journal;

pub use client::{ClientError, SettlementClient, SettlementInstruction, SettlementReceipt};
pub use error::SettlementError;
pub use executor::{SettlementExecutor, SettlementStatus};
pub use journal::JournalSettlementClient;
