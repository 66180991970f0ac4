//! Fundamental types for the ARENA challenge coordinator.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: identities, amounts, timestamps, the challenge record, the
//! tournament bracket structures, and coordinator parameters.

pub mod address;
pub mod amount;
pub mod challenge;
pub mod id;
pub mod params;
pub mod state;
pub mod time;
pub mod tournament;

pub use address::PlayerAddress;
pub use amount::StakeAmount;
pub use challenge::{Challenge, EscrowRef, ResultEntry};
pub use id::ChallengeId;
pub use params::CoordinatorParams;
pub use state::{ChallengeStatus, MatchStatus, Outcome, TournamentStage};
pub use time::Timestamp;
pub use tournament::{BracketMatch, MatchId, Round, Tournament};
