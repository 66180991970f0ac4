//! Challenge, match and tournament state enums.

use crate::PlayerAddress;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle state of a challenge.
///
/// Allowed transitions are enforced by the lifecycle engine; the enum itself
/// only carries the state and cheap predicates over it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    /// Open for joiners; no funding handshake in flight.
    PendingWaitingForOpponent,
    /// A joiner expressed intent; the creator must fund within the window.
    CreatorConfirmationRequired,
    /// Creator escrow is locked; the joiner must fund within the window.
    CreatorFunded,
    /// Both sides funded; gameplay under way, results accepted.
    Active,
    /// Terminal: a decisive outcome was reached.
    Completed,
    /// Terminal for automation: conflicting claims, operator must resolve.
    Disputed,
    /// Terminal: abandoned before activation, nothing to settle.
    Cancelled,
}

impl ChallengeStatus {
    /// Whether the challenge is open for a new joiner.
    pub fn is_open(&self) -> bool {
        matches!(self, ChallengeStatus::PendingWaitingForOpponent)
    }

    /// Whether a funding handshake is in flight.
    pub fn is_funding(&self) -> bool {
        matches!(
            self,
            ChallengeStatus::CreatorConfirmationRequired | ChallengeStatus::CreatorFunded
        )
    }

    /// Whether results may be submitted.
    pub fn accepts_results(&self) -> bool {
        matches!(self, ChallengeStatus::Active)
    }

    /// Whether the challenge has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChallengeStatus::Completed | ChallengeStatus::Disputed | ChallengeStatus::Cancelled
        )
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChallengeStatus::PendingWaitingForOpponent => "pending_waiting_for_opponent",
            ChallengeStatus::CreatorConfirmationRequired => "creator_confirmation_required",
            ChallengeStatus::CreatorFunded => "creator_funded",
            ChallengeStatus::Active => "active",
            ChallengeStatus::Completed => "completed",
            ChallengeStatus::Disputed => "disputed",
            ChallengeStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// The outcome of a completed challenge or bracket match.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// A specific participant won and is owed the prize.
    Player(PlayerAddress),
    /// Every participant claimed a loss (or nobody showed); stakes are
    /// forfeited to the platform, no prize instruction is issued.
    Forfeit,
    /// The deadline passed with no decisive claims; stakes are returned.
    Tie,
}

impl Outcome {
    /// The winning address, if the outcome is decisive.
    pub fn winner(&self) -> Option<&PlayerAddress> {
        match self {
            Outcome::Player(addr) => Some(addr),
            Outcome::Forfeit | Outcome::Tie => None,
        }
    }

    pub fn is_decisive(&self) -> bool {
        matches!(self, Outcome::Player(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Player(addr) => write!(f, "winner:{addr}"),
            Outcome::Forfeit => write!(f, "forfeit"),
            Outcome::Tie => write!(f, "tie"),
        }
    }
}

/// Where a tournament bracket stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStage {
    /// Waiting for the bracket to fill.
    Registration,
    /// A round is in play; `round` is the zero-based index.
    InProgress { round: u32 },
    /// A champion (or terminal non-result) was produced.
    Concluded,
}

/// The state of a single bracket match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Waiting on a feeder match for one or both slots.
    AwaitingPlayers,
    /// Both slots filled, results accepted.
    InPlay,
    /// A winner was recorded and advanced.
    Decided,
}
