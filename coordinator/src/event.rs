//! Events published by the coordinator.

use arena_types::{ChallengeId, Outcome, PlayerAddress};
use serde::{Deserialize, Serialize};

/// A challenge lifecycle or settlement event, as published to WebSocket
/// subscribers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChallengeEvent {
    Created {
        id: ChallengeId,
        creator: PlayerAddress,
    },
    JoinIntent {
        id: ChallengeId,
        joiner: PlayerAddress,
    },
    ParticipantJoined {
        id: ChallengeId,
        player: PlayerAddress,
    },
    CreatorFunded {
        id: ChallengeId,
    },
    Activated {
        id: ChallengeId,
    },
    ResultSubmitted {
        id: ChallengeId,
        player: PlayerAddress,
    },
    Completed {
        id: ChallengeId,
        outcome: Outcome,
    },
    Disputed {
        id: ChallengeId,
        reason: String,
    },
    DisputeResolved {
        id: ChallengeId,
        outcome: Outcome,
    },
    RevertedToOpen {
        id: ChallengeId,
        reason: String,
    },
    Cancelled {
        id: ChallengeId,
        reason: String,
    },
    SettlementSubmitted {
        id: ChallengeId,
        txn: String,
    },
    SettlementFailed {
        id: ChallengeId,
        reason: String,
    },
}

impl ChallengeEvent {
    pub fn challenge_id(&self) -> &ChallengeId {
        match self {
            ChallengeEvent::Created { id, .. }
            | ChallengeEvent::JoinIntent { id, .. }
            | ChallengeEvent::ParticipantJoined { id, .. }
            | ChallengeEvent::CreatorFunded { id }
            | ChallengeEvent::Activated { id }
            | ChallengeEvent::ResultSubmitted { id, .. }
            | ChallengeEvent::Completed { id, .. }
            | ChallengeEvent::Disputed { id, .. }
            | ChallengeEvent::DisputeResolved { id, .. }
            | ChallengeEvent::RevertedToOpen { id, .. }
            | ChallengeEvent::Cancelled { id, .. }
            | ChallengeEvent::SettlementSubmitted { id, .. }
            | ChallengeEvent::SettlementFailed { id, .. } => id,
        }
    }

    /// Whether this event concerns settlement rather than the lifecycle.
    pub fn is_settlement(&self) -> bool {
        matches!(
            self,
            ChallengeEvent::SettlementSubmitted { .. } | ChallengeEvent::SettlementFailed { .. }
        )
    }
}
