//! Events emitted by the lifecycle engine for the coordinator to process.

use arena_types::{EscrowRef, MatchId, Outcome, PlayerAddress};

/// What happened during a lifecycle operation.
///
/// The engine only mutates the record; anything with an external side effect
/// (escrow refunds, settlement scheduling, notifications) is surfaced here
/// for the coordinator to carry out.
#[derive(Clone, Debug, PartialEq)]
pub enum LifecycleEvent {
    /// A joiner expressed intent; the creator's funding window is armed.
    JoinIntentExpressed { joiner: PlayerAddress },
    /// A tournament seat was taken and funded.
    ParticipantJoined { player: PlayerAddress },
    /// Creator escrow locked; the joiner's funding window is armed.
    CreatorFunded,
    /// All sides funded; gameplay is under way.
    Activated,
    /// A result claim was accepted.
    ResultRecorded {
        player: PlayerAddress,
        claimed_win: bool,
    },
    /// The challenge reached a decisive or forfeit/tie outcome.
    Completed { outcome: Outcome },
    /// Conflicting claims; an operator must resolve.
    Disputed { reason: String },
    /// An operator resolved a dispute.
    DisputeResolved {
        outcome: Outcome,
        operator: String,
    },
    /// A funding handshake timed out; the challenge is open again.
    RevertedToOpen { reason: &'static str },
    /// The challenge was abandoned before activation.
    Cancelled { reason: &'static str },
    /// The creator's escrow must be returned (joiner funding timeout).
    RefundCreator {
        escrow_ref: EscrowRef,
        creator: PlayerAddress,
    },
    /// Funded tournament seats must be returned (bracket never filled).
    RefundParticipants { participants: Vec<PlayerAddress> },
    /// A bracket match was decided and the winner advanced.
    MatchDecided {
        match_id: MatchId,
        winner: PlayerAddress,
    },
    /// A bracket round completed and the next round is in play.
    RoundAdvanced { round: u32 },
    /// The bracket produced a champion.
    ChampionCrowned { champion: PlayerAddress },
}
