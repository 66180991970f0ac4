//! The challenge record.
//!
//! `Challenge` is the single unit of coordination state: every lifecycle
//! operation reads one record, applies a pure transition, and writes it back
//! under optimistic concurrency. Settlement bookkeeping (`needs_payout`,
//! `payout_triggered`, `settlement_txn`) lives on the same record so a
//! conditional write can atomically claim a payout.

use crate::{
    ChallengeId, ChallengeStatus, CoordinatorParams, Outcome, PlayerAddress, StakeAmount,
    Timestamp, Tournament,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque reference to an on-chain escrow account.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EscrowRef(String);

impl EscrowRef {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EscrowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single result claim submitted by a participant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    /// Whether the submitter claims to have won.
    pub claimed_win: bool,
    pub submitted_at: Timestamp,
    /// Optional evidence blob (screenshot hash, replay reference).
    pub proof: Option<Vec<u8>>,
}

/// The full state of one challenge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub status: ChallengeStatus,
    pub creator: PlayerAddress,
    /// The confirmed opponent in a head-to-head challenge. Set when the
    /// creator funds against a pending joiner.
    pub challenger: Option<PlayerAddress>,
    /// A joiner who has expressed intent but is not yet confirmed.
    pub pending_joiner: Option<PlayerAddress>,
    /// Everyone who has fully funded, creator included.
    pub participants: Vec<PlayerAddress>,
    pub stake_amount: StakeAmount,
    /// Net pool owed to the winner, fixed at activation.
    pub prize_pool: StakeAmount,
    /// Creator must fund by this time while confirmation is required.
    pub creator_funding_deadline: Option<Timestamp>,
    /// Joiner must fund by this time after the creator locks escrow.
    pub joiner_funding_deadline: Option<Timestamp>,
    /// An open challenge with no joiner is cancelled past this time.
    pub expires_at: Option<Timestamp>,
    /// Results must arrive by this time once active.
    pub result_deadline: Option<Timestamp>,
    /// Result claims keyed by submitter.
    pub results: BTreeMap<PlayerAddress, ResultEntry>,
    pub outcome: Option<Outcome>,
    /// Winner may claim; set on decisive completion.
    pub can_claim: bool,
    /// A payout is owed and not yet triggered.
    pub needs_payout: bool,
    /// Exactly-once guard: set under a conditional write before any external
    /// settlement call is made, and never cleared.
    pub payout_triggered: bool,
    pub escrow_ref: Option<EscrowRef>,
    /// Transaction reference of a confirmed settlement.
    pub settlement_txn: Option<String>,
    /// Last settlement failure, for operator inspection.
    pub settlement_error: Option<String>,
    /// Operator who resolved a dispute, when the outcome was overridden.
    pub resolved_by: Option<String>,
    /// Total seats including the creator; 2 for head-to-head.
    pub max_players: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Bracket state for tournament challenges (`max_players > 2`).
    pub tournament: Option<Tournament>,
}

impl Challenge {
    /// Create a fresh open challenge.
    pub fn open(
        id: ChallengeId,
        creator: PlayerAddress,
        stake_amount: StakeAmount,
        max_players: u32,
        now: Timestamp,
        params: &CoordinatorParams,
    ) -> Self {
        let tournament = (max_players > 2).then(Tournament::registration);
        Self {
            id,
            status: ChallengeStatus::PendingWaitingForOpponent,
            creator,
            challenger: None,
            pending_joiner: None,
            participants: Vec::new(),
            stake_amount,
            prize_pool: StakeAmount::ZERO,
            creator_funding_deadline: None,
            joiner_funding_deadline: None,
            expires_at: Some(now.plus_secs(params.open_expiration_secs)),
            result_deadline: None,
            results: BTreeMap::new(),
            outcome: None,
            can_claim: false,
            needs_payout: false,
            payout_triggered: false,
            escrow_ref: None,
            settlement_txn: None,
            settlement_error: None,
            resolved_by: None,
            max_players,
            created_at: now,
            updated_at: now,
            tournament,
        }
    }

    pub fn is_tournament(&self) -> bool {
        self.max_players > 2
    }

    pub fn is_participant(&self, addr: &PlayerAddress) -> bool {
        self.participants.contains(addr)
    }

    /// The head-to-head opponent of `addr`, if the challenge has exactly two
    /// funded participants.
    pub fn opponent_of(&self, addr: &PlayerAddress) -> Option<&PlayerAddress> {
        if self.participants.len() != 2 {
            return None;
        }
        self.participants.iter().find(|p| *p != addr)
    }

    /// Whether the settlement executor should pick this record up.
    pub fn settlement_due(&self) -> bool {
        self.needs_payout && !self.payout_triggered
    }

    /// The earliest armed deadline, used by the timeout sweeper to decide
    /// whether this record needs attention.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        match self.status {
            ChallengeStatus::PendingWaitingForOpponent => self.expires_at,
            ChallengeStatus::CreatorConfirmationRequired => self.creator_funding_deadline,
            ChallengeStatus::CreatorFunded => self.joiner_funding_deadline,
            ChallengeStatus::Active => self.result_deadline,
            _ => None,
        }
    }
}
