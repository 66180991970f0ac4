//! Single-elimination tournament bracket structures.
//!
//! The bracket is a fixed shape derived from the participant count: `log2(N)`
//! rounds, halving each round. Structures here are plain data; all bracket
//! rules live in the lifecycle engine.

use crate::{MatchStatus, Outcome, PlayerAddress, ResultEntry, TournamentStage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a bracket match within a tournament: round index plus the
/// match's index within that round, both zero-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchId {
    pub round: u32,
    pub index: u32,
}

impl MatchId {
    pub fn new(round: u32, index: u32) -> Self {
        Self { round, index }
    }

    /// The match in the next round that this match's winner feeds.
    pub fn next(&self) -> MatchId {
        MatchId::new(self.round + 1, self.index / 2)
    }

    /// Whether this match's winner lands in the first slot of the next match.
    /// Even-indexed matches feed slot one, odd-indexed feed slot two.
    pub fn feeds_first_slot(&self) -> bool {
        self.index % 2 == 0
    }
}

/// A single bracket match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BracketMatch {
    pub id: MatchId,
    pub player1: Option<PlayerAddress>,
    pub player2: Option<PlayerAddress>,
    pub status: MatchStatus,
    /// Per-player result claims for this match, keyed by submitter.
    pub results: BTreeMap<PlayerAddress, ResultEntry>,
    pub outcome: Option<Outcome>,
}

impl BracketMatch {
    pub fn new(id: MatchId) -> Self {
        Self {
            id,
            player1: None,
            player2: None,
            status: MatchStatus::AwaitingPlayers,
            results: BTreeMap::new(),
            outcome: None,
        }
    }

    /// Both participants, in slot order, if both slots are filled.
    pub fn players(&self) -> Option<(&PlayerAddress, &PlayerAddress)> {
        match (&self.player1, &self.player2) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }

    pub fn involves(&self, addr: &PlayerAddress) -> bool {
        self.player1.as_ref() == Some(addr) || self.player2.as_ref() == Some(addr)
    }

    /// The slot opponent of `addr`, if both slots are filled.
    pub fn opponent_of(&self, addr: &PlayerAddress) -> Option<&PlayerAddress> {
        let (a, b) = self.players()?;
        if a == addr {
            Some(b)
        } else if b == addr {
            Some(a)
        } else {
            None
        }
    }
}

/// One round of the bracket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub matches: Vec<BracketMatch>,
}

impl Round {
    /// Whether every match in the round has been decided.
    pub fn is_complete(&self) -> bool {
        self.matches.iter().all(|m| m.status == MatchStatus::Decided)
    }
}

/// Bracket state carried inside a tournament challenge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub stage: TournamentStage,
    pub rounds: Vec<Round>,
    pub champion: Option<PlayerAddress>,
}

impl Tournament {
    /// An empty bracket awaiting registration.
    pub fn registration() -> Self {
        Self {
            stage: TournamentStage::Registration,
            rounds: Vec::new(),
            champion: None,
        }
    }

    pub fn round(&self, index: u32) -> Option<&Round> {
        self.rounds.get(index as usize)
    }

    pub fn round_mut(&mut self, index: u32) -> Option<&mut Round> {
        self.rounds.get_mut(index as usize)
    }

    pub fn match_at(&self, id: MatchId) -> Option<&BracketMatch> {
        self.round(id.round)?.matches.get(id.index as usize)
    }

    pub fn match_at_mut(&mut self, id: MatchId) -> Option<&mut BracketMatch> {
        self.round_mut(id.round)?.matches.get_mut(id.index as usize)
    }

    /// The index of the final round.
    pub fn final_round(&self) -> u32 {
        (self.rounds.len() as u32).saturating_sub(1)
    }
}
