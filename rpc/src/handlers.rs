//! RPC request and response types.

use arena_store::Versioned;
use arena_types::{Challenge, Outcome, Tournament};
use serde::{Deserialize, Serialize};

// ── Challenge ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateChallengeRequest {
    pub creator: String,
    pub stake_amount: u64,
    #[serde(default = "default_max_players")]
    pub max_players: u32,
}

fn default_max_players() -> u32 {
    2
}

#[derive(Deserialize)]
pub struct JoinRequest {
    pub player: String,
}

#[derive(Deserialize)]
pub struct FundRequest {
    pub player: String,
    /// Escrow account reference; required when the creator funds.
    #[serde(default)]
    pub escrow_ref: Option<String>,
}

#[derive(Deserialize)]
pub struct SubmitResultRequest {
    pub player: String,
    pub claimed_win: bool,
    /// Optional hex-encoded evidence blob.
    #[serde(default)]
    pub proof: Option<String>,
}

#[derive(Deserialize)]
pub struct ResolveDisputeRequest {
    pub operator: String,
    /// Winning address for a decisive resolution.
    #[serde(default)]
    pub winner: Option<String>,
    /// "forfeit" or "tie" when no winner is named.
    #[serde(default)]
    pub disposition: Option<String>,
}

#[derive(Deserialize)]
pub struct ReplaySettlementRequest {
    pub operator: String,
}

#[derive(Serialize)]
pub struct SettlementStatusResponse {
    pub submitted: bool,
    pub txn: Option<String>,
    pub skipped_reason: Option<String>,
}

// ── Views ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub id: String,
    pub version: u64,
    pub status: String,
    pub creator: String,
    pub challenger: Option<String>,
    pub pending_joiner: Option<String>,
    pub participants: Vec<String>,
    pub stake_amount: u64,
    pub prize_pool: u64,
    pub max_players: u32,
    pub creator_funding_deadline: Option<u64>,
    pub joiner_funding_deadline: Option<u64>,
    pub expires_at: Option<u64>,
    pub result_deadline: Option<u64>,
    pub outcome: Option<OutcomeView>,
    pub can_claim: bool,
    pub needs_payout: bool,
    pub payout_triggered: bool,
    pub escrow_ref: Option<String>,
    pub settlement_txn: Option<String>,
    pub settlement_error: Option<String>,
    pub resolved_by: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
    pub tournament: Option<TournamentView>,
}

#[derive(Debug, Serialize)]
pub struct OutcomeView {
    pub kind: String,
    pub winner: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TournamentView {
    pub stage: String,
    pub champion: Option<String>,
    pub rounds: Vec<Vec<MatchView>>,
}

#[derive(Debug, Serialize)]
pub struct MatchView {
    pub round: u32,
    pub index: u32,
    pub player1: Option<String>,
    pub player2: Option<String>,
    pub status: String,
    pub winner: Option<String>,
}

#[derive(Serialize)]
pub struct ChallengeListResponse {
    pub challenges: Vec<ChallengeResponse>,
}

#[derive(Serialize)]
pub struct TelemetryResponse {
    pub challenge_count: u64,
    pub version: String,
}

impl ChallengeResponse {
    pub fn from_versioned(versioned: &Versioned<Challenge>) -> Self {
        let c = &versioned.record;
        Self {
            id: c.id.to_string(),
            version: versioned.version,
            status: c.status.to_string(),
            creator: c.creator.to_string(),
            challenger: c.challenger.as_ref().map(ToString::to_string),
            pending_joiner: c.pending_joiner.as_ref().map(ToString::to_string),
            participants: c.participants.iter().map(ToString::to_string).collect(),
            stake_amount: c.stake_amount.raw(),
            prize_pool: c.prize_pool.raw(),
            max_players: c.max_players,
            creator_funding_deadline: c.creator_funding_deadline.map(|t| t.as_secs()),
            joiner_funding_deadline: c.joiner_funding_deadline.map(|t| t.as_secs()),
            expires_at: c.expires_at.map(|t| t.as_secs()),
            result_deadline: c.result_deadline.map(|t| t.as_secs()),
            outcome: c.outcome.as_ref().map(outcome_view),
            can_claim: c.can_claim,
            needs_payout: c.needs_payout,
            payout_triggered: c.payout_triggered,
            escrow_ref: c.escrow_ref.as_ref().map(ToString::to_string),
            settlement_txn: c.settlement_txn.clone(),
            settlement_error: c.settlement_error.clone(),
            resolved_by: c.resolved_by.clone(),
            created_at: c.created_at.as_secs(),
            updated_at: c.updated_at.as_secs(),
            tournament: c.tournament.as_ref().map(tournament_view),
        }
    }
}

fn outcome_view(outcome: &Outcome) -> OutcomeView {
    match outcome {
        Outcome::Player(winner) => OutcomeView {
            kind: "winner".to_string(),
            winner: Some(winner.to_string()),
        },
        Outcome::Forfeit => OutcomeView {
            kind: "forfeit".to_string(),
            winner: None,
        },
        Outcome::Tie => OutcomeView {
            kind: "tie".to_string(),
            winner: None,
        },
    }
}

fn tournament_view(tournament: &Tournament) -> TournamentView {
    let stage = match tournament.stage {
        arena_types::TournamentStage::Registration => "registration".to_string(),
        arena_types::TournamentStage::InProgress { round } => format!("round_{round}"),
        arena_types::TournamentStage::Concluded => "concluded".to_string(),
    };
    let rounds = tournament
        .rounds
        .iter()
        .map(|round| {
            round
                .matches
                .iter()
                .map(|m| MatchView {
                    round: m.id.round,
                    index: m.id.index,
                    player1: m.player1.as_ref().map(ToString::to_string),
                    player2: m.player2.as_ref().map(ToString::to_string),
                    status: match m.status {
                        arena_types::MatchStatus::AwaitingPlayers => "awaiting_players",
                        arena_types::MatchStatus::InPlay => "in_play",
                        arena_types::MatchStatus::Decided => "decided",
                    }
                    .to_string(),
                    winner: m
                        .outcome
                        .as_ref()
                        .and_then(|o| o.winner())
                        .map(ToString::to_string),
                })
                .collect()
        })
        .collect();
    TournamentView {
        stage,
        champion: tournament.champion.as_ref().map(ToString::to_string),
        rounds,
    }
}
