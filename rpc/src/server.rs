//! Axum-based RPC server.

use crate::error::RpcError;
use crate::handlers::*;
use arena_coordinator::LifecycleController;
use arena_settlement::SettlementStatus;
use arena_types::{ChallengeId, ChallengeStatus, EscrowRef, Outcome, PlayerAddress, StakeAmount, Timestamp};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::info;

pub struct RpcServer {
    pub port: u16,
    controller: Arc<LifecycleController>,
}

impl RpcServer {
    pub fn new(port: u16, controller: Arc<LifecycleController>) -> Self {
        Self { port, controller }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/challenges", post(create_challenge).get(list_challenges))
            .route("/challenges/:id", get(get_challenge))
            .route("/challenges/:id/join", post(join_challenge))
            .route("/challenges/:id/fund", post(fund_challenge))
            .route("/challenges/:id/result", post(submit_result))
            .route("/challenges/:id/resolve", post(resolve_dispute))
            .route("/challenges/:id/settle", post(settle))
            .route("/challenges/:id/replay-settlement", post(replay_settlement))
            .route("/telemetry", get(telemetry))
            .with_state(self.controller.clone())
    }

    /// Start the RPC server. This runs until the server is shut down.
    pub async fn start(&self) -> Result<(), RpcError> {
        let addr = format!("0.0.0.0:{}", self.port);
        info!("RPC server listening on {}", addr);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
        axum::serve(listener, self.router())
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
        Ok(())
    }
}

type Controller = State<Arc<LifecycleController>>;

fn parse_address(raw: &str) -> Result<PlayerAddress, RpcError> {
    if raw.is_empty() {
        return Err(RpcError::InvalidRequest("empty address".to_string()));
    }
    Ok(PlayerAddress::new(raw))
}

async fn create_challenge(
    State(controller): Controller,
    Json(req): Json<CreateChallengeRequest>,
) -> Result<Json<ChallengeResponse>, RpcError> {
    let creator = parse_address(&req.creator)?;
    let challenge = controller.create_challenge(
        creator,
        StakeAmount::new(req.stake_amount),
        req.max_players,
        Timestamp::now(),
    )?;
    let versioned = controller.get(&challenge.id)?;
    Ok(Json(ChallengeResponse::from_versioned(&versioned)))
}

async fn list_challenges(
    State(controller): Controller,
) -> Result<Json<ChallengeListResponse>, RpcError> {
    let challenges = controller
        .list()?
        .iter()
        .map(ChallengeResponse::from_versioned)
        .collect();
    Ok(Json(ChallengeListResponse { challenges }))
}

async fn get_challenge(
    State(controller): Controller,
    Path(id): Path<String>,
) -> Result<Json<ChallengeResponse>, RpcError> {
    let versioned = controller.get(&ChallengeId::new(id))?;
    Ok(Json(ChallengeResponse::from_versioned(&versioned)))
}

/// Join an open challenge: a head-to-head join only expresses intent, a
/// tournament join takes and funds a seat.
async fn join_challenge(
    State(controller): Controller,
    Path(id): Path<String>,
    Json(req): Json<JoinRequest>,
) -> Result<Json<ChallengeResponse>, RpcError> {
    let id = ChallengeId::new(id);
    let player = parse_address(&req.player)?;
    let now = Timestamp::now();

    let record = controller.get(&id)?.record;
    if record.is_tournament() {
        controller.tournament_join(&id, player, now).await?;
    } else {
        controller.express_join_intent(&id, player, now).await?;
    }
    let versioned = controller.get(&id)?;
    Ok(Json(ChallengeResponse::from_versioned(&versioned)))
}

/// Fund a head-to-head challenge. While creator confirmation is required
/// the creator funds (with an escrow reference); afterwards the confirmed
/// joiner funds.
async fn fund_challenge(
    State(controller): Controller,
    Path(id): Path<String>,
    Json(req): Json<FundRequest>,
) -> Result<Json<ChallengeResponse>, RpcError> {
    let id = ChallengeId::new(id);
    let player = parse_address(&req.player)?;
    let now = Timestamp::now();

    let record = controller.get(&id)?.record;
    if record.status == ChallengeStatus::CreatorConfirmationRequired {
        let escrow_ref = req.escrow_ref.ok_or_else(|| {
            RpcError::InvalidRequest("creator funding requires escrow_ref".to_string())
        })?;
        controller
            .creator_fund(&id, player, EscrowRef::new(escrow_ref), now)
            .await?;
    } else {
        controller.joiner_fund(&id, player, now).await?;
    }
    let versioned = controller.get(&id)?;
    Ok(Json(ChallengeResponse::from_versioned(&versioned)))
}

async fn submit_result(
    State(controller): Controller,
    Path(id): Path<String>,
    Json(req): Json<SubmitResultRequest>,
) -> Result<Json<ChallengeResponse>, RpcError> {
    let id = ChallengeId::new(id);
    let player = parse_address(&req.player)?;
    let proof = match req.proof {
        Some(hex_blob) => Some(
            hex::decode(&hex_blob)
                .map_err(|e| RpcError::InvalidRequest(format!("bad proof hex: {e}")))?,
        ),
        None => None,
    };

    controller
        .submit_result(&id, player, req.claimed_win, proof, Timestamp::now())
        .await?;
    let versioned = controller.get(&id)?;
    Ok(Json(ChallengeResponse::from_versioned(&versioned)))
}

async fn resolve_dispute(
    State(controller): Controller,
    Path(id): Path<String>,
    Json(req): Json<ResolveDisputeRequest>,
) -> Result<Json<ChallengeResponse>, RpcError> {
    let id = ChallengeId::new(id);
    let outcome = match (&req.winner, req.disposition.as_deref()) {
        (Some(winner), _) => Outcome::Player(parse_address(winner)?),
        (None, Some("forfeit")) => Outcome::Forfeit,
        (None, Some("tie")) => Outcome::Tie,
        _ => {
            return Err(RpcError::InvalidRequest(
                "resolution needs a winner or a disposition of forfeit/tie".to_string(),
            ))
        }
    };

    controller
        .resolve_dispute(&id, outcome, &req.operator, Timestamp::now())
        .await?;
    let versioned = controller.get(&id)?;
    Ok(Json(ChallengeResponse::from_versioned(&versioned)))
}

async fn settle(
    State(controller): Controller,
    Path(id): Path<String>,
) -> Result<Json<SettlementStatusResponse>, RpcError> {
    let status = controller.settle(&ChallengeId::new(id)).await?;
    Ok(Json(settlement_response(status)))
}

async fn replay_settlement(
    State(controller): Controller,
    Path(id): Path<String>,
    Json(req): Json<ReplaySettlementRequest>,
) -> Result<Json<SettlementStatusResponse>, RpcError> {
    let status = controller
        .replay_settlement(&ChallengeId::new(id), &req.operator)
        .await?;
    Ok(Json(settlement_response(status)))
}

fn settlement_response(status: SettlementStatus) -> SettlementStatusResponse {
    match status {
        SettlementStatus::Submitted { txn } => SettlementStatusResponse {
            submitted: true,
            txn: Some(txn),
            skipped_reason: None,
        },
        SettlementStatus::Skipped { reason } => SettlementStatusResponse {
            submitted: false,
            txn: None,
            skipped_reason: Some(reason.to_string()),
        },
    }
}

async fn telemetry(State(controller): Controller) -> Result<Json<TelemetryResponse>, RpcError> {
    Ok(Json(TelemetryResponse {
        challenge_count: controller.challenge_count()?,
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
