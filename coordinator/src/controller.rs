//! The lifecycle controller — the single write path for challenge state.

use crate::error::CoordinatorError;
use crate::event::ChallengeEvent;
use arena_lifecycle::{apply, reconcile, Action, LifecycleError, LifecycleEvent};
use arena_settlement::{SettlementClient, SettlementExecutor, SettlementStatus};
use arena_store::{ChallengeStore, StoreError, Versioned};
use arena_types::{
    Challenge, ChallengeId, CoordinatorParams, EscrowRef, Outcome, PlayerAddress, StakeAmount,
    Timestamp,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// How many times a conditional write is retried before surfacing
/// staleness to the caller.
const WRITE_RETRIES: usize = 3;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Coordinates all mutations of challenge state.
///
/// Every operation follows the same shape: read the record and its version,
/// run the pure lifecycle engine, and write the whole record back
/// conditionally. A lost race is retried against the fresh record a few
/// times; persistent conflict surfaces as
/// [`CoordinatorError::StaleState`].
pub struct LifecycleController {
    store: Arc<dyn ChallengeStore>,
    client: Arc<dyn SettlementClient>,
    executor: SettlementExecutor,
    params: CoordinatorParams,
    events: broadcast::Sender<ChallengeEvent>,
}

impl LifecycleController {
    pub fn new(
        store: Arc<dyn ChallengeStore>,
        client: Arc<dyn SettlementClient>,
        params: CoordinatorParams,
    ) -> Self {
        let executor = SettlementExecutor::new(store.clone(), client.clone(), params.clone());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            client,
            executor,
            params,
            events,
        }
    }

    pub fn params(&self) -> &CoordinatorParams {
        &self.params
    }

    /// Subscribe to lifecycle and settlement events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChallengeEvent> {
        self.events.subscribe()
    }

    // ── Reads ──────────────────────────────────────────────────────────

    pub fn get(&self, id: &ChallengeId) -> Result<Versioned<Challenge>, CoordinatorError> {
        Ok(self.store.get(id)?)
    }

    pub fn list(&self) -> Result<Vec<Versioned<Challenge>>, CoordinatorError> {
        Ok(self.store.list()?)
    }

    pub fn challenge_count(&self) -> Result<u64, CoordinatorError> {
        Ok(self.store.challenge_count()?)
    }

    // ── Writes ─────────────────────────────────────────────────────────

    /// Create and persist a new open challenge.
    pub fn create_challenge(
        &self,
        creator: PlayerAddress,
        stake_amount: StakeAmount,
        max_players: u32,
        now: Timestamp,
    ) -> Result<Challenge, CoordinatorError> {
        if stake_amount.is_zero() {
            return Err(CoordinatorError::InvalidRequest(
                "stake must be positive".to_string(),
            ));
        }
        if max_players < 2 || max_players > 64 || !max_players.is_power_of_two() {
            return Err(CoordinatorError::InvalidRequest(format!(
                "max_players must be a power of two between 2 and 64, got {max_players}"
            )));
        }

        let challenge = Challenge::open(
            ChallengeId::generate(),
            creator.clone(),
            stake_amount,
            max_players,
            now,
            &self.params,
        );
        self.store.insert(&challenge)?;
        info!(id = %challenge.id, %creator, %stake_amount, max_players, "challenge created");
        self.publish(ChallengeEvent::Created {
            id: challenge.id.clone(),
            creator,
        });
        Ok(challenge)
    }

    /// A head-to-head joiner signals intent to play.
    pub async fn express_join_intent(
        &self,
        id: &ChallengeId,
        actor: PlayerAddress,
        now: Timestamp,
    ) -> Result<Challenge, CoordinatorError> {
        self.mutate(id, |c| {
            apply(
                c,
                Action::ExpressJoinIntent {
                    actor: actor.clone(),
                },
                now,
                &self.params,
            )
        })
        .await
    }

    /// The creator locks their stake against the pending joiner.
    pub async fn creator_fund(
        &self,
        id: &ChallengeId,
        actor: PlayerAddress,
        escrow_ref: EscrowRef,
        now: Timestamp,
    ) -> Result<Challenge, CoordinatorError> {
        self.mutate(id, |c| {
            apply(
                c,
                Action::CreatorFund {
                    actor: actor.clone(),
                    escrow_ref: escrow_ref.clone(),
                },
                now,
                &self.params,
            )
        })
        .await
    }

    /// The confirmed joiner locks their stake, activating the challenge.
    pub async fn joiner_fund(
        &self,
        id: &ChallengeId,
        actor: PlayerAddress,
        now: Timestamp,
    ) -> Result<Challenge, CoordinatorError> {
        self.mutate(id, |c| {
            apply(
                c,
                Action::JoinerFund {
                    actor: actor.clone(),
                },
                now,
                &self.params,
            )
        })
        .await
    }

    /// A tournament entrant takes and funds a seat.
    pub async fn tournament_join(
        &self,
        id: &ChallengeId,
        actor: PlayerAddress,
        now: Timestamp,
    ) -> Result<Challenge, CoordinatorError> {
        self.mutate(id, |c| {
            apply(
                c,
                Action::TournamentJoin {
                    actor: actor.clone(),
                },
                now,
                &self.params,
            )
        })
        .await
    }

    /// Record a participant's result claim.
    pub async fn submit_result(
        &self,
        id: &ChallengeId,
        actor: PlayerAddress,
        claimed_win: bool,
        proof: Option<Vec<u8>>,
        now: Timestamp,
    ) -> Result<Challenge, CoordinatorError> {
        self.mutate(id, |c| {
            reconcile::record_result(c, &actor, claimed_win, proof.clone(), now)
        })
        .await
    }

    /// Operator resolution of a disputed challenge.
    pub async fn resolve_dispute(
        &self,
        id: &ChallengeId,
        outcome: Outcome,
        operator: &str,
        now: Timestamp,
    ) -> Result<Challenge, CoordinatorError> {
        self.mutate(id, |c| {
            reconcile::resolve_dispute(c, outcome.clone(), operator, now)
        })
        .await
    }

    /// Fire whichever armed deadline has passed for this challenge, if any.
    /// Used by the sweeper; safe to call on any record.
    pub async fn apply_timeout(
        &self,
        id: &ChallengeId,
        now: Timestamp,
    ) -> Result<Challenge, CoordinatorError> {
        self.mutate(id, |c| apply(c, Action::Timeout, now, &self.params))
            .await
    }

    /// Execute the payout for a completed challenge, at most once.
    pub async fn settle(&self, id: &ChallengeId) -> Result<SettlementStatus, CoordinatorError> {
        let result = self.executor.execute(id).await;
        self.publish_settlement(id, &result);
        Ok(result?)
    }

    /// Operator replay of a claimed-but-unconfirmed payout.
    pub async fn replay_settlement(
        &self,
        id: &ChallengeId,
        operator: &str,
    ) -> Result<SettlementStatus, CoordinatorError> {
        let result = self.executor.replay(id, operator).await;
        self.publish_settlement(id, &result);
        Ok(result?)
    }

    // ── Internals ──────────────────────────────────────────────────────

    /// Read-apply-write with bounded retry on version conflicts.
    async fn mutate<F>(
        &self,
        id: &ChallengeId,
        mut op: F,
    ) -> Result<Challenge, CoordinatorError>
    where
        F: FnMut(&mut Challenge) -> Result<Vec<LifecycleEvent>, LifecycleError>,
    {
        for attempt in 0..WRITE_RETRIES {
            let versioned = self.store.get(id)?;
            let mut record = versioned.record;
            let events = op(&mut record)?;
            match self.store.compare_and_put(id, versioned.version, &record) {
                Ok(_) => {
                    self.handle_events(id, events).await;
                    return Ok(record);
                }
                Err(StoreError::VersionConflict { .. }) => {
                    debug!(id = %id, attempt, "conditional write lost, retrying");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(CoordinatorError::StaleState(id.to_string()))
    }

    /// Carry out event side effects (escrow refunds) and publish.
    async fn handle_events(&self, id: &ChallengeId, events: Vec<LifecycleEvent>) {
        for event in events {
            match &event {
                LifecycleEvent::RefundCreator { creator, .. } => {
                    self.refund(id, creator.clone()).await;
                }
                LifecycleEvent::RefundParticipants { participants } => {
                    for participant in participants {
                        self.refund(id, participant.clone()).await;
                    }
                }
                _ => {}
            }
            if let Some(published) = self.to_challenge_event(id, event) {
                self.publish(published);
            }
        }
    }

    /// Issue one escrow refund. Failures are logged and left to the
    /// operator; the lifecycle transition itself has already committed.
    async fn refund(&self, id: &ChallengeId, recipient: PlayerAddress) {
        match self.client.refund(id.clone(), recipient.clone()).await {
            Ok(receipt) => {
                info!(id = %id, %recipient, txn = %receipt.txn, "escrow refunded");
            }
            Err(err) => {
                warn!(id = %id, %recipient, %err, "escrow refund failed");
            }
        }
    }

    fn to_challenge_event(
        &self,
        id: &ChallengeId,
        event: LifecycleEvent,
    ) -> Option<ChallengeEvent> {
        let id = id.clone();
        let mapped = match event {
            LifecycleEvent::JoinIntentExpressed { joiner } => {
                ChallengeEvent::JoinIntent { id, joiner }
            }
            LifecycleEvent::ParticipantJoined { player } => {
                ChallengeEvent::ParticipantJoined { id, player }
            }
            LifecycleEvent::CreatorFunded => ChallengeEvent::CreatorFunded { id },
            LifecycleEvent::Activated => ChallengeEvent::Activated { id },
            LifecycleEvent::ResultRecorded { player, .. } => {
                ChallengeEvent::ResultSubmitted { id, player }
            }
            LifecycleEvent::Completed { outcome } => ChallengeEvent::Completed { id, outcome },
            LifecycleEvent::Disputed { reason } => ChallengeEvent::Disputed { id, reason },
            LifecycleEvent::DisputeResolved { outcome, .. } => {
                ChallengeEvent::DisputeResolved { id, outcome }
            }
            LifecycleEvent::RevertedToOpen { reason } => ChallengeEvent::RevertedToOpen {
                id,
                reason: reason.to_string(),
            },
            LifecycleEvent::Cancelled { reason } => ChallengeEvent::Cancelled {
                id,
                reason: reason.to_string(),
            },
            // Refunds and bracket bookkeeping are internal.
            LifecycleEvent::RefundCreator { .. }
            | LifecycleEvent::RefundParticipants { .. }
            | LifecycleEvent::MatchDecided { .. }
            | LifecycleEvent::RoundAdvanced { .. }
            | LifecycleEvent::ChampionCrowned { .. } => return None,
        };
        Some(mapped)
    }

    fn publish_settlement(
        &self,
        id: &ChallengeId,
        result: &Result<SettlementStatus, arena_settlement::SettlementError>,
    ) {
        match result {
            Ok(SettlementStatus::Submitted { txn }) => {
                self.publish(ChallengeEvent::SettlementSubmitted {
                    id: id.clone(),
                    txn: txn.clone(),
                });
            }
            Ok(SettlementStatus::Skipped { .. }) => {}
            Err(err) => {
                self.publish(ChallengeEvent::SettlementFailed {
                    id: id.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    fn publish(&self, event: ChallengeEvent) {
        // A send error only means nobody is subscribed right now.
        let _ = self.events.send(event);
    }
}
