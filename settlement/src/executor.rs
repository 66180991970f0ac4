//! The settlement executor.

use crate::client::{SettlementClient, SettlementInstruction};
use crate::error::SettlementError;
use arena_store::{ChallengeStore, StoreError};
use arena_types::{Challenge, ChallengeId, ChallengeStatus, CoordinatorParams, PlayerAddress};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// What an execution attempt did.
#[derive(Clone, Debug, PartialEq)]
pub enum SettlementStatus {
    /// The payout transaction was submitted and confirmed.
    Submitted { txn: String },
    /// Nothing to do: the payout is not due or another executor claimed it.
    Skipped { reason: &'static str },
}

/// Drives completed challenges to settlement, at most once each.
pub struct SettlementExecutor {
    store: Arc<dyn ChallengeStore>,
    client: Arc<dyn SettlementClient>,
    params: CoordinatorParams,
}

impl SettlementExecutor {
    pub fn new(
        store: Arc<dyn ChallengeStore>,
        client: Arc<dyn SettlementClient>,
        params: CoordinatorParams,
    ) -> Self {
        Self {
            store,
            client,
            params,
        }
    }

    /// Execute the payout for one challenge.
    ///
    /// The sequence is precheck, claim, call: the `payout_triggered` flag is
    /// claimed under a conditional write before the external call, so two
    /// executors racing on the same record result in one call and one skip.
    /// A failed call leaves the flag set for [`SettlementExecutor::replay`].
    pub async fn execute(&self, id: &ChallengeId) -> Result<SettlementStatus, SettlementError> {
        let versioned = self.store.get(id)?;
        let mut challenge = versioned.record;

        if !challenge.needs_payout {
            return Ok(SettlementStatus::Skipped {
                reason: "no payout owed",
            });
        }
        if challenge.payout_triggered {
            return Ok(SettlementStatus::Skipped {
                reason: "payout already triggered",
            });
        }

        let instruction = match self.precheck(&challenge) {
            Ok(instruction) => instruction,
            Err(reason) => {
                warn!(id = %id, %reason, "settlement precheck failed");
                challenge.settlement_error = Some(reason.clone());
                // Best effort: a conflict here just means the error note is
                // lost until the next attempt.
                let _ = self
                    .store
                    .compare_and_put(id, versioned.version, &challenge);
                return Err(SettlementError::PrecheckFailed {
                    id: id.to_string(),
                    reason,
                });
            }
        };

        // Claim the payout before touching the chain.
        challenge.payout_triggered = true;
        let claimed_version =
            match self
                .store
                .compare_and_put(id, versioned.version, &challenge)
            {
                Ok(version) => version,
                Err(StoreError::VersionConflict { .. }) => {
                    return Ok(SettlementStatus::Skipped {
                        reason: "lost claim race",
                    });
                }
                Err(err) => return Err(err.into()),
            };

        self.submit(id, claimed_version, challenge, instruction)
            .await
    }

    /// Re-run the external call for a payout that was claimed but never
    /// confirmed. Operator-only: the claim itself is never repeated.
    pub async fn replay(
        &self,
        id: &ChallengeId,
        operator: &str,
    ) -> Result<SettlementStatus, SettlementError> {
        let versioned = self.store.get(id)?;
        let challenge = versioned.record;

        if !challenge.payout_triggered || !challenge.needs_payout {
            return Err(SettlementError::ReplayNotEligible(id.to_string()));
        }
        let instruction = self.precheck(&challenge).map_err(|reason| {
            SettlementError::PrecheckFailed {
                id: id.to_string(),
                reason,
            }
        })?;

        info!(id = %id, operator, "replaying settlement call");
        self.submit(id, versioned.version, challenge, instruction)
            .await
    }

    /// Validate that the record supports the payout it claims to owe, and
    /// build the instruction.
    fn precheck(&self, challenge: &Challenge) -> Result<SettlementInstruction, String> {
        if challenge.status != ChallengeStatus::Completed {
            return Err(format!("status is {}, not completed", challenge.status));
        }
        let winner = match challenge.outcome.as_ref().and_then(|o| o.winner()) {
            Some(winner) => winner.clone(),
            None => return Err("outcome is not decisive".to_string()),
        };
        if !challenge.is_participant(&winner) {
            return Err(format!("winner {winner} is not a participant"));
        }
        if challenge.prize_pool.is_zero() {
            return Err("prize pool is zero".to_string());
        }
        let escrow_ref = match challenge.escrow_ref.clone() {
            Some(escrow_ref) => escrow_ref,
            None => return Err("no escrow reference".to_string()),
        };

        // An operator override has already been validated at resolution
        // time; otherwise the recorded claims must support the winner.
        if challenge.resolved_by.is_none() {
            self.check_claims_support(challenge, &winner)?;
        }

        Ok(SettlementInstruction {
            challenge_id: challenge.id.clone(),
            escrow_ref,
            winner,
            amount: challenge.prize_pool,
        })
    }

    fn check_claims_support(
        &self,
        challenge: &Challenge,
        winner: &PlayerAddress,
    ) -> Result<(), String> {
        if let Some(tournament) = challenge.tournament.as_ref() {
            if tournament.champion.as_ref() != Some(winner) {
                return Err(format!("bracket champion does not match winner {winner}"));
            }
            return Ok(());
        }

        match challenge.results.get(winner) {
            Some(entry) if entry.claimed_win => Ok(()),
            Some(_) => Err(format!("winner {winner} claimed a loss")),
            // Deadline concession: the winner never submitted, which is
            // only valid if the lone submission was the opponent's loss
            // claim.
            None => match challenge.results.iter().next() {
                Some((submitter, entry))
                    if challenge.results.len() == 1
                        && submitter != winner
                        && !entry.claimed_win =>
                {
                    Ok(())
                }
                _ => Err(format!("no claims support winner {winner}")),
            },
        }
    }

    /// Submit the instruction and record the receipt. The payout claim is
    /// already in place; failures only annotate the record.
    async fn submit(
        &self,
        id: &ChallengeId,
        version: u64,
        mut challenge: Challenge,
        instruction: SettlementInstruction,
    ) -> Result<SettlementStatus, SettlementError> {
        let timeout = Duration::from_secs(self.params.settlement_timeout_secs);
        let call = self.client.settle(instruction);
        let outcome = tokio::time::timeout(timeout, call).await;

        match outcome {
            Ok(Ok(receipt)) => {
                info!(id = %id, txn = %receipt.txn, "settlement confirmed");
                challenge.needs_payout = false;
                challenge.settlement_txn = Some(receipt.txn.clone());
                challenge.settlement_error = None;
                self.store.compare_and_put(id, version, &challenge)?;
                Ok(SettlementStatus::Submitted { txn: receipt.txn })
            }
            Ok(Err(err)) => {
                let reason = err.to_string();
                warn!(id = %id, %reason, "settlement call failed");
                challenge.settlement_error = Some(reason.clone());
                self.store.compare_and_put(id, version, &challenge)?;
                Err(SettlementError::CallFailed {
                    id: id.to_string(),
                    reason,
                })
            }
            Err(_) => {
                let secs = self.params.settlement_timeout_secs;
                warn!(id = %id, secs, "settlement call timed out");
                challenge.settlement_error = Some(format!("timed out after {secs}s"));
                self.store.compare_and_put(id, version, &challenge)?;
                Err(SettlementError::Timeout {
                    id: id.to_string(),
                    secs,
                })
            }
        }
    }
}
