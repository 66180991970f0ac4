//! Nullable escrow program client — records calls, scriptable failures.

use arena_settlement::{ClientError, SettlementClient, SettlementInstruction, SettlementReceipt};
use arena_types::{ChallengeId, PlayerAddress};
use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// A settlement client that confirms every call immediately.
///
/// Failures are scripted with [`NullSettlementClient::fail_next`]; each
/// queued failure consumes one call. Successful calls are recorded for
/// assertion.
pub struct NullSettlementClient {
    settled: Mutex<Vec<SettlementInstruction>>,
    refunded: Mutex<Vec<(ChallengeId, PlayerAddress)>>,
    queued_failures: Mutex<Vec<String>>,
    sequence: AtomicU64,
}

impl NullSettlementClient {
    pub fn new() -> Self {
        Self {
            settled: Mutex::new(Vec::new()),
            refunded: Mutex::new(Vec::new()),
            queued_failures: Mutex::new(Vec::new()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Make the next call fail with the given reason.
    pub fn fail_next(&self, reason: &str) {
        self.queued_failures.lock().unwrap().push(reason.to_string());
    }

    /// Instructions confirmed so far.
    pub fn settled(&self) -> Vec<SettlementInstruction> {
        self.settled.lock().unwrap().clone()
    }

    /// Refunds confirmed so far.
    pub fn refunded(&self) -> Vec<(ChallengeId, PlayerAddress)> {
        self.refunded.lock().unwrap().clone()
    }

    fn take_failure(&self) -> Option<String> {
        let mut queued = self.queued_failures.lock().unwrap();
        if queued.is_empty() {
            None
        } else {
            Some(queued.remove(0))
        }
    }

    fn receipt(&self) -> SettlementReceipt {
        let n = self.sequence.fetch_add(1, Ordering::SeqCst);
        SettlementReceipt {
            txn: format!("null-txn-{n}"),
        }
    }
}

impl Default for NullSettlementClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SettlementClient for NullSettlementClient {
    fn settle(
        &self,
        instruction: SettlementInstruction,
    ) -> BoxFuture<'_, Result<SettlementReceipt, ClientError>> {
        Box::pin(async move {
            if let Some(reason) = self.take_failure() {
                return Err(ClientError::Rejected(reason));
            }
            self.settled.lock().unwrap().push(instruction);
            Ok(self.receipt())
        })
    }

    fn refund(
        &self,
        challenge_id: ChallengeId,
        recipient: PlayerAddress,
    ) -> BoxFuture<'_, Result<SettlementReceipt, ClientError>> {
        Box::pin(async move {
            if let Some(reason) = self.take_failure() {
                return Err(ClientError::Rejected(reason));
            }
            self.refunded
                .lock()
                .unwrap()
                .push((challenge_id, recipient));
            Ok(self.receipt())
        })
    }
}
