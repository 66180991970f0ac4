//! Background sweeping: expired deadlines and owed settlements.

use crate::controller::LifecycleController;
use crate::error::CoordinatorError;
use arena_store::ChallengeStore;
use arena_types::Timestamp;
use arena_utils::StatsCounter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-tick sweep statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SweepReport {
    pub deadlines_fired: usize,
    pub settlements_submitted: usize,
}

/// Periodically fires expired deadlines and pumps owed payouts.
///
/// The sweeper is stateless: every tick scans the store fresh, so a missed
/// tick or a crash only delays work. Conditional-write conflicts are left
/// for the next cycle; the record's own deadlines decide what happens then.
pub struct TimeoutSweeper {
    controller: Arc<LifecycleController>,
    store: Arc<dyn ChallengeStore>,
    stats: StatsCounter,
}

impl TimeoutSweeper {
    pub fn new(controller: Arc<LifecycleController>, store: Arc<dyn ChallengeStore>) -> Self {
        Self {
            controller,
            store,
            stats: StatsCounter::new(&["sweeps", "deadlines_fired", "settlements_submitted"]),
        }
    }

    /// Cumulative counters since the sweeper was built.
    pub fn stats(&self) -> &StatsCounter {
        &self.stats
    }

    /// One sweep pass at the given time.
    pub async fn tick(&self, now: Timestamp) -> Result<SweepReport, CoordinatorError> {
        let mut report = SweepReport::default();

        for candidate in self.store.deadline_candidates(now)? {
            let id = candidate.record.id.clone();
            match self.controller.apply_timeout(&id, now).await {
                Ok(_) => {
                    report.deadlines_fired += 1;
                }
                Err(CoordinatorError::StaleState(_)) => {
                    debug!(id = %id, "timeout lost to concurrent write, next cycle");
                }
                Err(err) => {
                    warn!(id = %id, %err, "timeout sweep failed");
                }
            }
        }

        for candidate in self.store.settlement_candidates()? {
            let id = candidate.record.id.clone();
            match self.controller.settle(&id).await {
                Ok(status) => {
                    if matches!(status, arena_settlement::SettlementStatus::Submitted { .. }) {
                        report.settlements_submitted += 1;
                    }
                }
                Err(err) => {
                    warn!(id = %id, %err, "settlement pump failed");
                }
            }
        }

        Ok(report)
    }

    /// Run the sweep loop until `shutdown` flips to true.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let period = Duration::from_secs(self.controller.params().sweep_interval_secs);
        let mut interval = tokio::time::interval(period);
        info!(period_secs = period.as_secs(), "timeout sweeper started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.tick(Timestamp::now()).await {
                        Ok(report) => {
                            self.stats.increment("sweeps");
                            self.stats.add("deadlines_fired", report.deadlines_fired as u64);
                            self.stats
                                .add("settlements_submitted", report.settlements_submitted as u64);
                        }
                        Err(err) => warn!(%err, "sweep tick failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(
                            sweeps = self.stats.get("sweeps"),
                            deadlines_fired = self.stats.get("deadlines_fired"),
                            settlements_submitted = self.stats.get("settlements_submitted"),
                            "timeout sweeper stopped"
                        );
                        return;
                    }
                }
            }
        }
    }
}
