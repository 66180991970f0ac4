//! Coordinator parameters.

use serde::{Deserialize, Serialize};

/// Tunable parameters governing fees, funding windows and deadlines.
///
/// All durations are seconds. Production deployments use [`CoordinatorParams::defaults`];
/// tests use [`CoordinatorParams::fast_defaults`] to keep windows short.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorParams {
    /// Platform fee withheld from the gross pool, in basis points.
    pub fee_bps: u16,
    /// How long the creator has to fund after a joiner expresses intent.
    pub creator_funding_window_secs: u64,
    /// How long the joiner has to fund after the creator locks escrow.
    pub joiner_funding_window_secs: u64,
    /// How long an open challenge stays listed with no joiner.
    pub open_expiration_secs: u64,
    /// How long after activation results are accepted.
    pub result_window_secs: u64,
    /// Sweep cadence for the timeout scanner.
    pub sweep_interval_secs: u64,
    /// Upper bound on a single settlement submission.
    pub settlement_timeout_secs: u64,
}

impl CoordinatorParams {
    /// Production defaults: 5% fee, 5-minute funding windows, 24-hour open
    /// listing, 2-hour result window.
    pub fn defaults() -> Self {
        Self {
            fee_bps: 500,
            creator_funding_window_secs: 5 * 60,
            joiner_funding_window_secs: 5 * 60,
            open_expiration_secs: 24 * 60 * 60,
            result_window_secs: 2 * 60 * 60,
            sweep_interval_secs: 30,
            settlement_timeout_secs: 30,
        }
    }

    /// Short windows for tests.
    pub fn fast_defaults() -> Self {
        Self {
            fee_bps: 500,
            creator_funding_window_secs: 10,
            joiner_funding_window_secs: 10,
            open_expiration_secs: 100,
            result_window_secs: 50,
            sweep_interval_secs: 1,
            settlement_timeout_secs: 2,
        }
    }
}

impl Default for CoordinatorParams {
    fn default() -> Self {
        Self::defaults()
    }
}
