//! Stake and prize amounts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

/// A token amount in base units.
///
/// Amounts are integers in the token's smallest denomination; the coordinator
/// never works with fractional values.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct StakeAmount(u64);

impl StakeAmount {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Compute the total prize pool for a challenge: stake times participant
    /// count, minus the platform fee expressed in basis points.
    ///
    /// Intermediate math is done in `u128` so a maximal stake with many
    /// participants cannot overflow.
    pub fn prize_pool(&self, participants: u64, fee_bps: u16) -> StakeAmount {
        debug_assert!(fee_bps <= 10_000, "fee above 100%");
        let gross = self.0 as u128 * participants as u128;
        let net = gross * (10_000u128 - fee_bps as u128) / 10_000u128;
        StakeAmount(net as u64)
    }

    /// The platform fee withheld from the gross pool.
    pub fn fee(&self, participants: u64, fee_bps: u16) -> StakeAmount {
        let gross = self.0 as u128 * participants as u128;
        let net = self.prize_pool(participants, fee_bps).0 as u128;
        StakeAmount((gross - net) as u64)
    }
}

impl Add for StakeAmount {
    type Output = StakeAmount;

    fn add(self, rhs: StakeAmount) -> StakeAmount {
        StakeAmount(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for StakeAmount {
    fn add_assign(&mut self, rhs: StakeAmount) {
        *self = *self + rhs;
    }
}

impl fmt::Display for StakeAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prize_pool_applies_fee_in_basis_points() {
        // Two players staking 1000 each at a 5% fee.
        let pool = StakeAmount::new(1_000).prize_pool(2, 500);
        assert_eq!(pool, StakeAmount::new(1_900));
    }

    #[test]
    fn prize_pool_zero_fee_is_gross() {
        let pool = StakeAmount::new(250).prize_pool(8, 0);
        assert_eq!(pool, StakeAmount::new(2_000));
    }

    #[test]
    fn fee_and_pool_sum_to_gross() {
        let stake = StakeAmount::new(333);
        let pool = stake.prize_pool(8, 500);
        let fee = stake.fee(8, 500);
        assert_eq!(pool + fee, StakeAmount::new(333 * 8));
    }

    #[test]
    fn prize_pool_survives_large_stakes() {
        let stake = StakeAmount::new(u64::MAX / 8);
        // Would overflow u64 without the wider intermediate.
        let pool = stake.prize_pool(8, 500);
        assert!(pool.raw() > 0);
    }
}
