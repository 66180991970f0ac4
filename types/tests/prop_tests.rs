use proptest::prelude::*;

use arena_types::{ChallengeId, PlayerAddress, StakeAmount, Timestamp};

proptest! {
    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// Timestamp elapsed_since: elapsed_since(now) = now - self (saturating).
    #[test]
    fn timestamp_elapsed_since(base in 0u64..1_000_000, offset in 0u64..1_000_000) {
        let t = Timestamp::new(base);
        let now = Timestamp::new(base + offset);
        prop_assert_eq!(t.elapsed_since(now), offset);
    }

    /// Timestamp elapsed_since saturates to 0 when now < self.
    #[test]
    fn timestamp_elapsed_since_saturates(
        base in 1u64..1_000_000,
        deficit in 1u64..1_000_000,
    ) {
        let later = Timestamp::new(base + deficit);
        let earlier = Timestamp::new(base);
        prop_assert_eq!(later.elapsed_since(earlier), 0);
    }

    /// Timestamp is_past agrees with manual arithmetic.
    #[test]
    fn timestamp_is_past_correct(
        start in 0u64..500_000,
        window in 1u64..500_000,
        offset in 0u64..1_000_000,
    ) {
        let deadline = Timestamp::new(start).plus_secs(window);
        let now = Timestamp::new(start + offset);
        prop_assert_eq!(deadline.is_past(now), offset >= window);
    }

    /// Timestamp plus_secs never panics and never goes backwards.
    #[test]
    fn timestamp_plus_secs_saturates(base in 0u64..u64::MAX, secs in 0u64..u64::MAX) {
        let t = Timestamp::new(base);
        prop_assert!(t.plus_secs(secs) >= t);
    }

    /// StakeAmount raw roundtrip.
    #[test]
    fn stake_amount_raw_roundtrip(raw in 0u64..u64::MAX) {
        let amount = StakeAmount::new(raw);
        prop_assert_eq!(amount.raw(), raw);
    }

    /// StakeAmount is_zero matches raw == 0.
    #[test]
    fn stake_amount_is_zero(raw in 0u64..1_000) {
        let amount = StakeAmount::new(raw);
        prop_assert_eq!(amount.is_zero(), raw == 0);
    }

    /// Prize pool plus fee always reconstructs the gross pool exactly.
    #[test]
    fn prize_pool_and_fee_sum_to_gross(
        stake in 0u64..1_000_000_000,
        participants in 2u64..=64,
        fee_bps in 0u16..=10_000,
    ) {
        let stake = StakeAmount::new(stake);
        let pool = stake.prize_pool(participants, fee_bps);
        let fee = stake.fee(participants, fee_bps);
        prop_assert_eq!((pool + fee).raw(), stake.raw() * participants);
    }

    /// Prize pool never exceeds the gross pool, and equals it at zero fee.
    #[test]
    fn prize_pool_bounded_by_gross(
        stake in 0u64..1_000_000_000,
        participants in 2u64..=64,
        fee_bps in 0u16..=10_000,
    ) {
        let stake = StakeAmount::new(stake);
        let pool = stake.prize_pool(participants, fee_bps);
        prop_assert!(pool.raw() <= stake.raw() * participants);
        prop_assert_eq!(
            stake.prize_pool(participants, 0).raw(),
            stake.raw() * participants
        );
    }

    /// StakeAmount addition saturates instead of wrapping.
    #[test]
    fn stake_amount_add_saturates(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let sum = StakeAmount::new(a) + StakeAmount::new(b);
        prop_assert_eq!(sum.raw(), a.saturating_add(b));
    }

    /// PlayerAddress preserves the wrapped string.
    #[test]
    fn player_address_roundtrip(s in "[a-zA-Z0-9]{1,64}") {
        let address = PlayerAddress::new(&s);
        prop_assert_eq!(address.as_str(), s.as_str());
    }
}

#[test]
fn generated_ids_are_hex_and_distinct() {
    let a = ChallengeId::generate();
    let b = ChallengeId::generate();
    assert_eq!(a.as_str().len(), 32);
    assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);
}
