//! Reward-per-share accumulator shared by the Farmer and the rewarders.
//!
//! A pool's accumulator grows by `reward * ACC_REWARD_PRECISION / staked`
//! on every accrual. A staker's entitlement is
//! `amount * acc / ACC_REWARD_PRECISION - reward_debt`, where the debt is
//! re-based to the current `amount * acc` after every change of `amount`.

use verdant_types::math::{self, Overflow};
use verdant_types::{Amount, Timestamp};

/// Fixed-point scale of every accumulator.
pub const ACC_REWARD_PRECISION: u128 = 1_000_000_000_000;

/// Seconds that count towards emission between the last accrual and `now`.
/// Nothing accrues before `start_time`.
pub fn elapsed_since(last_reward_time: Timestamp, start_time: Timestamp, now: Timestamp) -> u64 {
    now.saturating_sub(last_reward_time.max(start_time))
}

/// Emission owed to a pool of weight `alloc_point` over `elapsed` seconds.
pub fn pool_emission(
    elapsed: u64,
    reward_per_second: Amount,
    alloc_point: u64,
    total_alloc_point: u64,
) -> Result<Amount, Overflow> {
    math::mul3_div(
        elapsed.into(),
        reward_per_second,
        alloc_point.into(),
        total_alloc_point.into(),
        "pool emission",
    )
}

/// Accumulator after distributing `reward` over `staked` units.
pub fn accumulate(acc: u128, reward: Amount, staked: Amount) -> Result<u128, Overflow> {
    if staked == 0 {
        return Ok(acc);
    }
    let increment = math::mul_div(reward, ACC_REWARD_PRECISION, staked, "reward per share")?;
    math::add(acc, increment, "accumulated reward per share")
}

/// Total reward accrued to `amount` at accumulator value `acc`. Also the
/// debt to record after a position change.
pub fn accrued(amount: Amount, acc: u128) -> Result<Amount, Overflow> {
    math::mul_div(amount, acc, ACC_REWARD_PRECISION, "reward debt")
}

/// Unclaimed reward of a position.
pub fn pending(amount: Amount, acc: u128, reward_debt: Amount) -> Result<Amount, Overflow> {
    math::sub(accrued(amount, acc)?, reward_debt, "pending reward")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_no_time_counts_before_start() {
        assert_eq!(elapsed_since(100, 200, 150), 0);
        assert_eq!(elapsed_since(100, 200, 260), 60);
        assert_eq!(elapsed_since(300, 200, 310), 10);
        assert_eq!(elapsed_since(300, 200, 250), 0);
    }

    #[test]
    fn test_pool_emission_by_weight() {
        assert_eq!(pool_emission(10, 100, 1, 4).unwrap(), 250);
        assert_eq!(pool_emission(10, 100, 0, 4).unwrap(), 0);
        assert_eq!(pool_emission(10, 100, 1, 0).unwrap(), 0);
    }

    #[test]
    fn test_pending_after_rebase() {
        let acc = accumulate(0, 50, 100).unwrap();
        assert_eq!(acc, ACC_REWARD_PRECISION / 2);
        let debt = accrued(100, acc).unwrap();
        assert_eq!(pending(100, acc, debt).unwrap(), 0);

        let acc = accumulate(acc, 30, 100).unwrap();
        assert_eq!(pending(100, acc, debt).unwrap(), 30);
        assert!(pending(10, acc, debt).is_err());
        assert_eq!(accumulate(acc, 1_000, 0).unwrap(), acc);
    }

    proptest! {
        #[test]
        fn accumulator_never_decreases(
            acc in 0u128..=u128::MAX / 4,
            reward in 0u128..=1_000_000_000_000_000_000_000_000u128,
            staked in 0u128..=1_000_000_000_000_000_000_000_000u128,
        ) {
            if let Ok(next) = accumulate(acc, reward, staked) {
                prop_assert!(next >= acc);
            }
        }

        #[test]
        fn distributed_never_exceeds_reward(
            reward in 0u128..=1_000_000_000_000_000_000_000u128,
            a in 1u128..=1_000_000_000_000_000_000u128,
            b in 1u128..=1_000_000_000_000_000_000u128,
        ) {
            let acc = accumulate(0, reward, a + b).unwrap();
            let paid = accrued(a, acc).unwrap() + accrued(b, acc).unwrap();
            prop_assert!(paid <= reward);
        }
    }
}
