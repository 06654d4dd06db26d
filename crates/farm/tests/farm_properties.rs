//! Property tests for the Farmer's reward accounting.
//!
//! Run with: cargo test -p verdant-farm --test farm_properties

use proptest::prelude::*;
use verdant_farm::{FarmEnv, FarmEvent, Farmer, FarmerConfig, RewarderRegistry};
use verdant_ledger::{InMemoryLedger, TokenLedger, TokenMetadata};
use verdant_types::{Address, Amount, CallContext, Timestamp};

const STAKERS: [&str; 3] = ["alice", "bob", "carol"];

fn addr(label: &str) -> Address {
    Address::derive_labeled("account", label)
}

fn reward_token() -> Address {
    Address::derive_labeled("token", "GTR")
}

fn stake_token() -> Address {
    Address::derive_labeled("token", "LP")
}

fn setup(rate: Amount, splits: (u16, u16, u16)) -> (Farmer, InMemoryLedger) {
    let mut ledger = InMemoryLedger::new();
    ledger
        .register_token(
            reward_token(),
            TokenMetadata::new("GTR").with_minter(addr("farmer")),
        )
        .unwrap();
    ledger
        .register_token(stake_token(), TokenMetadata::new("LP"))
        .unwrap();
    for staker in STAKERS {
        ledger
            .credit_genesis(&stake_token(), &addr(staker), 1_000_000_000)
            .unwrap();
        ledger
            .approve(&stake_token(), &addr(staker), &addr("farmer"), Amount::MAX)
            .unwrap();
    }
    let farmer = Farmer::new(FarmerConfig {
        address: addr("farmer"),
        owner: addr("owner"),
        reward_token: reward_token(),
        dev_addr: addr("dev"),
        treasury_addr: addr("treasury"),
        investor_addr: addr("investor"),
        reward_per_second: rate,
        start_time: 10,
        dev_percent: splits.0,
        treasury_percent: splits.1,
        investor_percent: splits.2,
    })
    .unwrap();
    (farmer, ledger)
}

#[derive(Debug, Clone)]
enum Step {
    Deposit { who: usize, amount: Amount },
    Withdraw { who: usize, amount: Amount },
    Claim { who: usize },
}

fn step_strategy() -> impl Strategy<Value = (Timestamp, Step)> {
    let step = prop_oneof![
        (0usize..3, 1u128..1_000_000).prop_map(|(who, amount)| Step::Deposit { who, amount }),
        (0usize..3, 1u128..1_000_000).prop_map(|(who, amount)| Step::Withdraw { who, amount }),
        (0usize..3).prop_map(|who| Step::Claim { who }),
    ];
    (0u64..50, step)
}

fn splits_strategy() -> impl Strategy<Value = (u16, u16, u16)> {
    (0u16..=400, 0u16..=300, 0u16..=300)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Paid plus held never exceeds what was minted for stakers, minted
    /// funds match the split, the accumulator never decreases, and what the
    /// Farmer still holds covers outstanding pending rewards up to rounding.
    #[test]
    fn rewards_are_conserved(
        rate in 1u128..1_000_000_000_000u128,
        splits in splits_strategy(),
        steps in prop::collection::vec(step_strategy(), 1..40),
    ) {
        let (mut farmer, mut ledger) = setup(rate, splits);
        let mut rewarders = RewarderRegistry::new();
        let mut events: Vec<FarmEvent> = Vec::new();
        let owner = CallContext::external(addr("owner"), 0);
        {
            let mut env = FarmEnv { ledger: &mut ledger, rewarders: &mut rewarders, events: &mut events };
            farmer.register_pool(&owner, &mut env, 100, stake_token(), None).unwrap();
        }

        let mut now: Timestamp = 0;
        let mut last_acc = 0u128;
        for (advance, step) in steps {
            now += advance;
            let mut env = FarmEnv { ledger: &mut ledger, rewarders: &mut rewarders, events: &mut events };
            let result = match step {
                Step::Deposit { who, amount } => {
                    farmer.deposit(&CallContext::external(addr(STAKERS[who]), now), &mut env, 0, amount)
                }
                Step::Withdraw { who, amount } => {
                    let held = farmer.position(0, &addr(STAKERS[who])).amount;
                    farmer.withdraw(&CallContext::external(addr(STAKERS[who]), now), &mut env, 0, amount.min(held))
                }
                Step::Claim { who } => {
                    farmer.deposit(&CallContext::external(addr(STAKERS[who]), now), &mut env, 0, 0)
                }
            };
            prop_assert!(result.is_ok(), "{:?}", result);
            let acc = farmer.pool(0).unwrap().acc_reward_per_share;
            prop_assert!(acc >= last_acc);
            last_acc = acc;
        }

        let mut emitted = 0u128;
        let mut lp_minted = 0u128;
        let mut accruals = 0u128;
        for event in &events {
            if let FarmEvent::PoolAccrued { emitted: e, lp_reward, .. } = event {
                emitted += e;
                lp_minted += lp_reward;
                accruals += 1;
            }
        }
        prop_assert_eq!(ledger.total_supply(&reward_token()), emitted);

        let paid: Amount = STAKERS.iter().map(|s| ledger.balance_of(&reward_token(), &addr(s))).sum();
        let held = ledger.balance_of(&reward_token(), &addr("farmer"));
        prop_assert_eq!(paid + held, lp_minted);

        // Every step accrued at `now`, so pending adds no unminted time.
        let mut outstanding = 0u128;
        for staker in STAKERS {
            outstanding += farmer
                .pending_tokens(0, &addr(staker), now, &ledger, &rewarders)
                .unwrap()
                .pending_reward;
        }
        let tolerance = (accruals + 1) * STAKERS.len() as u128;
        prop_assert!(
            held.abs_diff(outstanding) <= tolerance,
            "held {} outstanding {} tolerance {}", held, outstanding, tolerance
        );

        let funds: Amount = ["dev", "treasury", "investor"]
            .iter()
            .map(|s| ledger.balance_of(&reward_token(), &addr(s)))
            .sum();
        prop_assert_eq!(funds + lp_minted, emitted);
        let max_funds = emitted * u128::from(splits.0 + splits.1 + splits.2) / 1000;
        prop_assert!(funds <= max_funds);
    }

    /// Two stakers in the pool over the same window earn in proportion to
    /// their stakes, up to rounding.
    #[test]
    fn rewards_are_proportional(
        a in 1u128..1_000_000,
        b in 1u128..1_000_000,
        duration in 1u64..10_000,
    ) {
        let (mut farmer, mut ledger) = setup(1_000_000, (0, 0, 0));
        let mut rewarders = RewarderRegistry::new();
        let mut events: Vec<FarmEvent> = Vec::new();
        let mut env = FarmEnv { ledger: &mut ledger, rewarders: &mut rewarders, events: &mut events };
        let owner = CallContext::external(addr("owner"), 0);
        farmer.register_pool(&owner, &mut env, 1, stake_token(), None).unwrap();

        let alice = CallContext::external(addr("alice"), 10);
        let bob = CallContext::external(addr("bob"), 10);
        farmer.deposit(&alice, &mut env, 0, a).unwrap();
        farmer.deposit(&bob, &mut env, 0, b).unwrap();

        let end = 10 + duration;
        let ra = farmer.deposit(&alice.at(end), &mut env, 0, 0).unwrap().harvested;
        let rb = farmer.deposit(&bob.at(end), &mut env, 0, 0).unwrap().harvested;

        let total = u128::from(duration) * 1_000_000;
        prop_assert!(ra + rb <= total);
        // ra / rb == a / b within one unit of rounding on each side.
        let lhs = ra * b;
        let rhs = rb * a;
        let slack = a.max(b);
        prop_assert!(lhs.abs_diff(rhs) <= slack, "ra={} rb={} a={} b={}", ra, rb, a, b);
    }

    /// Nothing is minted before the start time, whatever happens.
    #[test]
    fn no_emission_before_start(
        deposits in prop::collection::vec((0u64..10, 1u128..1_000), 1..10),
    ) {
        let (mut farmer, mut ledger) = setup(1_000, (100, 100, 100));
        let mut rewarders = RewarderRegistry::new();
        let mut events: Vec<FarmEvent> = Vec::new();
        let mut env = FarmEnv { ledger: &mut ledger, rewarders: &mut rewarders, events: &mut events };
        let owner = CallContext::external(addr("owner"), 0);
        farmer.register_pool(&owner, &mut env, 1, stake_token(), None).unwrap();
        for (at, amount) in deposits {
            farmer.deposit(&CallContext::external(addr("alice"), at), &mut env, 0, amount).unwrap();
        }
        prop_assert_eq!(env.ledger.total_supply(&reward_token()), 0);
    }
}
