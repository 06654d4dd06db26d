//! Per-second rewarder for a single pool.
//!
//! Pays a fixed amount per second, shared by everyone staked in the bound
//! pool. The staked supply is the Farmer's balance of the stake token.
//! When the rewarder cannot cover a payout it pays what it holds and carries
//! the rest as `unpaid_rewards` until it is topped up.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use verdant_ledger::TokenLedger;
use verdant_types::math;
use verdant_types::{Address, Amount, Timestamp};

use crate::accumulator;
use crate::error::RewarderError;
use crate::rewarder::{HookContext, RewardPayout, Rewarder};

/// What a rewarder pays out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardAsset {
    Token(Address),
    /// The chain's native asset, held in the ledger under [`Address::NATIVE`].
    Native,
}

impl RewardAsset {
    pub fn ledger_id(&self) -> Address {
        match self {
            RewardAsset::Token(token) => *token,
            RewardAsset::Native => Address::NATIVE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewarderUser {
    pub amount: Amount,
    pub reward_debt: Amount,
    pub unpaid_rewards: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleRewarderPerSec {
    address: Address,
    owner: Address,
    farmer: Address,
    stake_token: Address,
    asset: RewardAsset,
    token_per_sec: Amount,
    acc_token_per_share: u128,
    last_reward_time: Timestamp,
    users: BTreeMap<Address, RewarderUser>,
}

impl SimpleRewarderPerSec {
    pub fn new(
        address: Address,
        owner: Address,
        asset: RewardAsset,
        stake_token: Address,
        token_per_sec: Amount,
        farmer: Address,
        now: Timestamp,
    ) -> Result<Self, RewarderError> {
        if address.is_zero() || owner.is_zero() {
            return Err(RewarderError::InvalidConfiguration(
                "rewarder and owner addresses must be non-zero",
            ));
        }
        if let RewardAsset::Token(token) = asset {
            if token.is_zero() {
                return Err(RewarderError::InvalidConfiguration("reward token is zero"));
            }
        }
        if stake_token.is_zero() {
            return Err(RewarderError::InvalidConfiguration("stake token is zero"));
        }
        if farmer.is_zero() {
            return Err(RewarderError::InvalidConfiguration("farmer is zero"));
        }
        Ok(Self {
            address,
            owner,
            farmer,
            stake_token,
            asset,
            token_per_sec,
            acc_token_per_share: 0,
            last_reward_time: now,
            users: BTreeMap::new(),
        })
    }

    pub fn asset(&self) -> RewardAsset {
        self.asset
    }

    pub fn stake_token(&self) -> Address {
        self.stake_token
    }

    pub fn acc_token_per_share(&self) -> u128 {
        self.acc_token_per_share
    }

    pub fn last_reward_time(&self) -> Timestamp {
        self.last_reward_time
    }

    pub fn user(&self, account: &Address) -> Option<&RewarderUser> {
        self.users.get(account)
    }

    fn staked_supply(&self, ledger: &dyn TokenLedger) -> Amount {
        ledger.balance_of(&self.stake_token, &self.farmer)
    }

    fn projected_acc(&self, ledger: &dyn TokenLedger, now: Timestamp) -> Result<u128, RewarderError> {
        if now <= self.last_reward_time {
            return Ok(self.acc_token_per_share);
        }
        let supply = self.staked_supply(ledger);
        if supply == 0 {
            return Ok(self.acc_token_per_share);
        }
        let elapsed = now - self.last_reward_time;
        let reward = Amount::from(elapsed)
            .checked_mul(self.token_per_sec)
            .ok_or(math::Overflow("rewarder emission"))?;
        Ok(accumulator::accumulate(
            self.acc_token_per_share,
            reward,
            supply,
        )?)
    }

    fn update(&mut self, ledger: &dyn TokenLedger, now: Timestamp) -> Result<(), RewarderError> {
        self.acc_token_per_share = self.projected_acc(ledger, now)?;
        if now > self.last_reward_time {
            self.last_reward_time = now;
        }
        Ok(())
    }

    fn ensure_farmer(&self, hook: &HookContext) -> Result<(), RewarderError> {
        if hook.caller != self.farmer {
            return Err(RewarderError::Unauthorized("only the farmer can call this hook"));
        }
        Ok(())
    }

    fn ensure_owner(&self, caller: &Address) -> Result<(), RewarderError> {
        if *caller != self.owner {
            return Err(RewarderError::Unauthorized("caller is not the rewarder owner"));
        }
        Ok(())
    }

    fn owed(user: &RewarderUser, acc: u128) -> Result<Amount, RewarderError> {
        let pending = accumulator::pending(user.amount, acc, user.reward_debt)?;
        Ok(math::add(pending, user.unpaid_rewards, "rewarder owed")?)
    }
}

impl Rewarder for SimpleRewarderPerSec {
    fn address(&self) -> Address {
        self.address
    }

    fn reward_token(&self) -> Address {
        self.asset.ledger_id()
    }

    fn reward_per_second(&self) -> Amount {
        self.token_per_sec
    }

    fn stake_token(&self) -> Address {
        self.stake_token
    }

    fn on_reward(
        &mut self,
        hook: &HookContext,
        ledger: &mut dyn TokenLedger,
        account: &Address,
        new_amount: Amount,
    ) -> Result<RewardPayout, RewarderError> {
        self.ensure_farmer(hook)?;
        let acc = self.projected_acc(&*ledger, hook.now)?;
        let token = self.reward_token();
        let mut user = self.users.get(account).copied().unwrap_or_default();
        let mut payout = RewardPayout {
            rewarder: self.address,
            token,
            paid: 0,
            unpaid: 0,
        };

        if user.amount > 0 {
            let owed = Self::owed(&user, acc)?;
            let balance = ledger.balance_of(&token, &self.address);
            let paid = owed.min(balance);
            if paid > 0 {
                ledger.transfer(&token, &self.address, account, paid)?;
            }
            user.unpaid_rewards = owed - paid;
            payout.paid = paid;
            payout.unpaid = user.unpaid_rewards;
            if user.unpaid_rewards > 0 {
                warn!(
                    target: "rewarder",
                    "Rewarder {} short by {} for {}",
                    self.address, user.unpaid_rewards, account
                );
            }
        }

        user.amount = new_amount;
        user.reward_debt = accumulator::accrued(new_amount, acc)?;

        self.acc_token_per_share = acc;
        if hook.now > self.last_reward_time {
            self.last_reward_time = hook.now;
        }
        self.users.insert(*account, user);
        debug!(
            target: "rewarder",
            "Rewarder {} settled {}: paid {}, stake now {}",
            self.address, account, payout.paid, new_amount
        );
        Ok(payout)
    }

    fn on_emergency_withdraw(
        &mut self,
        hook: &HookContext,
        ledger: &dyn TokenLedger,
        account: &Address,
    ) -> Result<Amount, RewarderError> {
        self.ensure_farmer(hook)?;
        self.update(ledger, hook.now)?;
        let forfeited = match self.users.remove(account) {
            Some(user) => Self::owed(&user, self.acc_token_per_share).unwrap_or(user.unpaid_rewards),
            None => 0,
        };
        if forfeited > 0 {
            warn!(
                target: "rewarder",
                "{} forfeited {} from rewarder {}",
                account, forfeited, self.address
            );
        }
        Ok(forfeited)
    }

    fn pending_reward(
        &self,
        ledger: &dyn TokenLedger,
        account: &Address,
        now: Timestamp,
    ) -> Result<Amount, RewarderError> {
        let Some(user) = self.users.get(account) else {
            return Ok(0);
        };
        let acc = self.projected_acc(ledger, now)?;
        Self::owed(user, acc)
    }

    fn set_reward_rate(
        &mut self,
        caller: &Address,
        ledger: &dyn TokenLedger,
        now: Timestamp,
        reward_per_second: Amount,
    ) -> Result<Amount, RewarderError> {
        self.ensure_owner(caller)?;
        self.update(ledger, now)?;
        let previous = self.token_per_sec;
        self.token_per_sec = reward_per_second;
        info!(
            target: "rewarder",
            "Rewarder {} rate changed from {} to {} per second",
            self.address, previous, reward_per_second
        );
        Ok(previous)
    }

    fn emergency_withdraw(
        &mut self,
        caller: &Address,
        ledger: &mut dyn TokenLedger,
    ) -> Result<Amount, RewarderError> {
        self.ensure_owner(caller)?;
        let token = self.reward_token();
        let balance = ledger.balance_of(&token, &self.address);
        ledger.transfer(&token, &self.address, &self.owner, balance)?;
        warn!(
            target: "rewarder",
            "Rewarder {} drained {} to owner {}",
            self.address, balance, self.owner
        );
        Ok(balance)
    }

    fn clone_box(&self) -> Box<dyn Rewarder> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_ledger::{InMemoryLedger, TokenMetadata};

    fn addr(label: &str) -> Address {
        Address::derive_labeled("test", label)
    }

    struct Fixture {
        ledger: InMemoryLedger,
        rewarder: SimpleRewarderPerSec,
        farmer: Address,
        lp: Address,
        partner: Address,
    }

    fn setup(funding: Amount) -> Fixture {
        let mut ledger = InMemoryLedger::new();
        let farmer = addr("farmer");
        let lp = addr("lp");
        let partner = addr("partner");
        ledger.register_token(lp, TokenMetadata::new("LP")).unwrap();
        ledger.register_token(partner, TokenMetadata::new("PTN")).unwrap();
        let rewarder = SimpleRewarderPerSec::new(
            addr("rewarder"),
            addr("owner"),
            RewardAsset::Token(partner),
            lp,
            10,
            farmer,
            0,
        )
        .unwrap();
        ledger
            .credit_genesis(&partner, &rewarder.address(), funding)
            .unwrap();
        Fixture {
            ledger,
            rewarder,
            farmer,
            lp,
            partner,
        }
    }

    #[test]
    fn test_hooks_are_farmer_only() {
        let mut fx = setup(1_000);
        let intruder = HookContext {
            caller: addr("alice"),
            now: 1,
        };
        let err = fx
            .rewarder
            .on_reward(&intruder, &mut fx.ledger, &addr("alice"), 5)
            .unwrap_err();
        assert!(matches!(err, RewarderError::Unauthorized(_)));
        assert!(fx
            .rewarder
            .on_emergency_withdraw(&intruder, &fx.ledger, &addr("alice"))
            .is_err());
    }

    #[test]
    fn test_shortfall_is_carried_until_topped_up() {
        let mut fx = setup(30);
        let alice = addr("alice");
        let hook = HookContext {
            caller: fx.farmer,
            now: 0,
        };
        fx.ledger.credit_genesis(&fx.lp, &fx.farmer, 100).unwrap();
        fx.rewarder.on_reward(&hook, &mut fx.ledger, &alice, 100).unwrap();

        let later = HookContext { now: 10, ..hook };
        assert_eq!(fx.rewarder.pending_reward(&fx.ledger, &alice, 10).unwrap(), 100);
        let payout = fx.rewarder.on_reward(&later, &mut fx.ledger, &alice, 100).unwrap();
        assert_eq!((payout.paid, payout.unpaid), (30, 70));
        assert_eq!(fx.ledger.balance_of(&fx.partner, &alice), 30);

        fx.ledger
            .credit_genesis(&fx.partner, &fx.rewarder.address(), 1_000)
            .unwrap();
        let top_up = HookContext { now: 12, ..hook };
        let payout = fx.rewarder.on_reward(&top_up, &mut fx.ledger, &alice, 100).unwrap();
        assert_eq!((payout.paid, payout.unpaid), (90, 0));
        assert_eq!(fx.ledger.balance_of(&fx.partner, &alice), 120);
    }

    #[test]
    fn test_owner_controls_rate_and_drain() {
        let mut fx = setup(500);
        let owner = addr("owner");
        assert!(fx
            .rewarder
            .set_reward_rate(&addr("alice"), &fx.ledger, 5, 20)
            .is_err());
        assert_eq!(
            fx.rewarder.set_reward_rate(&owner, &fx.ledger, 5, 20).unwrap(),
            10
        );
        assert_eq!(fx.rewarder.reward_per_second(), 20);
        assert_eq!(fx.rewarder.last_reward_time(), 5);

        assert!(fx
            .rewarder
            .emergency_withdraw(&addr("alice"), &mut fx.ledger)
            .is_err());
        assert_eq!(
            fx.rewarder.emergency_withdraw(&owner, &mut fx.ledger).unwrap(),
            500
        );
        assert_eq!(fx.ledger.balance_of(&fx.partner, &owner), 500);
    }

    #[test]
    fn test_native_variant_pays_native_balance() {
        let mut ledger = InMemoryLedger::new();
        let farmer = addr("farmer");
        let lp = addr("lp");
        ledger.register_token(lp, TokenMetadata::new("LP")).unwrap();
        ledger
            .register_token(Address::NATIVE, TokenMetadata::new("AVAX"))
            .unwrap();
        let mut rewarder = SimpleRewarderPerSec::new(
            addr("native-rewarder"),
            addr("owner"),
            RewardAsset::Native,
            lp,
            4,
            farmer,
            0,
        )
        .unwrap();
        ledger
            .credit_genesis(&Address::NATIVE, &rewarder.address(), 1_000)
            .unwrap();
        ledger.credit_genesis(&lp, &farmer, 10).unwrap();

        let alice = addr("alice");
        let hook = HookContext { caller: farmer, now: 0 };
        rewarder.on_reward(&hook, &mut ledger, &alice, 10).unwrap();
        rewarder
            .on_reward(&HookContext { now: 5, ..hook }, &mut ledger, &alice, 10)
            .unwrap();
        assert_eq!(rewarder.reward_token(), Address::NATIVE);
        assert_eq!(ledger.balance_of(&Address::NATIVE, &alice), 20);
    }

    #[test]
    fn test_construction_rejects_zero_addresses() {
        let err = SimpleRewarderPerSec::new(
            addr("r"),
            addr("o"),
            RewardAsset::Token(Address::ZERO),
            addr("lp"),
            1,
            addr("farmer"),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, RewarderError::InvalidConfiguration(_)));
        assert!(SimpleRewarderPerSec::new(
            addr("r"),
            addr("o"),
            RewardAsset::Native,
            Address::ZERO,
            1,
            addr("farmer"),
            0,
        )
        .is_err());
    }
}
