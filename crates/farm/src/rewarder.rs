//! Secondary reward modules.
//!
//! A pool may reference one rewarder by address. The Farmer calls its hooks
//! on every position change; the rewarder keeps its own accounting and pays
//! its own token. Rewarders live in a [`RewarderRegistry`] owned by the
//! host, never inside a pool.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use verdant_ledger::TokenLedger;
use verdant_types::{Address, Amount, Timestamp};

use crate::error::RewarderError;

/// Who is calling a hook and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookContext {
    pub caller: Address,
    pub now: Timestamp,
}

/// Result of settling one account against a rewarder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPayout {
    pub rewarder: Address,
    pub token: Address,
    pub paid: Amount,
    /// Owed but not paid because the rewarder ran dry.
    pub unpaid: Amount,
}

pub trait Rewarder: fmt::Debug + Send + Sync {
    fn address(&self) -> Address;

    /// Ledger id of the token this rewarder pays.
    fn reward_token(&self) -> Address;

    fn reward_per_second(&self) -> Amount;

    /// The Farmer pool token whose staked balance this rewarder measures.
    fn stake_token(&self) -> Address;

    /// Settle `account` against its previous stake and record `new_amount`
    /// as its current stake.
    fn on_reward(
        &mut self,
        hook: &HookContext,
        ledger: &mut dyn TokenLedger,
        account: &Address,
        new_amount: Amount,
    ) -> Result<RewardPayout, RewarderError>;

    /// Zero `account` without paying anything. Returns the forfeited amount.
    fn on_emergency_withdraw(
        &mut self,
        hook: &HookContext,
        ledger: &dyn TokenLedger,
        account: &Address,
    ) -> Result<Amount, RewarderError>;

    fn pending_reward(
        &self,
        ledger: &dyn TokenLedger,
        account: &Address,
        now: Timestamp,
    ) -> Result<Amount, RewarderError>;

    /// Owner-only. Returns the previous rate.
    fn set_reward_rate(
        &mut self,
        caller: &Address,
        ledger: &dyn TokenLedger,
        now: Timestamp,
        reward_per_second: Amount,
    ) -> Result<Amount, RewarderError>;

    /// Owner-only. Sends the whole reward balance to the owner.
    fn emergency_withdraw(
        &mut self,
        caller: &Address,
        ledger: &mut dyn TokenLedger,
    ) -> Result<Amount, RewarderError>;

    fn clone_box(&self) -> Box<dyn Rewarder>;
}

impl Clone for Box<dyn Rewarder> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Rewarders by address.
#[derive(Debug, Clone, Default)]
pub struct RewarderRegistry {
    rewarders: BTreeMap<Address, Box<dyn Rewarder>>,
}

impl RewarderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, rewarder: Box<dyn Rewarder>) -> Result<Address, RewarderError> {
        let address = rewarder.address();
        if address.is_zero() {
            return Err(RewarderError::InvalidConfiguration("rewarder address is zero"));
        }
        if self.rewarders.contains_key(&address) {
            return Err(RewarderError::InvalidConfiguration(
                "rewarder address already registered",
            ));
        }
        self.rewarders.insert(address, rewarder);
        Ok(address)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.rewarders.contains_key(address)
    }

    pub fn get(&self, address: &Address) -> Option<&dyn Rewarder> {
        self.rewarders.get(address).map(|r| r.as_ref())
    }

    pub fn get_mut(&mut self, address: &Address) -> Option<&mut (dyn Rewarder + 'static)> {
        self.rewarders.get_mut(address).map(|r| r.as_mut())
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.rewarders.keys()
    }

    pub fn len(&self) -> usize {
        self.rewarders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewarders.is_empty()
    }
}
