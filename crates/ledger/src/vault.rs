//! Moneybags: single-asset staking vault.
//!
//! Stakers deposit the reward token and receive shares. Underlying sent to
//! the vault without minting shares (converted fees) raises the value of
//! every existing share.

use serde::{Deserialize, Serialize};
use tracing::info;
use verdant_types::math;
use verdant_types::{Address, Amount};

use crate::error::VaultError;
use crate::token::{TokenLedger, TokenMetadata};

/// Deposit capability the enricher forwards converted rewards through.
pub trait StakingVault: Send + Sync {
    fn address(&self) -> Address;

    /// Move `amount` of the underlying from `from` into the vault without
    /// minting shares.
    fn deposit_rewards(
        &mut self,
        ledger: &mut dyn TokenLedger,
        from: &Address,
        amount: Amount,
    ) -> Result<(), VaultError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moneybags {
    address: Address,
    underlying: Address,
}

impl Moneybags {
    /// Create the vault and register its share token under `address`.
    pub fn deploy(
        ledger: &mut dyn TokenLedger,
        address: Address,
        underlying: Address,
        share_symbol: &str,
    ) -> Result<Self, VaultError> {
        ledger.register_token(address, TokenMetadata::new(share_symbol).with_minter(address))?;
        Ok(Self {
            address,
            underlying,
        })
    }

    pub fn underlying(&self) -> Address {
        self.underlying
    }

    pub fn total_underlying(&self, ledger: &dyn TokenLedger) -> Amount {
        ledger.balance_of(&self.underlying, &self.address)
    }

    pub fn total_shares(&self, ledger: &dyn TokenLedger) -> Amount {
        ledger.total_supply(&self.address)
    }

    /// Pull `amount` of the underlying from `account` (allowance required)
    /// and mint shares. Returns the shares minted.
    pub fn stake(
        &self,
        ledger: &mut dyn TokenLedger,
        account: &Address,
        amount: Amount,
    ) -> Result<Amount, VaultError> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let total_underlying = self.total_underlying(ledger);
        let total_shares = self.total_shares(ledger);
        let shares = if total_shares == 0 || total_underlying == 0 {
            amount
        } else {
            math::mul_div(amount, total_shares, total_underlying, "vault shares")?
        };

        ledger.transfer_from(&self.underlying, &self.address, account, &self.address, amount)?;
        ledger.mint(&self.address, &self.address, account, shares)?;
        info!(target: "ledger", "{} staked {} for {} shares", account, amount, shares);
        Ok(shares)
    }

    /// Burn `shares` and pay out their share of the underlying.
    pub fn unstake(
        &self,
        ledger: &mut dyn TokenLedger,
        account: &Address,
        shares: Amount,
    ) -> Result<Amount, VaultError> {
        if shares == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let total_shares = self.total_shares(ledger);
        if total_shares == 0 {
            return Err(VaultError::EmptyVault);
        }
        let amount = math::mul_div(
            shares,
            self.total_underlying(ledger),
            total_shares,
            "vault redemption",
        )?;

        ledger.burn(&self.address, &self.address, account, shares)?;
        ledger.transfer(&self.underlying, &self.address, account, amount)?;
        info!(target: "ledger", "{} redeemed {} shares for {}", account, shares, amount);
        Ok(amount)
    }
}

impl StakingVault for Moneybags {
    fn address(&self) -> Address {
        self.address
    }

    fn deposit_rewards(
        &mut self,
        ledger: &mut dyn TokenLedger,
        from: &Address,
        amount: Amount,
    ) -> Result<(), VaultError> {
        ledger.transfer(&self.underlying, from, &self.address, amount)?;
        Ok(())
    }
}
