//! Fungible token bookkeeping.
//!
//! A single ledger tracks every token in the system, keyed by token address:
//! the reward token, the base asset, arbitrary bridge tokens, pair share
//! tokens (keyed by the pair address) and vault shares (keyed by the vault
//! address). The chain's native asset lives under [`Address::NATIVE`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use verdant_types::math;
use verdant_types::{Address, Amount};

use crate::error::LedgerError;

/// Registration data for a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: u8,
    /// Only this account may mint or burn. `None` fixes the supply.
    pub minter: Option<Address>,
    pub max_supply: Option<Amount>,
}

impl TokenMetadata {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            decimals: 18,
            minter: None,
            max_supply: None,
        }
    }

    pub fn with_minter(mut self, minter: Address) -> Self {
        self.minter = Some(minter);
        self
    }

    pub fn with_max_supply(mut self, cap: Amount) -> Self {
        self.max_supply = Some(cap);
        self
    }
}

/// Interface for token operations used by the farm, venue, vault and enricher.
pub trait TokenLedger: Send + Sync {
    /// Register a new token at `token`.
    fn register_token(&mut self, token: Address, metadata: TokenMetadata)
        -> Result<(), LedgerError>;

    fn is_registered(&self, token: &Address) -> bool;

    fn symbol(&self, token: &Address) -> Option<String>;

    fn balance_of(&self, token: &Address, owner: &Address) -> Amount;

    fn total_supply(&self, token: &Address) -> Amount;

    fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> Amount;

    fn approve(
        &mut self,
        token: &Address,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Move `amount` from `from` to `to`, spending `spender`'s allowance.
    fn transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    fn mint(
        &mut self,
        token: &Address,
        minter: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    fn burn(
        &mut self,
        token: &Address,
        minter: &Address,
        from: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Hand the mint authority to `new_minter`. Only the current minter may.
    fn set_minter(
        &mut self,
        token: &Address,
        caller: &Address,
        new_minter: Option<Address>,
    ) -> Result<(), LedgerError>;

    /// Credit a balance outside the minter rules. Used to seed genesis state.
    fn credit_genesis(
        &mut self,
        token: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;
}

#[derive(Debug, Clone, Default)]
struct TokenState {
    metadata: TokenMetadata,
    total_supply: Amount,
    balances: BTreeMap<Address, Amount>,
    allowances: BTreeMap<(Address, Address), Amount>,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self::new("")
    }
}

impl TokenState {
    fn balance(&self, owner: &Address) -> Amount {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    fn debit(&mut self, token: &Address, owner: &Address, amount: Amount) -> Result<(), LedgerError> {
        let available = self.balance(owner);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                token: *token,
                owner: *owner,
                requested: amount,
                available,
            });
        }
        let remaining = available - amount;
        if remaining == 0 {
            self.balances.remove(owner);
        } else {
            self.balances.insert(*owner, remaining);
        }
        Ok(())
    }

    fn credit(&mut self, owner: &Address, amount: Amount) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let updated = math::add(self.balance(owner), amount, "token balance")?;
        self.balances.insert(*owner, updated);
        Ok(())
    }

    fn ensure_minter(&self, token: &Address, caller: &Address) -> Result<(), LedgerError> {
        if self.metadata.minter != Some(*caller) {
            return Err(LedgerError::NotMinter {
                token: *token,
                caller: *caller,
            });
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// In-memory implementation (runtime state and tests)
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    tokens: BTreeMap<Address, TokenState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn token(&self, token: &Address) -> Result<&TokenState, LedgerError> {
        self.tokens
            .get(token)
            .ok_or(LedgerError::UnknownToken(*token))
    }

    fn token_mut(&mut self, token: &Address) -> Result<&mut TokenState, LedgerError> {
        self.tokens
            .get_mut(token)
            .ok_or(LedgerError::UnknownToken(*token))
    }

    /// Registered token addresses in address order.
    pub fn tokens(&self) -> impl Iterator<Item = &Address> {
        self.tokens.keys()
    }

    /// Non-zero holders of `token`.
    pub fn holders(&self, token: &Address) -> Vec<(Address, Amount)> {
        self.tokens
            .get(token)
            .map(|state| state.balances.iter().map(|(k, v)| (*k, *v)).collect())
            .unwrap_or_default()
    }

    pub fn metadata(&self, token: &Address) -> Option<&TokenMetadata> {
        self.tokens.get(token).map(|state| &state.metadata)
    }
}

impl TokenLedger for InMemoryLedger {
    fn register_token(
        &mut self,
        token: Address,
        metadata: TokenMetadata,
    ) -> Result<(), LedgerError> {
        if token.is_zero() {
            return Err(LedgerError::InvalidToken("token address must be non-zero"));
        }
        if metadata.symbol.trim().is_empty() {
            return Err(LedgerError::InvalidToken("symbol must not be empty"));
        }
        if self.tokens.contains_key(&token) {
            return Err(LedgerError::TokenExists(token));
        }
        debug!(target: "ledger", "Registered token {} at {}", metadata.symbol, token);
        self.tokens.insert(
            token,
            TokenState {
                metadata,
                ..TokenState::default()
            },
        );
        Ok(())
    }

    fn is_registered(&self, token: &Address) -> bool {
        self.tokens.contains_key(token)
    }

    fn symbol(&self, token: &Address) -> Option<String> {
        self.tokens.get(token).map(|state| state.metadata.symbol.clone())
    }

    fn balance_of(&self, token: &Address, owner: &Address) -> Amount {
        self.tokens
            .get(token)
            .map(|state| state.balance(owner))
            .unwrap_or(0)
    }

    fn total_supply(&self, token: &Address) -> Amount {
        self.tokens
            .get(token)
            .map(|state| state.total_supply)
            .unwrap_or(0)
    }

    fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> Amount {
        self.tokens
            .get(token)
            .and_then(|state| state.allowances.get(&(*owner, *spender)).copied())
            .unwrap_or(0)
    }

    fn approve(
        &mut self,
        token: &Address,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let state = self.token_mut(token)?;
        if amount == 0 {
            state.allowances.remove(&(*owner, *spender));
        } else {
            state.allowances.insert((*owner, *spender), amount);
        }
        Ok(())
    }

    fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let state = self.token_mut(token)?;
        if amount == 0 {
            return Ok(());
        }
        state.debit(token, from, amount)?;
        state.credit(to, amount)
    }

    fn transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let state = self.token_mut(token)?;
        if amount == 0 {
            return Ok(());
        }
        let key = (*from, *spender);
        let available = state.allowances.get(&key).copied().unwrap_or(0);
        if available < amount {
            return Err(LedgerError::InsufficientAllowance {
                token: *token,
                owner: *from,
                spender: *spender,
                requested: amount,
                available,
            });
        }
        state.debit(token, from, amount)?;
        state.credit(to, amount)?;
        if available != Amount::MAX {
            state.allowances.insert(key, available - amount);
        }
        Ok(())
    }

    fn mint(
        &mut self,
        token: &Address,
        minter: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let state = self.token_mut(token)?;
        state.ensure_minter(token, minter)?;
        let supply = math::add(state.total_supply, amount, "total supply")?;
        if let Some(cap) = state.metadata.max_supply {
            if supply > cap {
                return Err(LedgerError::SupplyCapExceeded {
                    token: *token,
                    cap,
                    requested: amount,
                });
            }
        }
        state.credit(to, amount)?;
        state.total_supply = supply;
        Ok(())
    }

    fn burn(
        &mut self,
        token: &Address,
        minter: &Address,
        from: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let state = self.token_mut(token)?;
        state.ensure_minter(token, minter)?;
        state.debit(token, from, amount)?;
        state.total_supply = math::sub(state.total_supply, amount, "total supply")?;
        Ok(())
    }

    fn set_minter(
        &mut self,
        token: &Address,
        caller: &Address,
        new_minter: Option<Address>,
    ) -> Result<(), LedgerError> {
        let state = self.token_mut(token)?;
        state.ensure_minter(token, caller)?;
        state.metadata.minter = new_minter;
        Ok(())
    }

    fn credit_genesis(
        &mut self,
        token: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let state = self.token_mut(token)?;
        let supply = math::add(state.total_supply, amount, "total supply")?;
        state.credit(to, amount)?;
        state.total_supply = supply;
        Ok(())
    }
}

impl InMemoryLedger {
    /// Symbol lookup that fails for unknown tokens.
    pub fn require_symbol(&self, token: &Address) -> Result<&str, LedgerError> {
        self.token(token).map(|state| state.metadata.symbol.as_str())
    }
}
