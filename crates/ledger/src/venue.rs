//! Constant-product swap pairs.
//!
//! Each pair holds reserves of two tokens sorted by address and issues a
//! share token registered in the [`TokenLedger`] under the pair's own
//! address. Swaps charge a 0.3% input fee.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use verdant_types::math;
use verdant_types::{Address, Amount};

use crate::error::VenueError;
use crate::token::{TokenLedger, TokenMetadata};

/// Share tokens locked forever at the zero address on first mint.
pub const MINIMUM_LIQUIDITY: Amount = 1_000;
/// Fraction of the input that reaches the curve, out of [`SWAP_FEE_DENOMINATOR`].
pub const SWAP_FEE_NUMERATOR: Amount = 997;
pub const SWAP_FEE_DENOMINATOR: Amount = 1_000;

/// Output amount for an exact input against the given reserves.
pub fn get_amount_out(
    amount_in: Amount,
    reserve_in: Amount,
    reserve_out: Amount,
) -> Result<Amount, VenueError> {
    if amount_in == 0 {
        return Err(VenueError::InsufficientInputAmount);
    }
    if reserve_in == 0 || reserve_out == 0 {
        return Err(VenueError::InsufficientLiquidity("empty reserves"));
    }
    let amount_in_with_fee = amount_in
        .checked_mul(SWAP_FEE_NUMERATOR)
        .ok_or(math::Overflow("swap input"))?;
    let denominator = reserve_in
        .checked_mul(SWAP_FEE_DENOMINATOR)
        .and_then(|scaled| scaled.checked_add(amount_in_with_fee))
        .ok_or(math::Overflow("swap denominator"))?;
    Ok(math::mul_div(
        amount_in_with_fee,
        reserve_out,
        denominator,
        "swap output",
    )?)
}

/// Order two tokens the way pairs store them.
pub fn sort_tokens(a: Address, b: Address) -> (Address, Address) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Deterministic pair address for two tokens, independent of argument order.
pub fn pair_address(a: Address, b: Address) -> Address {
    let (token0, token1) = sort_tokens(a, b);
    Address::derive("pair", &[token0.as_bytes(), token1.as_bytes()])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: Amount,
    pub reserve1: Amount,
}

impl Pair {
    fn reserves_for(&self, token_in: &Address) -> (Amount, Amount) {
        if *token_in == self.token0 {
            (self.reserve0, self.reserve1)
        } else {
            (self.reserve1, self.reserve0)
        }
    }
}

/// Swap capability used by the enricher.
pub trait SwapVenue: Send + Sync {
    /// Pair address for two tokens, in either order.
    fn pair_for(&self, token_a: &Address, token_b: &Address) -> Option<Address>;

    /// `(token0, token1)` of a pair.
    fn pair_tokens(&self, pair: &Address) -> Option<(Address, Address)>;

    /// Burn the share tokens held by the pair itself and send the
    /// underlying tokens to `to`. Returns `(amount0, amount1)` in pair order.
    fn burn(
        &mut self,
        ledger: &mut dyn TokenLedger,
        pair: &Address,
        to: &Address,
    ) -> Result<(Amount, Amount), VenueError>;

    /// Swap an exact `amount_in` of `token_in` from `payer` for `token_out`
    /// delivered to `recipient`.
    fn swap_exact_in(
        &mut self,
        ledger: &mut dyn TokenLedger,
        token_in: &Address,
        token_out: &Address,
        amount_in: Amount,
        payer: &Address,
        recipient: &Address,
    ) -> Result<Amount, VenueError>;
}

#[derive(Debug, Clone, Default)]
pub struct PairFactory {
    pairs: BTreeMap<Address, Pair>,
}

impl PairFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pair(&self, pair: &Address) -> Option<&Pair> {
        self.pairs.get(pair)
    }

    pub fn pairs(&self) -> impl Iterator<Item = &Pair> {
        self.pairs.values()
    }

    fn pair_mut(&mut self, pair: &Address) -> Result<&mut Pair, VenueError> {
        match self.pairs.get_mut(pair) {
            Some(found) => Ok(found),
            None => Err(VenueError::UnknownPair(*pair)),
        }
    }

    /// Create an empty pair and register its share token.
    pub fn create_pair(
        &mut self,
        ledger: &mut dyn TokenLedger,
        token_a: Address,
        token_b: Address,
    ) -> Result<Address, VenueError> {
        if token_a == token_b || token_a.is_zero() || token_b.is_zero() {
            return Err(VenueError::IdenticalTokens);
        }
        let (token0, token1) = sort_tokens(token_a, token_b);
        let address = pair_address(token0, token1);
        if self.pairs.contains_key(&address) {
            return Err(VenueError::PairExists(token0, token1));
        }

        let symbol0 = ledger
            .symbol(&token0)
            .ok_or(crate::LedgerError::UnknownToken(token0))?;
        let symbol1 = ledger
            .symbol(&token1)
            .ok_or(crate::LedgerError::UnknownToken(token1))?;
        ledger.register_token(
            address,
            TokenMetadata::new(format!("{symbol0}-{symbol1} LP")).with_minter(address),
        )?;

        self.pairs.insert(
            address,
            Pair {
                address,
                token0,
                token1,
                reserve0: 0,
                reserve1: 0,
            },
        );
        debug!(target: "ledger", "Created pair {} for {}/{}", address, symbol0, symbol1);
        Ok(address)
    }

    /// Move both amounts from `provider` into the pair and mint shares to
    /// `provider`. Amounts are taken as given, without ratio optimisation.
    pub fn add_liquidity(
        &mut self,
        ledger: &mut dyn TokenLedger,
        provider: &Address,
        token_a: &Address,
        token_b: &Address,
        amount_a: Amount,
        amount_b: Amount,
    ) -> Result<Amount, VenueError> {
        let address = self
            .pair_for(token_a, token_b)
            .ok_or(VenueError::PairNotFound(*token_a, *token_b))?;
        let supply = ledger.total_supply(&address);
        let pair = self.pair_mut(&address)?;
        let (amount0, amount1) = if *token_a == pair.token0 {
            (amount_a, amount_b)
        } else {
            (amount_b, amount_a)
        };

        let liquidity = if supply == 0 {
            let root = math::sqrt_product(amount0, amount1, "initial liquidity")?;
            root.checked_sub(MINIMUM_LIQUIDITY)
                .filter(|minted| *minted > 0)
                .ok_or(VenueError::InsufficientLiquidity("initial deposit too small"))?
        } else {
            let by0 = math::mul_div(amount0, supply, pair.reserve0, "liquidity")?;
            let by1 = math::mul_div(amount1, supply, pair.reserve1, "liquidity")?;
            by0.min(by1)
        };
        if liquidity == 0 {
            return Err(VenueError::InsufficientLiquidity("nothing minted"));
        }

        let (token0, token1) = (pair.token0, pair.token1);
        ledger.transfer(&token0, provider, &address, amount0)?;
        ledger.transfer(&token1, provider, &address, amount1)?;
        if supply == 0 {
            ledger.mint(&address, &address, &Address::ZERO, MINIMUM_LIQUIDITY)?;
        }
        ledger.mint(&address, &address, provider, liquidity)?;

        let pair = self.pair_mut(&address)?;
        pair.reserve0 = math::add(pair.reserve0, amount0, "reserve0")?;
        pair.reserve1 = math::add(pair.reserve1, amount1, "reserve1")?;
        Ok(liquidity)
    }

    /// Quote without moving anything.
    pub fn quote_exact_in(
        &self,
        token_in: &Address,
        token_out: &Address,
        amount_in: Amount,
    ) -> Result<Amount, VenueError> {
        let address = self
            .pair_for(token_in, token_out)
            .ok_or(VenueError::PairNotFound(*token_in, *token_out))?;
        let pair = self
            .pairs
            .get(&address)
            .ok_or(VenueError::UnknownPair(address))?;
        let (reserve_in, reserve_out) = pair.reserves_for(token_in);
        get_amount_out(amount_in, reserve_in, reserve_out)
    }
}

impl SwapVenue for PairFactory {
    fn pair_for(&self, token_a: &Address, token_b: &Address) -> Option<Address> {
        let address = pair_address(*token_a, *token_b);
        self.pairs.contains_key(&address).then_some(address)
    }

    fn pair_tokens(&self, pair: &Address) -> Option<(Address, Address)> {
        self.pairs.get(pair).map(|p| (p.token0, p.token1))
    }

    fn burn(
        &mut self,
        ledger: &mut dyn TokenLedger,
        pair: &Address,
        to: &Address,
    ) -> Result<(Amount, Amount), VenueError> {
        let liquidity = ledger.balance_of(pair, pair);
        let supply = ledger.total_supply(pair);
        let state = self.pair_mut(pair)?;
        let amount0 = math::mul_div(liquidity, state.reserve0, supply, "burn amount0")?;
        let amount1 = math::mul_div(liquidity, state.reserve1, supply, "burn amount1")?;
        if amount0 == 0 || amount1 == 0 {
            return Err(VenueError::InsufficientLiquidity("burned nothing"));
        }

        let (token0, token1) = (state.token0, state.token1);
        ledger.burn(pair, pair, pair, liquidity)?;
        ledger.transfer(&token0, pair, to, amount0)?;
        ledger.transfer(&token1, pair, to, amount1)?;

        let state = self.pair_mut(pair)?;
        state.reserve0 = math::sub(state.reserve0, amount0, "reserve0")?;
        state.reserve1 = math::sub(state.reserve1, amount1, "reserve1")?;
        debug!(target: "ledger", "Burned {} of {} for {}/{}", liquidity, pair, amount0, amount1);
        Ok((amount0, amount1))
    }

    fn swap_exact_in(
        &mut self,
        ledger: &mut dyn TokenLedger,
        token_in: &Address,
        token_out: &Address,
        amount_in: Amount,
        payer: &Address,
        recipient: &Address,
    ) -> Result<Amount, VenueError> {
        let address = self
            .pair_for(token_in, token_out)
            .ok_or(VenueError::PairNotFound(*token_in, *token_out))?;
        let pair = self.pair_mut(&address)?;
        let (reserve_in, reserve_out) = pair.reserves_for(token_in);
        let amount_out = get_amount_out(amount_in, reserve_in, reserve_out)?;

        ledger.transfer(token_in, payer, &address, amount_in)?;
        ledger.transfer(token_out, &address, recipient, amount_out)?;

        let pair = self.pair_mut(&address)?;
        let reserve_in = math::add(reserve_in, amount_in, "reserve in")?;
        let reserve_out = math::sub(reserve_out, amount_out, "reserve out")?;
        if *token_in == pair.token0 {
            pair.reserve0 = reserve_in;
            pair.reserve1 = reserve_out;
        } else {
            pair.reserve1 = reserve_in;
            pair.reserve0 = reserve_out;
        }
        debug!(
            target: "ledger",
            "Swapped {} {} for {} {} via {}",
            amount_in, token_in, amount_out, token_out, address
        );
        Ok(amount_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::InMemoryLedger;

    const E18: Amount = 1_000_000_000_000_000_000;

    fn setup() -> (InMemoryLedger, PairFactory, Address, Address, Address) {
        let mut ledger = InMemoryLedger::new();
        let lp = Address::derive_labeled("test", "provider");
        let a = Address::derive_labeled("token", "AAA");
        let b = Address::derive_labeled("token", "BBB");
        ledger.register_token(a, TokenMetadata::new("AAA")).unwrap();
        ledger.register_token(b, TokenMetadata::new("BBB")).unwrap();
        ledger.credit_genesis(&a, &lp, 100 * E18).unwrap();
        ledger.credit_genesis(&b, &lp, 100 * E18).unwrap();
        (ledger, PairFactory::new(), lp, a, b)
    }

    #[test]
    fn test_amount_out_formula() {
        // 1e18 into a 10e18/10e18 pool.
        let out = get_amount_out(E18, 10 * E18, 10 * E18).unwrap();
        assert_eq!(out, 906_610_893_880_149_131);
        assert!(get_amount_out(0, 1, 1).is_err());
        assert!(get_amount_out(1, 0, 1).is_err());
    }

    #[test]
    fn test_first_mint_locks_minimum_liquidity() {
        let (mut ledger, mut factory, lp, a, b) = setup();
        let pair = factory.create_pair(&mut ledger, a, b).unwrap();
        let minted = factory
            .add_liquidity(&mut ledger, &lp, &a, &b, 10 * E18, 10 * E18)
            .unwrap();
        assert_eq!(minted, 10 * E18 - MINIMUM_LIQUIDITY);
        assert_eq!(ledger.balance_of(&pair, &Address::ZERO), MINIMUM_LIQUIDITY);
        assert_eq!(ledger.total_supply(&pair), 10 * E18);
        assert_eq!(factory.pair_for(&b, &a), Some(pair));
        assert!(matches!(
            factory.create_pair(&mut ledger, b, a),
            Err(VenueError::PairExists(..))
        ));
    }

    #[test]
    fn test_burn_is_pro_rata() {
        let (mut ledger, mut factory, lp, a, b) = setup();
        let pair = factory.create_pair(&mut ledger, a, b).unwrap();
        factory
            .add_liquidity(&mut ledger, &lp, &a, &b, 10 * E18, 10 * E18)
            .unwrap();
        ledger.transfer(&pair, &lp, &pair, E18).unwrap();

        let (amount0, amount1) = factory.burn(&mut ledger, &pair, &lp).unwrap();
        assert_eq!((amount0, amount1), (E18, E18));
        assert_eq!(ledger.total_supply(&pair), 9 * E18);
        assert_eq!(factory.pair(&pair).unwrap().reserve0, 9 * E18);
    }

    #[test]
    fn test_swap_moves_reserves() {
        let (mut ledger, mut factory, lp, a, b) = setup();
        let pair = factory.create_pair(&mut ledger, a, b).unwrap();
        factory
            .add_liquidity(&mut ledger, &lp, &a, &b, 10 * E18, 10 * E18)
            .unwrap();
        let quoted = factory.quote_exact_in(&a, &b, E18).unwrap();
        let before = ledger.balance_of(&b, &lp);
        let out = factory
            .swap_exact_in(&mut ledger, &a, &b, E18, &lp, &lp)
            .unwrap();
        assert_eq!(out, quoted);
        assert_eq!(ledger.balance_of(&b, &lp), before + out);
        assert_eq!(ledger.balance_of(&a, &pair), 11 * E18);
        assert!(factory
            .swap_exact_in(&mut ledger, &a, &Address::NATIVE, 1, &lp, &lp)
            .is_err());
    }
}
