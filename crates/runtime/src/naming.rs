//! Deterministic addresses for the names used in configs and scenarios.
//!
//! Tokens, contracts, rewarders and plain accounts live in separate
//! derivation domains, so `"alice"` the account and `"alice"` the rewarder
//! never collide.

use verdant_types::Address;

use crate::error::Result;

pub const FARMER: &str = "farmer";
pub const ENRICHER: &str = "enricher";
pub const MONEYBAGS: &str = "moneybags";

/// Symbol that selects the chain's native asset.
pub const NATIVE_ASSET: &str = "native";

/// Prefix that selects a rewarder by name, as in `rewarder:partner`.
pub const REWARDER_PREFIX: &str = "rewarder:";

pub fn token_address(symbol: &str) -> Address {
    if symbol == NATIVE_ASSET {
        return Address::NATIVE;
    }
    Address::derive_labeled("token", symbol)
}

pub fn contract_address(name: &str) -> Address {
    Address::derive_labeled("contract", name)
}

pub fn rewarder_address(name: &str) -> Address {
    Address::derive_labeled("rewarder", name)
}

pub fn account_address(label: &str) -> Address {
    Address::derive_labeled("account", label)
}

/// Resolve an account reference: a `0x` address, one of the contract names,
/// a `rewarder:` name, or any other label.
pub fn resolve_account(name: &str) -> Result<Address> {
    if name.starts_with("0x") {
        return Ok(name.parse()?);
    }
    if let Some(rewarder) = name.strip_prefix(REWARDER_PREFIX) {
        return Ok(rewarder_address(rewarder));
    }
    Ok(match name {
        FARMER | ENRICHER | MONEYBAGS => contract_address(name),
        label => account_address(label),
    })
}

/// A stake reference: a token symbol, or a pair written `A-B`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakeRef<'a> {
    Token(&'a str),
    Pair(&'a str, &'a str),
}

impl<'a> StakeRef<'a> {
    pub fn parse(reference: &'a str) -> Self {
        match reference.split_once('-') {
            Some((a, b)) => StakeRef::Pair(a, b),
            None => StakeRef::Token(reference),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domains_are_separate() {
        assert_ne!(account_address("alice"), rewarder_address("alice"));
        assert_ne!(contract_address(FARMER), account_address(FARMER));
        assert_eq!(resolve_account(FARMER).unwrap(), contract_address(FARMER));
        assert_eq!(
            resolve_account("rewarder:partner").unwrap(),
            rewarder_address("partner")
        );
        assert_eq!(token_address(NATIVE_ASSET), Address::NATIVE);
    }

    #[test]
    fn test_hex_accounts_pass_through() {
        let alice = account_address("alice");
        assert_eq!(resolve_account(&alice.to_string()).unwrap(), alice);
        assert!(resolve_account("0x1234").is_err());
    }

    #[test]
    fn test_stake_refs() {
        assert_eq!(StakeRef::parse("GTR"), StakeRef::Token("GTR"));
        assert_eq!(StakeRef::parse("DAI-WAVAX"), StakeRef::Pair("DAI", "WAVAX"));
    }
}
