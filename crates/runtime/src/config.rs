//! Deployment configuration.
//!
//! A deployment is described in TOML and may be overridden from the
//! environment with `VERDANT_` variables, using `__` between nested keys
//! (`VERDANT_FARM__REWARD_PER_SECOND=5e18`). Accounts are written as labels
//! or `0x` addresses; see [`crate::naming`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;
use verdant_farm::FundSplits;
use verdant_types::{Amount, Timestamp};

use crate::error::{Result, RuntimeError};
use crate::naming::{resolve_account, StakeRef, NATIVE_ASSET};

pub const ENV_PREFIX: &str = "VERDANT";

// =============================================================================
// AMOUNTS
// =============================================================================

/// Token amount in base units.
///
/// TOML integers stop at `i64`, so amounts may also be strings: plain
/// digits with optional `_` separators, or a mantissa and a power of ten
/// such as `"25e18"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawAmount", into = "String")]
pub struct TokenAmount(pub Amount);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Int(u64),
    Text(String),
}

impl TryFrom<RawAmount> for TokenAmount {
    type Error = RuntimeError;

    fn try_from(raw: RawAmount) -> Result<Self> {
        match raw {
            RawAmount::Int(value) => Ok(TokenAmount(Amount::from(value))),
            RawAmount::Text(text) => parse_amount(&text).map(TokenAmount),
        }
    }
}

impl From<TokenAmount> for String {
    fn from(amount: TokenAmount) -> Self {
        amount.0.to_string()
    }
}

impl From<Amount> for TokenAmount {
    fn from(amount: Amount) -> Self {
        TokenAmount(amount)
    }
}

pub fn parse_amount(text: &str) -> Result<Amount> {
    let invalid = || RuntimeError::InvalidAmount(text.to_string());
    let cleaned: String = text.trim().chars().filter(|c| *c != '_').collect();
    let (mantissa, exponent) = match cleaned.split_once(|c: char| c == 'e' || c == 'E') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<u32>().map_err(|_| invalid())?),
        None => (cleaned.as_str(), 0),
    };
    if mantissa.is_empty() || !mantissa.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let base: Amount = mantissa.parse().map_err(|_| invalid())?;
    10u128
        .checked_pow(exponent)
        .and_then(|scale| base.checked_mul(scale))
        .ok_or_else(invalid)
}

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTokenConfig {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_supply: Option<TokenAmount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    pub symbol: String,
}

/// A token and its genesis balances. Listing the reward token or the base
/// asset here only seeds balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    #[serde(default)]
    pub balances: BTreeMap<String, TokenAmount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmSection {
    pub owner: String,
    pub dev: String,
    pub treasury: String,
    pub investor: String,
    pub reward_per_second: TokenAmount,
    pub start_time: Timestamp,
    pub dev_percent: u16,
    pub treasury_percent: u16,
    pub investor_percent: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnricherSection {
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSection {
    pub share_symbol: String,
}

impl Default for VaultSection {
    fn default() -> Self {
        Self {
            share_symbol: "xGTR".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairConfig {
    pub token_a: String,
    pub token_b: String,
    pub amount_a: TokenAmount,
    pub amount_b: TokenAmount,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Token symbol, or `A-B` for the pair's share token.
    pub stake: String,
    pub alloc_point: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewarder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewarderConfig {
    pub name: String,
    pub owner: String,
    /// Token symbol, or `native`.
    pub asset: String,
    pub stake: String,
    pub reward_per_second: TokenAmount,
    #[serde(default)]
    pub funding: TokenAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default)]
    pub genesis_time: Timestamp,
    pub reward_token: RewardTokenConfig,
    pub base_asset: AssetConfig,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
    pub farm: FarmSection,
    pub enricher: EnricherSection,
    #[serde(default)]
    pub vault: VaultSection,
    #[serde(default)]
    pub pairs: Vec<PairConfig>,
    #[serde(default)]
    pub rewarders: Vec<RewarderConfig>,
    #[serde(default)]
    pub pools: Vec<PoolConfig>,
    #[serde(default)]
    pub bridges: Vec<BridgeConfig>,
}

// =============================================================================
// LOADING AND VALIDATION
// =============================================================================

fn invalid(message: impl Into<String>) -> RuntimeError {
    RuntimeError::InvalidConfig(message.into())
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl DeploymentConfig {
    /// Load from a TOML file layered with `VERDANT_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        let config: DeploymentConfig = settings.try_deserialize()?;
        config.validate()?;
        info!(target: "runtime", "Loaded deployment config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?;
        let config: DeploymentConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| invalid(e.to_string()))
    }

    /// Check every cross reference before genesis runs.
    pub fn validate(&self) -> Result<()> {
        FundSplits::new(
            self.farm.dev_percent,
            self.farm.treasury_percent,
            self.farm.investor_percent,
        )
        .map_err(|e| invalid(e.to_string()))?;
        for account in [
            &self.farm.owner,
            &self.farm.dev,
            &self.farm.treasury,
            &self.farm.investor,
            &self.enricher.owner,
        ] {
            resolve_account(account)?;
        }

        let reward = self.reward_token.symbol.as_str();
        let base = self.base_asset.symbol.as_str();
        if reward == base {
            return Err(invalid("reward token and base asset must differ"));
        }

        let mut symbols: BTreeSet<&str> = BTreeSet::new();
        let mut declared: BTreeSet<&str> = BTreeSet::new();
        for symbol in [reward, base, self.vault.share_symbol.as_str()] {
            check_symbol(symbol)?;
            if !symbols.insert(symbol) {
                return Err(invalid(format!("symbol {symbol} is used twice")));
            }
        }
        for token in &self.tokens {
            check_symbol(&token.symbol)?;
            if !declared.insert(token.symbol.as_str()) {
                return Err(invalid(format!("token {} is listed twice", token.symbol)));
            }
            symbols.insert(token.symbol.as_str());
            for holder in token.balances.keys() {
                resolve_account(holder)?;
            }
        }

        let known = |symbol: &str| -> Result<()> {
            if symbols.contains(symbol) {
                Ok(())
            } else {
                Err(RuntimeError::UnknownSymbol(symbol.to_string()))
            }
        };

        let mut pairs = BTreeSet::new();
        for pair in &self.pairs {
            known(&pair.token_a)?;
            known(&pair.token_b)?;
            if pair.token_a == pair.token_b {
                return Err(invalid(format!("pair {0}-{0} uses one token twice", pair.token_a)));
            }
            if !pairs.insert(pair_key(&pair.token_a, &pair.token_b)) {
                return Err(invalid(format!(
                    "pair {}-{} is listed twice",
                    pair.token_a, pair.token_b
                )));
            }
            resolve_account(&pair.provider)?;
        }

        let stake_known = |reference: &str| -> Result<()> {
            match StakeRef::parse(reference) {
                StakeRef::Token(symbol) => known(symbol),
                StakeRef::Pair(a, b) if pairs.contains(&pair_key(a, b)) => Ok(()),
                StakeRef::Pair(..) => Err(invalid(format!("stake {reference} is not a listed pair"))),
            }
        };

        let same_stake = |a: &str, b: &str| match (StakeRef::parse(a), StakeRef::parse(b)) {
            (StakeRef::Pair(a0, a1), StakeRef::Pair(b0, b1)) => pair_key(a0, a1) == pair_key(b0, b1),
            _ => a == b,
        };

        let mut rewarders = BTreeMap::new();
        for rewarder in &self.rewarders {
            if rewarder.name.is_empty()
                || rewarders
                    .insert(rewarder.name.as_str(), rewarder.stake.as_str())
                    .is_some()
            {
                return Err(invalid(format!(
                    "rewarder name {:?} is empty or repeated",
                    rewarder.name
                )));
            }
            if rewarder.asset != NATIVE_ASSET {
                known(&rewarder.asset)?;
            }
            stake_known(&rewarder.stake)?;
            resolve_account(&rewarder.owner)?;
        }

        let mut staked = BTreeSet::new();
        for pool in &self.pools {
            stake_known(&pool.stake)?;
            if !staked.insert(pool.stake.as_str()) {
                return Err(invalid(format!("pool for {} is listed twice", pool.stake)));
            }
            if let Some(name) = &pool.rewarder {
                let measures = rewarders
                    .get(name.as_str())
                    .ok_or_else(|| RuntimeError::UnknownRewarder(name.clone()))?;
                if !same_stake(measures, &pool.stake) {
                    return Err(invalid(format!(
                        "rewarder {name} measures {measures} but pool stakes {}",
                        pool.stake
                    )));
                }
            }
        }

        for bridge in &self.bridges {
            known(&bridge.from)?;
            known(&bridge.to)?;
            if bridge.from == reward || bridge.from == base || bridge.from == bridge.to {
                return Err(invalid(format!(
                    "bridge {} -> {} is not allowed",
                    bridge.from, bridge.to
                )));
            }
        }
        Ok(())
    }

    /// A small but complete deployment: two farmed pairs, a native bonus
    /// rewarder and one bridge.
    pub fn sample() -> Self {
        let e18 = |n: Amount| TokenAmount(n * 1_000_000_000_000_000_000);
        let provider = "lp-provider".to_string();
        let seed = |symbol: &str| TokenConfig {
            symbol: symbol.to_string(),
            balances: BTreeMap::from([(provider.clone(), e18(1_000_000))]),
        };
        let pair = |a: &str, b: &str| PairConfig {
            token_a: a.to_string(),
            token_b: b.to_string(),
            amount_a: e18(10),
            amount_b: e18(10),
            provider: provider.clone(),
        };

        Self {
            genesis_time: 0,
            reward_token: RewardTokenConfig {
                symbol: "GTR".to_string(),
                max_supply: Some(e18(700_000_000)),
            },
            base_asset: AssetConfig {
                symbol: "WAVAX".to_string(),
            },
            tokens: vec![seed("GTR"), seed("WAVAX"), seed("DAI"), seed("USDC")],
            farm: FarmSection {
                owner: "deployer".to_string(),
                dev: "dev-fund".to_string(),
                treasury: "treasury".to_string(),
                investor: "investors".to_string(),
                reward_per_second: e18(10),
                start_time: 100,
                dev_percent: 200,
                treasury_percent: 200,
                investor_percent: 100,
            },
            enricher: EnricherSection {
                owner: "deployer".to_string(),
            },
            vault: VaultSection::default(),
            pairs: vec![
                pair("GTR", "WAVAX"),
                pair("DAI", "WAVAX"),
                pair("USDC", "WAVAX"),
                pair("DAI", "USDC"),
            ],
            rewarders: vec![RewarderConfig {
                name: "partner".to_string(),
                owner: "partner-team".to_string(),
                asset: NATIVE_ASSET.to_string(),
                stake: "GTR-WAVAX".to_string(),
                reward_per_second: TokenAmount(1_000_000_000_000_000),
                funding: e18(1_000),
            }],
            pools: vec![
                PoolConfig {
                    stake: "GTR-WAVAX".to_string(),
                    alloc_point: 100,
                    rewarder: Some("partner".to_string()),
                },
                PoolConfig {
                    stake: "DAI-WAVAX".to_string(),
                    alloc_point: 50,
                    rewarder: None,
                },
            ],
            bridges: vec![BridgeConfig {
                from: "DAI".to_string(),
                to: "USDC".to_string(),
            }],
        }
    }
}

fn check_symbol(symbol: &str) -> Result<()> {
    if symbol.is_empty() || symbol.contains('-') || symbol == NATIVE_ASSET {
        return Err(invalid(format!("{symbol:?} is not a usable token symbol")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_amount_forms() {
        assert_eq!(parse_amount("1000").unwrap(), 1000);
        assert_eq!(parse_amount("1_000").unwrap(), 1000);
        assert_eq!(parse_amount("25e18").unwrap(), 25_000_000_000_000_000_000);
        assert!(parse_amount("").is_err());
        assert!(parse_amount("1.5").is_err());
        assert!(parse_amount("-3").is_err());
        assert!(parse_amount("1e40").is_err());
    }

    #[test]
    fn test_sample_validates_and_round_trips_through_toml() {
        let sample = DeploymentConfig::sample();
        sample.validate().unwrap();
        let text = sample.to_toml_string().unwrap();
        assert_eq!(DeploymentConfig::from_toml_str(&text).unwrap(), sample);
    }

    #[test]
    fn test_splits_over_max_rejected() {
        let mut config = DeploymentConfig::sample();
        config.farm.dev_percent = 600;
        config.farm.treasury_percent = 500;
        assert!(matches!(
            config.validate(),
            Err(RuntimeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unknown_references_rejected() {
        let mut config = DeploymentConfig::sample();
        config.pools[1].stake = "MIC-WAVAX".to_string();
        assert!(config.validate().is_err());

        let mut config = DeploymentConfig::sample();
        config.pools[1].rewarder = Some("ghost".to_string());
        assert!(matches!(
            config.validate(),
            Err(RuntimeError::UnknownRewarder(_))
        ));

        let mut config = DeploymentConfig::sample();
        config.pools[1].rewarder = config.pools[0].rewarder.clone();
        assert!(matches!(
            config.validate(),
            Err(RuntimeError::InvalidConfig(_))
        ));

        let mut config = DeploymentConfig::sample();
        config.bridges[0].to = "MIC".to_string();
        assert!(matches!(
            config.validate(),
            Err(RuntimeError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn test_terminal_bridges_rejected() {
        let mut config = DeploymentConfig::sample();
        config.bridges.push(BridgeConfig {
            from: "WAVAX".to_string(),
            to: "USDC".to_string(),
        });
        assert!(config.validate().is_err());
    }

    proptest! {
        #[test]
        fn prop_scientific_amounts_match_integers(mantissa in 0u64..1_000_000, exponent in 0u32..24) {
            let expected = mantissa as u128 * 10u128.pow(exponent);
            prop_assert_eq!(parse_amount(&format!("{mantissa}e{exponent}")).unwrap(), expected);
            prop_assert_eq!(parse_amount(&expected.to_string()).unwrap(), expected);
        }
    }
}
