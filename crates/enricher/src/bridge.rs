//! Bridge graph: the next hop for each token on its way to the reward token.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use verdant_types::Address;

use crate::error::EnricherError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeGraph {
    reward_token: Address,
    base_asset: Address,
    bridges: BTreeMap<Address, Address>,
}

impl BridgeGraph {
    pub fn new(reward_token: Address, base_asset: Address) -> Result<Self, EnricherError> {
        if reward_token.is_zero() || base_asset.is_zero() {
            return Err(EnricherError::InvalidConfiguration(
                "reward token and base asset must be non-zero",
            ));
        }
        if reward_token == base_asset {
            return Err(EnricherError::InvalidConfiguration(
                "reward token and base asset must differ",
            ));
        }
        Ok(Self {
            reward_token,
            base_asset,
            bridges: BTreeMap::new(),
        })
    }

    pub fn reward_token(&self) -> Address {
        self.reward_token
    }

    pub fn base_asset(&self) -> Address {
        self.base_asset
    }

    /// Set the next hop for `token`. The reward token and the base asset
    /// are terminal and cannot be remapped.
    pub fn set_bridge(&mut self, token: Address, bridge: Address) -> Result<(), EnricherError> {
        if token == self.reward_token {
            return Err(EnricherError::InvalidBridge("the reward token is terminal"));
        }
        if token == self.base_asset {
            return Err(EnricherError::InvalidBridge("the base asset is terminal"));
        }
        if token == bridge {
            return Err(EnricherError::InvalidBridge("a token cannot bridge to itself"));
        }
        if bridge.is_zero() {
            return Err(EnricherError::InvalidBridge("bridge must be non-zero"));
        }
        self.bridges.insert(token, bridge);
        Ok(())
    }

    /// Next hop for `token`; the base asset when none was set.
    pub fn bridge_for(&self, token: &Address) -> Address {
        self.bridges
            .get(token)
            .copied()
            .unwrap_or(self.base_asset)
    }

    pub fn edges(&self) -> impl Iterator<Item = (&Address, &Address)> {
        self.bridges.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(label: &str) -> Address {
        Address::derive_labeled("token", label)
    }

    #[test]
    fn test_terminal_tokens_and_self_loops_rejected() {
        let mut graph = BridgeGraph::new(token("GTR"), token("WAVAX")).unwrap();
        assert!(matches!(
            graph.set_bridge(token("GTR"), token("WAVAX")),
            Err(EnricherError::InvalidBridge(_))
        ));
        assert!(matches!(
            graph.set_bridge(token("WAVAX"), token("GTR")),
            Err(EnricherError::InvalidBridge(_))
        ));
        assert!(matches!(
            graph.set_bridge(token("DAI"), token("DAI")),
            Err(EnricherError::InvalidBridge(_))
        ));
    }

    #[test]
    fn test_unset_bridges_default_to_base() {
        let mut graph = BridgeGraph::new(token("GTR"), token("WAVAX")).unwrap();
        assert_eq!(graph.bridge_for(&token("DAI")), token("WAVAX"));
        assert_eq!(graph.edges().count(), 0);
        graph.set_bridge(token("DAI"), token("USDC")).unwrap();
        assert_eq!(graph.bridge_for(&token("DAI")), token("USDC"));
        assert_eq!(graph.edges().count(), 1);
    }

    #[test]
    fn test_construction_requires_distinct_terminals() {
        assert!(BridgeGraph::new(token("GTR"), token("GTR")).is_err());
        assert!(BridgeGraph::new(Address::ZERO, token("GTR")).is_err());
    }
}
