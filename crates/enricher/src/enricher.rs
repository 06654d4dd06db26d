//! Enricher: turns accumulated fee positions into the reward token and
//! forwards the proceeds to the staking vault.
//!
//! A conversion is planned in full against the bridge graph before any
//! balance moves. Only then is the Enricher's share balance burned and the
//! planned swaps executed. The Enricher keeps no per-conversion state of its
//! own, so a failed call leaves nothing for the host to undo apart from the
//! ledger and venue effects it already rolls back.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use verdant_ledger::{StakingVault, SwapVenue, TokenLedger};
use verdant_types::math;
use verdant_types::{Address, Amount, CallContext, EventSink};

use crate::bridge::BridgeGraph;
use crate::error::EnricherError;
use crate::events::EnricherEvent;
use crate::route::{plan_conversion, ConversionPlan, RouteStep};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnricherConfig {
    pub address: Address,
    pub owner: Address,
    pub reward_token: Address,
    pub base_asset: Address,
    pub vault: Address,
}

/// Collaborators the Enricher acts on during a call.
pub struct EnricherEnv<'a> {
    pub ledger: &'a mut dyn TokenLedger,
    pub venue: &'a mut dyn SwapVenue,
    pub vault: &'a mut dyn StakingVault,
    pub events: &'a mut dyn EventSink<EnricherEvent>,
}

/// Result of converting one fee position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    pub pair: Address,
    pub lp_amount: Amount,
    pub amount0: Amount,
    pub amount1: Amount,
    pub reward_out: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enricher {
    address: Address,
    owner: Address,
    vault: Address,
    graph: BridgeGraph,
}

impl Enricher {
    pub fn new(config: EnricherConfig) -> Result<Self, EnricherError> {
        if config.address.is_zero() || config.owner.is_zero() || config.vault.is_zero() {
            return Err(EnricherError::InvalidConfiguration(
                "enricher, owner and vault addresses must be non-zero",
            ));
        }
        let graph = BridgeGraph::new(config.reward_token, config.base_asset)?;
        Ok(Self {
            address: config.address,
            owner: config.owner,
            vault: config.vault,
            graph,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn vault(&self) -> Address {
        self.vault
    }

    pub fn graph(&self) -> &BridgeGraph {
        &self.graph
    }

    /// Plan a conversion without executing it.
    pub fn plan(
        &self,
        venue: &dyn SwapVenue,
        token_a: Address,
        token_b: Address,
    ) -> Result<ConversionPlan, EnricherError> {
        if venue.pair_for(&token_a, &token_b).is_none() {
            return Err(EnricherError::InvalidPair(token_a, token_b));
        }
        plan_conversion(&self.graph, venue, token_a, token_b)
    }

    pub fn set_bridge(
        &mut self,
        ctx: &CallContext,
        events: &mut dyn EventSink<EnricherEvent>,
        token: Address,
        bridge: Address,
    ) -> Result<(), EnricherError> {
        self.ensure_owner(ctx)?;
        self.graph.set_bridge(token, bridge)?;
        events.emit(EnricherEvent::BridgeSet { token, bridge });
        info!(target: "enricher", "Bridge for {} set to {}", token, bridge);
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        ctx: &CallContext,
        events: &mut dyn EventSink<EnricherEvent>,
        new_owner: Address,
    ) -> Result<(), EnricherError> {
        self.ensure_owner(ctx)?;
        if new_owner.is_zero() {
            return Err(EnricherError::InvalidConfiguration(
                "new owner must be non-zero",
            ));
        }
        let previous = self.owner;
        self.owner = new_owner;
        events.emit(EnricherEvent::OwnershipTransferred {
            previous,
            current: new_owner,
        });
        info!(target: "enricher", "Ownership transferred from {} to {}", previous, new_owner);
        Ok(())
    }

    /// Convert the whole fee position held in the `token_a`/`token_b` pair
    /// and forward the proceeds to the vault. Returns the amount forwarded.
    pub fn convert(
        &self,
        ctx: &CallContext,
        env: &mut EnricherEnv<'_>,
        token_a: Address,
        token_b: Address,
    ) -> Result<Amount, EnricherError> {
        self.ensure_external(ctx)?;
        let plan = self.plan(&*env.venue, token_a, token_b)?;
        let conversion = self.execute(ctx, env, &plan)?;
        self.forward(env, conversion.reward_out)?;
        Ok(conversion.reward_out)
    }

    /// Convert several positions and forward the total once. Every plan is
    /// checked before the first position is touched.
    pub fn convert_multiple(
        &self,
        ctx: &CallContext,
        env: &mut EnricherEnv<'_>,
        tokens_a: &[Address],
        tokens_b: &[Address],
    ) -> Result<Amount, EnricherError> {
        self.ensure_external(ctx)?;
        if tokens_a.len() != tokens_b.len() {
            return Err(EnricherError::InvalidInput(
                "token lists must have the same length",
            ));
        }

        let plans = tokens_a
            .iter()
            .zip(tokens_b)
            .map(|(a, b)| self.plan(&*env.venue, *a, *b))
            .collect::<Result<Vec<_>, _>>()?;

        let mut total: Amount = 0;
        for plan in &plans {
            let conversion = self.execute(ctx, env, plan)?;
            total = math::add(total, conversion.reward_out, "converted total")?;
        }
        self.forward(env, total)?;
        Ok(total)
    }

    fn execute(
        &self,
        ctx: &CallContext,
        env: &mut EnricherEnv<'_>,
        plan: &ConversionPlan,
    ) -> Result<Conversion, EnricherError> {
        let pair = env
            .venue
            .pair_for(&plan.token0, &plan.token1)
            .ok_or(EnricherError::InvalidPair(plan.token0, plan.token1))?;
        let (pair_token0, _) = env
            .venue
            .pair_tokens(&pair)
            .ok_or(EnricherError::InvalidPair(plan.token0, plan.token1))?;

        let lp_amount = env.ledger.balance_of(&pair, &self.address);
        env.ledger.transfer(&pair, &self.address, &pair, lp_amount)?;
        let (burned0, burned1) = env.venue.burn(&mut *env.ledger, &pair, &self.address)?;
        let (amount0, amount1) = if plan.token0 == pair_token0 {
            (burned0, burned1)
        } else {
            (burned1, burned0)
        };
        debug!(
            target: "enricher",
            "Burned {} of {} into {} {} and {} {}",
            lp_amount, pair, amount0, plan.token0, amount1, plan.token1
        );

        let mut legs = [(plan.token0, amount0), (plan.token1, amount1)];
        let mut reward_out: Amount = 0;
        for step in &plan.steps {
            match *step {
                RouteStep::Swap { leg, from, to } => {
                    let (_, amount) = legs[leg.index()];
                    let received = if amount == 0 {
                        0
                    } else {
                        env.venue.swap_exact_in(
                            &mut *env.ledger,
                            &from,
                            &to,
                            amount,
                            &self.address,
                            &self.address,
                        )?
                    };
                    debug!(target: "enricher", "Swapped {} {} into {} {}", amount, from, received, to);
                    legs[leg.index()] = (to, received);
                }
                RouteStep::Merge => {
                    let merged = math::add(legs[0].1, legs[1].1, "merged leg")?;
                    legs[0].1 = merged;
                    legs[1].1 = 0;
                }
                RouteStep::Collect { leg } => {
                    reward_out = math::add(reward_out, legs[leg.index()].1, "reward out")?;
                    legs[leg.index()].1 = 0;
                }
            }
        }

        env.events.emit(EnricherEvent::Converted {
            caller: ctx.sender,
            token0: plan.token0,
            token1: plan.token1,
            lp_amount,
            amount0,
            amount1,
            reward_out,
        });
        info!(
            target: "enricher",
            "Converted {} of {} into {} reward",
            lp_amount, pair, reward_out
        );
        Ok(Conversion {
            pair,
            lp_amount,
            amount0,
            amount1,
            reward_out,
        })
    }

    fn forward(&self, env: &mut EnricherEnv<'_>, amount: Amount) -> Result<(), EnricherError> {
        if env.vault.address() != self.vault {
            return Err(EnricherError::InvalidConfiguration(
                "vault does not match the configured address",
            ));
        }
        if amount == 0 {
            return Ok(());
        }
        env.vault
            .deposit_rewards(&mut *env.ledger, &self.address, amount)?;
        env.events.emit(EnricherEvent::RewardsForwarded {
            vault: self.vault,
            amount,
        });
        info!(target: "enricher", "Forwarded {} to vault {}", amount, self.vault);
        Ok(())
    }

    fn ensure_owner(&self, ctx: &CallContext) -> Result<(), EnricherError> {
        if ctx.sender != self.owner {
            return Err(EnricherError::Unauthorized("caller is not the owner"));
        }
        Ok(())
    }

    fn ensure_external(&self, ctx: &CallContext) -> Result<(), EnricherError> {
        if !ctx.is_external_account() {
            return Err(EnricherError::MustUseExternalAccount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(label: &str) -> Address {
        Address::derive_labeled("test", label)
    }

    fn enricher() -> Enricher {
        Enricher::new(EnricherConfig {
            address: addr("enricher"),
            owner: addr("owner"),
            reward_token: addr("GTR"),
            base_asset: addr("WAVAX"),
            vault: addr("vault"),
        })
        .unwrap()
    }

    #[test]
    fn test_set_bridge_is_owner_only() {
        let mut enricher = enricher();
        let mut events: Vec<EnricherEvent> = Vec::new();
        let stranger = CallContext::external(addr("stranger"), 0);
        assert_eq!(
            enricher.set_bridge(&stranger, &mut events, addr("DAI"), addr("USDC")),
            Err(EnricherError::Unauthorized("caller is not the owner"))
        );

        let owner = CallContext::external(addr("owner"), 0);
        enricher
            .set_bridge(&owner, &mut events, addr("DAI"), addr("USDC"))
            .unwrap();
        assert_eq!(enricher.graph().bridge_for(&addr("DAI")), addr("USDC"));
        assert_eq!(
            events,
            vec![EnricherEvent::BridgeSet {
                token: addr("DAI"),
                bridge: addr("USDC")
            }]
        );
    }

    #[test]
    fn test_ownership_transfer() {
        let mut enricher = enricher();
        let mut events: Vec<EnricherEvent> = Vec::new();
        let owner = CallContext::external(addr("owner"), 0);
        assert!(enricher
            .transfer_ownership(&owner, &mut events, Address::ZERO)
            .is_err());
        enricher
            .transfer_ownership(&owner, &mut events, addr("next"))
            .unwrap();
        assert_eq!(enricher.owner(), addr("next"));
        assert!(enricher
            .set_bridge(&owner, &mut events, addr("DAI"), addr("USDC"))
            .is_err());
    }

    #[test]
    fn test_construction_rejects_zero_vault() {
        let result = Enricher::new(EnricherConfig {
            address: addr("enricher"),
            owner: addr("owner"),
            reward_token: addr("GTR"),
            base_asset: addr("WAVAX"),
            vault: Address::ZERO,
        });
        assert!(matches!(
            result,
            Err(EnricherError::InvalidConfiguration(_))
        ));
    }
}
