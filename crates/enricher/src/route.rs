//! Conversion planning.
//!
//! A burned fee position yields two legs, `(token0, amount0)` and
//! `(token1, amount1)`. The planner walks both legs towards the reward token
//! through the bridge graph and records every swap, merge and collection as
//! a [`RouteStep`]. Planning reads the graph and the venue's pair index only,
//! so a conversion that cannot complete is rejected before anything moves.

use std::collections::HashSet;

use tracing::debug;
use verdant_ledger::SwapVenue;
use verdant_types::Address;

use crate::bridge::BridgeGraph;
use crate::error::EnricherError;

/// Upper bound on walk states, on top of cycle detection.
pub const MAX_ROUTE_HOPS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Left,
    Right,
}

impl Leg {
    pub fn index(self) -> usize {
        match self {
            Leg::Left => 0,
            Leg::Right => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStep {
    /// Swap the whole balance of a leg from one token into another.
    Swap { leg: Leg, from: Address, to: Address },
    /// Fold the right leg into the left one. Both hold the same token.
    Merge,
    /// Count a leg holding the reward token towards the output.
    Collect { leg: Leg },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPlan {
    pub token0: Address,
    pub token1: Address,
    pub steps: Vec<RouteStep>,
}

impl ConversionPlan {
    pub fn swap_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step, RouteStep::Swap { .. }))
            .count()
    }
}

struct Planner<'a> {
    graph: &'a BridgeGraph,
    venue: &'a dyn SwapVenue,
    steps: Vec<RouteStep>,
}

impl Planner<'_> {
    fn swap(&mut self, leg: Leg, from: Address, to: Address) -> Result<(), EnricherError> {
        if self.venue.pair_for(&from, &to).is_none() {
            return Err(EnricherError::NoConvertiblePath { from, to });
        }
        self.steps.push(RouteStep::Swap { leg, from, to });
        Ok(())
    }

    fn collect(&mut self, leg: Leg) {
        self.steps.push(RouteStep::Collect { leg });
    }

    fn merge(&mut self) {
        self.steps.push(RouteStep::Merge);
    }
}

/// Plan the conversion of a `(token0, token1)` position into the reward
/// token.
///
/// Each walk state is the pair of tokens currently held by the two legs.
/// The walk is deterministic, so reaching a state twice means it would
/// never terminate.
pub fn plan_conversion(
    graph: &BridgeGraph,
    venue: &dyn SwapVenue,
    token0: Address,
    token1: Address,
) -> Result<ConversionPlan, EnricherError> {
    let reward = graph.reward_token();
    let base = graph.base_asset();
    let mut planner = Planner {
        graph,
        venue,
        steps: Vec::new(),
    };
    let mut visited = HashSet::new();
    let (mut t0, mut t1) = (token0, token1);

    loop {
        if visited.len() >= MAX_ROUTE_HOPS || !visited.insert((t0, t1)) {
            debug!(target: "enricher", "Bridge walk from {}/{} revisits {}/{}", token0, token1, t0, t1);
            return Err(EnricherError::NoConvertiblePath { from: t0, to: t1 });
        }

        if t0 == t1 {
            planner.merge();
            if t0 == reward {
                planner.collect(Leg::Left);
                break;
            }
            if t0 == base {
                planner.swap(Leg::Left, base, reward)?;
                planner.collect(Leg::Left);
                break;
            }
            let bridge = planner.graph.bridge_for(&t0);
            planner.swap(Leg::Left, t0, bridge)?;
            (t0, t1) = (bridge, bridge);
        } else if t0 == reward {
            planner.collect(Leg::Left);
            planner.swap(Leg::Right, t1, reward)?;
            planner.collect(Leg::Right);
            break;
        } else if t1 == reward {
            planner.collect(Leg::Right);
            planner.swap(Leg::Left, t0, reward)?;
            planner.collect(Leg::Left);
            break;
        } else if t0 == base {
            planner.swap(Leg::Right, t1, base)?;
            planner.merge();
            planner.swap(Leg::Left, base, reward)?;
            planner.collect(Leg::Left);
            break;
        } else if t1 == base {
            planner.swap(Leg::Left, t0, base)?;
            planner.merge();
            planner.swap(Leg::Left, base, reward)?;
            planner.collect(Leg::Left);
            break;
        } else {
            let bridge0 = planner.graph.bridge_for(&t0);
            let bridge1 = planner.graph.bridge_for(&t1);
            if bridge0 == t1 {
                planner.swap(Leg::Left, t0, bridge0)?;
                t0 = bridge0;
            } else if bridge1 == t0 {
                planner.swap(Leg::Right, t1, bridge1)?;
                t1 = bridge1;
            } else {
                planner.swap(Leg::Left, t0, bridge0)?;
                planner.swap(Leg::Right, t1, bridge1)?;
                (t0, t1) = (bridge0, bridge1);
            }
        }
    }

    Ok(ConversionPlan {
        token0,
        token1,
        steps: planner.steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_ledger::{InMemoryLedger, PairFactory, TokenLedger, TokenMetadata};

    fn token(label: &str) -> Address {
        Address::derive_labeled("token", label)
    }

    fn venue(pairs: &[(&str, &str)]) -> PairFactory {
        let mut ledger = InMemoryLedger::new();
        let mut factory = PairFactory::new();
        for symbol in ["GTR", "WAVAX", "DAI", "USDC", "MIC"] {
            ledger
                .register_token(token(symbol), TokenMetadata::new(symbol))
                .unwrap();
        }
        for (a, b) in pairs {
            factory.create_pair(&mut ledger, token(a), token(b)).unwrap();
        }
        factory
    }

    fn graph() -> BridgeGraph {
        BridgeGraph::new(token("GTR"), token("WAVAX")).unwrap()
    }

    #[test]
    fn test_reward_side_is_kept() {
        let venue = venue(&[("GTR", "WAVAX")]);
        let plan = plan_conversion(&graph(), &venue, token("GTR"), token("WAVAX")).unwrap();
        assert_eq!(
            plan.steps,
            vec![
                RouteStep::Collect { leg: Leg::Left },
                RouteStep::Swap {
                    leg: Leg::Right,
                    from: token("WAVAX"),
                    to: token("GTR")
                },
                RouteStep::Collect { leg: Leg::Right },
            ]
        );
    }

    #[test]
    fn test_base_side_merges_before_final_swap() {
        let venue = venue(&[("GTR", "WAVAX"), ("DAI", "WAVAX")]);
        let plan = plan_conversion(&graph(), &venue, token("DAI"), token("WAVAX")).unwrap();
        assert_eq!(plan.swap_count(), 2);
        assert_eq!(plan.steps[1], RouteStep::Merge);
    }

    #[test]
    fn test_two_step_bridge_path() {
        let venue = venue(&[
            ("GTR", "WAVAX"),
            ("USDC", "WAVAX"),
            ("DAI", "USDC"),
            ("DAI", "MIC"),
        ]);
        let mut graph = graph();
        graph.set_bridge(token("DAI"), token("USDC")).unwrap();
        graph.set_bridge(token("MIC"), token("DAI")).unwrap();
        let plan = plan_conversion(&graph, &venue, token("DAI"), token("MIC")).unwrap();
        // MIC -> DAI, merge, DAI -> USDC, merge, USDC -> WAVAX, merge, WAVAX -> GTR.
        assert_eq!(plan.swap_count(), 4);
        assert_eq!(
            plan.steps.last(),
            Some(&RouteStep::Collect { leg: Leg::Left })
        );
    }

    #[test]
    fn test_cycle_is_rejected() {
        let venue = venue(&[("GTR", "WAVAX"), ("DAI", "MIC")]);
        let mut graph = graph();
        graph.set_bridge(token("DAI"), token("MIC")).unwrap();
        graph.set_bridge(token("MIC"), token("DAI")).unwrap();
        let err = plan_conversion(&graph, &venue, token("DAI"), token("MIC")).unwrap_err();
        assert!(matches!(err, EnricherError::NoConvertiblePath { .. }));
    }

    #[test]
    fn test_missing_pair_is_rejected() {
        let venue = venue(&[("GTR", "WAVAX"), ("MIC", "USDC")]);
        let err = plan_conversion(&graph(), &venue, token("MIC"), token("USDC")).unwrap_err();
        assert_eq!(
            err,
            EnricherError::NoConvertiblePath {
                from: token("MIC"),
                to: token("WAVAX")
            }
        );
    }
}
