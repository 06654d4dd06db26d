//! Property tests for the conversion planner.
//!
//! Run with: cargo test -p verdant-enricher --test route_properties

use proptest::prelude::*;
use verdant_enricher::{plan_conversion, BridgeGraph, EnricherError, Leg, RouteStep};
use verdant_ledger::{InMemoryLedger, PairFactory, TokenLedger, TokenMetadata};
use verdant_types::Address;

const SYMBOLS: [&str; 6] = ["GTR", "WAVAX", "DAI", "USDC", "MIC", "USDT"];

fn token(index: usize) -> Address {
    Address::derive_labeled("token", SYMBOLS[index])
}

/// Every pair between the six tokens exists, so only the bridge map decides
/// whether a walk terminates.
fn full_venue() -> PairFactory {
    let mut ledger = InMemoryLedger::new();
    let mut factory = PairFactory::new();
    for (i, symbol) in SYMBOLS.iter().enumerate() {
        ledger
            .register_token(token(i), TokenMetadata::new(*symbol))
            .unwrap();
    }
    for i in 0..SYMBOLS.len() {
        for j in (i + 1)..SYMBOLS.len() {
            factory.create_pair(&mut ledger, token(i), token(j)).unwrap();
        }
    }
    factory
}

proptest! {
    /// Whatever the bridge map, planning terminates, and a successful plan
    /// ends by collecting the reward token with every swap landing on a
    /// token the walk could reach.
    #[test]
    fn planning_always_terminates(
        bridges in prop::collection::vec((2usize..6, 0usize..6), 0..8),
        a in 0usize..6,
        b in 0usize..6,
    ) {
        prop_assume!(a != b);
        let venue = full_venue();
        let mut graph = BridgeGraph::new(token(0), token(1)).unwrap();
        for (from, to) in bridges {
            let _ = graph.set_bridge(token(from), token(to));
        }

        match plan_conversion(&graph, &venue, token(a), token(b)) {
            Ok(plan) => {
                let collected = plan
                    .steps
                    .iter()
                    .filter(|s| matches!(s, RouteStep::Collect { .. }))
                    .count();
                prop_assert!(collected >= 1);
                let ends_with_collect = matches!(
                    plan.steps.last(),
                    Some(RouteStep::Collect { leg: Leg::Left | Leg::Right })
                );
                prop_assert!(ends_with_collect);
                let last_swap = plan.steps.iter().rev().find_map(|s| match s {
                    RouteStep::Swap { to, .. } => Some(*to),
                    _ => None,
                });
                if let Some(to) = last_swap {
                    prop_assert_eq!(to, token(0));
                }
            }
            Err(err) => {
                prop_assert!(matches!(err, EnricherError::NoConvertiblePath { .. }), "{:?}", err);
            }
        }
    }
}
