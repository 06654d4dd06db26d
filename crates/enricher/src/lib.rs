//! Verdant enricher
//!
//! Sweeps the swap-fee share tokens the Enricher accumulates, burns them,
//! routes both underlying tokens to the reward token through the
//! [`bridge`] graph and hands the proceeds to the staking vault.

pub mod bridge;
pub mod enricher;
pub mod error;
pub mod events;
pub mod route;

pub use bridge::BridgeGraph;
pub use enricher::{Conversion, Enricher, EnricherConfig, EnricherEnv};
pub use error::EnricherError;
pub use events::EnricherEvent;
pub use route::{plan_conversion, ConversionPlan, Leg, RouteStep, MAX_ROUTE_HOPS};
