//! Verdant farm
//!
//! Reward emission for liquidity providers: the [`Farmer`], the per-mille
//! fund [`split`] policy, the shared reward [`accumulator`] and the
//! pluggable secondary [`rewarder`]s.

pub mod accumulator;
pub mod error;
pub mod events;
pub mod farmer;
pub mod rewarder;
pub mod simple_rewarder;
pub mod split;

pub use accumulator::ACC_REWARD_PRECISION;
pub use error::{FarmError, RewarderError};
pub use events::FarmEvent;
pub use farmer::{
    EmissionState, FarmEnv, Farmer, FarmerConfig, PendingTokens, Pool, PoolId, Settlement,
    UserPosition,
};
pub use rewarder::{HookContext, RewardPayout, Rewarder, RewarderRegistry};
pub use simple_rewarder::{RewardAsset, RewarderUser, SimpleRewarderPerSec};
pub use split::{FundAddresses, FundRole, FundSplits, SplitOutcome, PERCENT_DENOMINATOR};
