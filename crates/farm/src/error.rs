use thiserror::Error;
use verdant_ledger::LedgerError;
use verdant_types::{Address, Amount, Overflow};

use crate::farmer::PoolId;

/// Errors raised by secondary rewarders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewarderError {
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("invalid rewarder configuration: {0}")]
    InvalidConfiguration(&'static str),

    #[error("arithmetic overflow while computing {0}")]
    ArithmeticOverflow(&'static str),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<Overflow> for RewarderError {
    fn from(value: Overflow) -> Self {
        RewarderError::ArithmeticOverflow(value.0)
    }
}

/// Errors raised by the Farmer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FarmError {
    #[error("invalid farm configuration: {0}")]
    InvalidConfiguration(String),

    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("withdraw of {requested} exceeds position of {available}")]
    InsufficientBalance { requested: Amount, available: Amount },

    #[error("pool {0} does not exist")]
    UnknownPool(PoolId),

    #[error("stake token {0} already has a pool")]
    DuplicatePool(Address),

    #[error("rewarder {0} is not registered")]
    UnknownRewarder(Address),

    #[error("rewarder {rewarder} measures {measures} but the pool stakes {stake_token}")]
    RewarderStakeMismatch {
        rewarder: Address,
        measures: Address,
        stake_token: Address,
    },

    #[error("arithmetic overflow while computing {0}")]
    ArithmeticOverflow(&'static str),

    #[error("rewarder failed: {0}")]
    Rewarder(#[from] RewarderError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<Overflow> for FarmError {
    fn from(value: Overflow) -> Self {
        FarmError::ArithmeticOverflow(value.0)
    }
}
