use thiserror::Error;
use verdant_enricher::EnricherError;
use verdant_farm::{FarmError, RewarderError};
use verdant_ledger::{LedgerError, VaultError, VenueError};
use verdant_types::AddressError;

/// Errors surfaced by the runtime. Component errors pass through unchanged.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid deployment config: {0}")]
    InvalidConfig(String),

    #[error("failed to load config: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("failed to parse scenario: {0}")]
    Scenario(String),

    #[error("unknown token symbol: {0}")]
    UnknownSymbol(String),

    #[error("no pool stakes {0}")]
    UnknownPool(String),

    #[error("unknown rewarder: {0}")]
    UnknownRewarder(String),

    #[error("invalid amount {0:?}")]
    InvalidAmount(String),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Venue(#[from] VenueError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Farm(#[from] FarmError),

    #[error(transparent)]
    Rewarder(#[from] RewarderError),

    #[error(transparent)]
    Enricher(#[from] EnricherError),
}

pub type Result<T, E = RuntimeError> = std::result::Result<T, E>;
