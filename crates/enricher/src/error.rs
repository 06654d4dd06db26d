use thiserror::Error;
use verdant_ledger::{LedgerError, VaultError, VenueError};
use verdant_types::{Address, Overflow};

/// Errors raised while configuring bridges or converting fee positions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnricherError {
    #[error("invalid bridge: {0}")]
    InvalidBridge(&'static str),

    #[error("no pair exists for {0} and {1}")]
    InvalidPair(Address, Address),

    #[error("no convertible path from {from} through {to}")]
    NoConvertiblePath { from: Address, to: Address },

    #[error("conversions must be sent by an externally owned account")]
    MustUseExternalAccount,

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("invalid enricher configuration: {0}")]
    InvalidConfiguration(&'static str),

    #[error("arithmetic overflow while computing {0}")]
    ArithmeticOverflow(&'static str),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("swap failed: {0}")]
    Venue(#[from] VenueError),

    #[error("vault deposit failed: {0}")]
    Vault(#[from] VaultError),
}

impl From<Overflow> for EnricherError {
    fn from(value: Overflow) -> Self {
        EnricherError::ArithmeticOverflow(value.0)
    }
}
