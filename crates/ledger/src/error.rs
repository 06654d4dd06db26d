use thiserror::Error;
use verdant_types::{Address, Amount, Overflow};

/// Errors raised by token bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("token {0} is not registered")]
    UnknownToken(Address),

    #[error("token {0} is already registered")]
    TokenExists(Address),

    #[error("{owner} holds {available} of {token}, needs {requested}")]
    InsufficientBalance {
        token: Address,
        owner: Address,
        requested: Amount,
        available: Amount,
    },

    #[error("allowance of {spender} over {owner}'s {token} is {available}, needs {requested}")]
    InsufficientAllowance {
        token: Address,
        owner: Address,
        spender: Address,
        requested: Amount,
        available: Amount,
    },

    #[error("{caller} is not the minter of {token}")]
    NotMinter { token: Address, caller: Address },

    #[error("minting {requested} of {token} would exceed the supply cap {cap}")]
    SupplyCapExceeded {
        token: Address,
        cap: Amount,
        requested: Amount,
    },

    #[error("invalid token metadata: {0}")]
    InvalidToken(&'static str),

    #[error(transparent)]
    ArithmeticOverflow(#[from] Overflow),
}

/// Errors raised by the constant-product venue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VenueError {
    #[error("no pair exists for {0} and {1}")]
    PairNotFound(Address, Address),

    #[error("{0} is not a pair")]
    UnknownPair(Address),

    #[error("pair for {0} and {1} already exists")]
    PairExists(Address, Address),

    #[error("a pair needs two distinct non-zero tokens")]
    IdenticalTokens,

    #[error("insufficient liquidity: {0}")]
    InsufficientLiquidity(&'static str),

    #[error("insufficient input amount")]
    InsufficientInputAmount,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    ArithmeticOverflow(#[from] Overflow),
}

/// Errors raised by the Moneybags vault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("vault has no outstanding shares")]
    EmptyVault,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    ArithmeticOverflow(#[from] Overflow),
}
