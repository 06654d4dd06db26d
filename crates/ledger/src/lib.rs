//! Verdant ledger collaborators
//!
//! The token ledger, the constant-product pair factory and the Moneybags
//! vault. The farm and the enricher depend only on the [`TokenLedger`],
//! [`SwapVenue`] and [`StakingVault`] traits; the concrete types here back
//! the runtime and the tests.

pub mod error;
pub mod token;
pub mod vault;
pub mod venue;

pub use error::{LedgerError, VaultError, VenueError};
pub use token::{InMemoryLedger, TokenLedger, TokenMetadata};
pub use vault::{Moneybags, StakingVault};
pub use venue::{
    get_amount_out, pair_address, sort_tokens, Pair, PairFactory, SwapVenue, MINIMUM_LIQUIDITY,
};
