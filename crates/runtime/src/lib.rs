//! Verdant runtime
//!
//! Hosts a complete deployment in memory: the token ledger, the pair
//! factory, the Farmer with its rewarders, the Enricher and the Moneybags
//! vault. Genesis is built from a [`DeploymentConfig`]; each operation then
//! runs through [`Runtime::execute`] as one all-or-nothing transaction.

pub mod config;
pub mod error;
pub mod event;
pub mod naming;
pub mod runtime;
pub mod scenario;
pub mod state;

pub use config::{parse_amount, DeploymentConfig, TokenAmount};
pub use error::{Result, RuntimeError};
pub use event::{Event, EventLog};
pub use runtime::Runtime;
pub use scenario::{run, Action, Report, Scenario, Step, StepReport};
pub use state::State;
