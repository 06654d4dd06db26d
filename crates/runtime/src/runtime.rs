use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::DeploymentConfig;
use crate::error::Result;
use crate::event::Event;
use crate::state::State;

/// Serialized, all-or-nothing execution over a [`State`].
///
/// Every call to [`Runtime::execute`] holds the write lock for its whole
/// duration and restores the pre-call state if the operation fails, so a
/// failed operation leaves no ledger, pool, position or event behind.
pub struct Runtime {
    state: RwLock<State>,
}

impl Runtime {
    pub fn new(state: State) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn from_config(config: &DeploymentConfig) -> Result<Self> {
        Ok(Self::new(State::genesis(config)?))
    }

    pub fn execute<T, F>(&self, label: &str, operation: F) -> Result<T>
    where
        F: FnOnce(&mut State) -> Result<T>,
    {
        let mut state = self.state.write();
        let snapshot = state.clone();
        let events_before = state.events().len();
        match operation(&mut state) {
            Ok(value) => {
                debug!(
                    target: "runtime",
                    "{} committed with {} events",
                    label,
                    state.events().len() - events_before
                );
                Ok(value)
            }
            Err(err) => {
                *state = snapshot;
                warn!(target: "runtime", "{} reverted: {}", label, err);
                Err(err)
            }
        }
    }

    pub fn view<T>(&self, read: impl FnOnce(&State) -> T) -> T {
        read(&self.state.read())
    }

    pub fn snapshot(&self) -> State {
        self.state.read().clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.read().events().entries().to_vec()
    }
}
