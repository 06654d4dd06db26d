use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::math::Timestamp;

/// Caller identity and block time for one state transition.
///
/// `sender` is the immediate caller, `origin` the externally owned account
/// that signed the outer transaction. They differ whenever a contract calls
/// on someone's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub sender: Address,
    pub origin: Address,
    pub now: Timestamp,
}

impl CallContext {
    /// A call signed and sent directly by `account`.
    pub fn external(account: Address, now: Timestamp) -> Self {
        Self {
            sender: account,
            origin: account,
            now,
        }
    }

    /// A call relayed by `contract` inside a transaction signed by `origin`.
    pub fn relayed(contract: Address, origin: Address, now: Timestamp) -> Self {
        Self {
            sender: contract,
            origin,
            now,
        }
    }

    pub fn is_external_account(&self) -> bool {
        self.sender == self.origin
    }

    /// Same caller, different block time.
    pub fn at(self, now: Timestamp) -> Self {
        Self { now, ..self }
    }
}
