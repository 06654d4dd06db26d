use serde::{Deserialize, Serialize};
use verdant_types::{Address, Amount};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EnricherEvent {
    BridgeSet {
        token: Address,
        bridge: Address,
    },
    Converted {
        caller: Address,
        token0: Address,
        token1: Address,
        lp_amount: Amount,
        amount0: Amount,
        amount1: Amount,
        reward_out: Amount,
    },
    RewardsForwarded {
        vault: Address,
        amount: Amount,
    },
    OwnershipTransferred {
        previous: Address,
        current: Address,
    },
}
