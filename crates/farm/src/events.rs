use serde::{Deserialize, Serialize};
use verdant_types::{Address, Amount, Timestamp};

use crate::farmer::PoolId;
use crate::split::FundRole;

/// Events emitted by the Farmer and its rewarders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FarmEvent {
    PoolRegistered {
        pid: PoolId,
        stake_token: Address,
        alloc_point: u64,
        rewarder: Option<Address>,
    },
    PoolUpdated {
        pid: PoolId,
        alloc_point: u64,
        rewarder: Option<Address>,
        overwrite_rewarder: bool,
    },
    PoolAccrued {
        pid: PoolId,
        last_reward_time: Timestamp,
        emitted: Amount,
        lp_reward: Amount,
        acc_reward_per_share: u128,
    },
    Deposit {
        account: Address,
        pid: PoolId,
        amount: Amount,
    },
    Withdraw {
        account: Address,
        pid: PoolId,
        amount: Amount,
    },
    Harvest {
        account: Address,
        pid: PoolId,
        amount: Amount,
    },
    EmergencyWithdraw {
        account: Address,
        pid: PoolId,
        amount: Amount,
        forfeited: Amount,
    },
    EmissionRateUpdated {
        caller: Address,
        reward_per_second: Amount,
    },
    SplitsUpdated {
        dev_percent: u16,
        treasury_percent: u16,
        investor_percent: u16,
    },
    FundAddressUpdated {
        role: FundRole,
        previous: Address,
        current: Address,
    },
    StartTimeUpdated {
        start_time: Timestamp,
    },
    OwnershipTransferred {
        previous: Address,
        current: Address,
    },
    RewarderPaid {
        rewarder: Address,
        account: Address,
        token: Address,
        amount: Amount,
        unpaid: Amount,
    },
    RewardRateUpdated {
        rewarder: Address,
        previous: Amount,
        current: Amount,
    },
}
