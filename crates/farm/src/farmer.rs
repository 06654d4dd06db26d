//! Farmer: time-based reward emission across weighted pools.
//!
//! Every pool accrues `reward_per_second * alloc_point / total_alloc_point`
//! per second once emissions have started. Each accrual mints the dev,
//! treasury and investor shares straight to the fund addresses and mints
//! the liquidity-provider remainder to the Farmer, which pays stakers out of
//! it through the reward-per-share accumulator.
//!
//! Operations stage their pool and position changes, perform every ledger
//! and rewarder interaction, and only then commit the staged records. The
//! host is expected to roll back ledger effects of a failed call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use verdant_ledger::TokenLedger;
use verdant_types::math;
use verdant_types::{Address, Amount, CallContext, EventSink, Timestamp};

use crate::accumulator;
use crate::error::FarmError;
use crate::events::FarmEvent;
use crate::rewarder::{HookContext, RewardPayout, RewarderRegistry};
use crate::split::{FundAddresses, FundRole, FundSplits, SplitOutcome};

/// Index of a pool in registration order.
pub type PoolId = usize;

/// Construction parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmerConfig {
    pub address: Address,
    pub owner: Address,
    pub reward_token: Address,
    pub dev_addr: Address,
    pub treasury_addr: Address,
    pub investor_addr: Address,
    pub reward_per_second: Amount,
    pub start_time: Timestamp,
    pub dev_percent: u16,
    pub treasury_percent: u16,
    pub investor_percent: u16,
}

/// Global emission parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionState {
    pub reward_token: Address,
    pub reward_per_second: Amount,
    pub start_time: Timestamp,
    pub total_alloc_point: u64,
    pub funds: FundAddresses,
    pub splits: FundSplits,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub stake_token: Address,
    pub alloc_point: u64,
    pub last_reward_time: Timestamp,
    /// Reward per staked unit, scaled by [`accumulator::ACC_REWARD_PRECISION`].
    pub acc_reward_per_share: u128,
    /// Stake deposited through the Farmer. Tokens sent to the Farmer
    /// directly are not counted.
    pub total_staked: Amount,
    pub rewarder: Option<Address>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPosition {
    pub amount: Amount,
    pub reward_debt: Amount,
}

/// Outcome of a deposit, withdraw or emergency withdraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub pid: PoolId,
    pub account: Address,
    /// Stake moved in or out.
    pub amount: Amount,
    /// Native reward paid to the account.
    pub harvested: Amount,
    pub bonus: Option<RewardPayout>,
}

/// Read-only view of what an account could claim right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTokens {
    pub pending_reward: Amount,
    pub bonus_token: Option<Address>,
    pub bonus_symbol: Option<String>,
    pub pending_bonus: Amount,
}

/// Collaborators the Farmer acts on during a call.
pub struct FarmEnv<'a> {
    pub ledger: &'a mut dyn TokenLedger,
    pub rewarders: &'a mut RewarderRegistry,
    pub events: &'a mut dyn EventSink<FarmEvent>,
}

#[derive(Debug, Clone)]
pub struct Farmer {
    address: Address,
    owner: Address,
    emission: EmissionState,
    pools: Vec<Pool>,
    positions: BTreeMap<(PoolId, Address), UserPosition>,
}

impl Farmer {
    pub fn new(config: FarmerConfig) -> Result<Self, FarmError> {
        let splits = FundSplits::new(
            config.dev_percent,
            config.treasury_percent,
            config.investor_percent,
        )?;
        let required = [
            (config.address, "farmer address"),
            (config.owner, "owner"),
            (config.reward_token, "reward token"),
            (config.dev_addr, "dev address"),
            (config.treasury_addr, "treasury address"),
            (config.investor_addr, "investor address"),
        ];
        for (address, name) in required {
            if address.is_zero() {
                return Err(FarmError::InvalidConfiguration(format!(
                    "{name} must be non-zero"
                )));
            }
        }

        Ok(Self {
            address: config.address,
            owner: config.owner,
            emission: EmissionState {
                reward_token: config.reward_token,
                reward_per_second: config.reward_per_second,
                start_time: config.start_time,
                total_alloc_point: 0,
                funds: FundAddresses {
                    dev: config.dev_addr,
                    treasury: config.treasury_addr,
                    investor: config.investor_addr,
                },
                splits,
            },
            pools: Vec::new(),
            positions: BTreeMap::new(),
        })
    }

    // -------------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn emission(&self) -> &EmissionState {
        &self.emission
    }

    pub fn pool_length(&self) -> usize {
        self.pools.len()
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn pool(&self, pid: PoolId) -> Result<&Pool, FarmError> {
        self.pools.get(pid).ok_or(FarmError::UnknownPool(pid))
    }

    pub fn pool_for_token(&self, stake_token: &Address) -> Option<PoolId> {
        self.pools.iter().position(|p| p.stake_token == *stake_token)
    }

    pub fn position(&self, pid: PoolId, account: &Address) -> UserPosition {
        self.positions
            .get(&(pid, *account))
            .copied()
            .unwrap_or_default()
    }

    pub fn positions(&self) -> impl Iterator<Item = (PoolId, &Address, &UserPosition)> {
        self.positions
            .iter()
            .map(|((pid, account), position)| (*pid, account, position))
    }

    /// Claimable native and bonus rewards of `account` as of `now`.
    pub fn pending_tokens(
        &self,
        pid: PoolId,
        account: &Address,
        now: Timestamp,
        ledger: &dyn TokenLedger,
        rewarders: &RewarderRegistry,
    ) -> Result<PendingTokens, FarmError> {
        let pool = self.pool(pid)?;
        let position = self.position(pid, account);
        let acc = match self.project(pool, now)? {
            Some((_, acc)) => acc,
            None => pool.acc_reward_per_share,
        };
        let pending_reward = accumulator::pending(position.amount, acc, position.reward_debt)?;

        let mut pending = PendingTokens {
            pending_reward,
            bonus_token: None,
            bonus_symbol: None,
            pending_bonus: 0,
        };
        if let Some(address) = pool.rewarder {
            let rewarder = rewarders
                .get(&address)
                .ok_or(FarmError::UnknownRewarder(address))?;
            let token = rewarder.reward_token();
            pending.bonus_token = Some(token);
            pending.bonus_symbol = ledger.symbol(&token);
            pending.pending_bonus = rewarder.pending_reward(ledger, account, now)?;
        }
        Ok(pending)
    }

    // -------------------------------------------------------------------------
    // Accrual
    // -------------------------------------------------------------------------

    /// Split and accumulator value the pool would reach at `now`, or `None`
    /// when nothing would be emitted.
    fn project(&self, pool: &Pool, now: Timestamp) -> Result<Option<(SplitOutcome, u128)>, FarmError> {
        if now <= pool.last_reward_time {
            return Ok(None);
        }
        let elapsed =
            accumulator::elapsed_since(pool.last_reward_time, self.emission.start_time, now);
        if elapsed == 0 || pool.total_staked == 0 || pool.alloc_point == 0 {
            return Ok(None);
        }
        let emitted = accumulator::pool_emission(
            elapsed,
            self.emission.reward_per_second,
            pool.alloc_point,
            self.emission.total_alloc_point,
        )?;
        let split = self.emission.splits.apply(emitted)?;
        let acc = accumulator::accumulate(pool.acc_reward_per_share, split.lp, pool.total_staked)?;
        Ok(Some((split, acc)))
    }

    /// Bring a staged pool current: mint the window's emission and advance
    /// the accumulator.
    ///
    /// An empty or zero-weight pool only advances `last_reward_time`. The
    /// emission for that window is never minted to anyone.
    fn accrue_staged(
        &self,
        pid: PoolId,
        pool: &mut Pool,
        now: Timestamp,
        env: &mut FarmEnv<'_>,
    ) -> Result<SplitOutcome, FarmError> {
        if now <= pool.last_reward_time {
            return Ok(SplitOutcome::default());
        }
        let mut outcome = SplitOutcome::default();
        if let Some((split, acc)) = self.project(pool, now)? {
            self.mint_emission(env, &split)?;
            pool.acc_reward_per_share = acc;
            outcome = split;
            env.events.emit(FarmEvent::PoolAccrued {
                pid,
                last_reward_time: now,
                emitted: split.total(),
                lp_reward: split.lp,
                acc_reward_per_share: acc,
            });
            debug!(
                target: "farm",
                "Pool {}: accrued {} ({} to stakers), acc {}",
                pid,
                split.total(),
                split.lp,
                acc
            );
        }
        pool.last_reward_time = now;
        Ok(outcome)
    }

    fn mint_emission(&self, env: &mut FarmEnv<'_>, split: &SplitOutcome) -> Result<(), FarmError> {
        let token = self.emission.reward_token;
        for role in FundRole::ALL {
            let amount = split.for_role(role);
            if amount > 0 {
                env.ledger
                    .mint(&token, &self.address, &self.emission.funds.get(role), amount)?;
            }
        }
        if split.lp > 0 {
            env.ledger.mint(&token, &self.address, &self.address, split.lp)?;
        }
        Ok(())
    }

    /// Bring one pool current. Anyone may call this.
    pub fn accrue(
        &mut self,
        ctx: &CallContext,
        env: &mut FarmEnv<'_>,
        pid: PoolId,
    ) -> Result<SplitOutcome, FarmError> {
        let mut pool = self.pool(pid)?.clone();
        let outcome = self.accrue_staged(pid, &mut pool, ctx.now, env)?;
        self.pools[pid] = pool;
        Ok(outcome)
    }

    /// Bring every pool current. Anyone may call this.
    pub fn mass_update_pools(
        &mut self,
        ctx: &CallContext,
        env: &mut FarmEnv<'_>,
    ) -> Result<(), FarmError> {
        let mut pools = self.pools.clone();
        for (pid, pool) in pools.iter_mut().enumerate() {
            self.accrue_staged(pid, pool, ctx.now, env)?;
        }
        self.pools = pools;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Staking
    // -------------------------------------------------------------------------

    /// Pay the pending native reward of a staged position. Transfers are
    /// capped at the Farmer's reward balance to absorb rounding dust.
    fn harvest(
        &self,
        env: &mut FarmEnv<'_>,
        pid: PoolId,
        pool: &Pool,
        position: &UserPosition,
        account: &Address,
    ) -> Result<Amount, FarmError> {
        if position.amount == 0 {
            return Ok(0);
        }
        let pending = accumulator::pending(
            position.amount,
            pool.acc_reward_per_share,
            position.reward_debt,
        )?;
        if pending == 0 {
            return Ok(0);
        }
        let token = self.emission.reward_token;
        let balance = env.ledger.balance_of(&token, &self.address);
        let paid = pending.min(balance);
        if paid < pending {
            warn!(
                target: "farm",
                "Pool {}: reward balance {} short of pending {} for {}",
                pid, balance, pending, account
            );
        }
        env.ledger.transfer(&token, &self.address, account, paid)?;
        env.events.emit(FarmEvent::Harvest {
            account: *account,
            pid,
            amount: paid,
        });
        Ok(paid)
    }

    fn notify_rewarder(
        &self,
        env: &mut FarmEnv<'_>,
        pool: &Pool,
        account: &Address,
        new_amount: Amount,
        now: Timestamp,
    ) -> Result<Option<RewardPayout>, FarmError> {
        let Some(address) = pool.rewarder else {
            return Ok(None);
        };
        let rewarder = env
            .rewarders
            .get_mut(&address)
            .ok_or(FarmError::UnknownRewarder(address))?;
        let hook = HookContext {
            caller: self.address,
            now,
        };
        let payout = rewarder.on_reward(&hook, &mut *env.ledger, account, new_amount)?;
        if payout.paid > 0 || payout.unpaid > 0 {
            env.events.emit(FarmEvent::RewarderPaid {
                rewarder: payout.rewarder,
                account: *account,
                token: payout.token,
                amount: payout.paid,
                unpaid: payout.unpaid,
            });
        }
        Ok(Some(payout))
    }

    /// Stake `amount` of the pool's token, claiming pending rewards first.
    /// `amount = 0` only claims.
    pub fn deposit(
        &mut self,
        ctx: &CallContext,
        env: &mut FarmEnv<'_>,
        pid: PoolId,
        amount: Amount,
    ) -> Result<Settlement, FarmError> {
        let account = ctx.sender;
        let mut pool = self.pool(pid)?.clone();
        self.accrue_staged(pid, &mut pool, ctx.now, env)?;

        let mut position = self.position(pid, &account);
        let harvested = self.harvest(env, pid, &pool, &position, &account)?;

        position.amount = math::add(position.amount, amount, "position amount")?;
        position.reward_debt = accumulator::accrued(position.amount, pool.acc_reward_per_share)?;
        pool.total_staked = math::add(pool.total_staked, amount, "pool stake")?;

        let bonus = self.notify_rewarder(env, &pool, &account, position.amount, ctx.now)?;
        if amount > 0 {
            env.ledger.transfer_from(
                &pool.stake_token,
                &self.address,
                &account,
                &self.address,
                amount,
            )?;
        }

        self.pools[pid] = pool;
        self.positions.insert((pid, account), position);
        env.events.emit(FarmEvent::Deposit {
            account,
            pid,
            amount,
        });
        info!(
            target: "farm",
            "Pool {}: {} deposited {}, harvested {}",
            pid, account, amount, harvested
        );
        Ok(Settlement {
            pid,
            account,
            amount,
            harvested,
            bonus,
        })
    }

    /// Unstake `amount`, claiming pending rewards first.
    pub fn withdraw(
        &mut self,
        ctx: &CallContext,
        env: &mut FarmEnv<'_>,
        pid: PoolId,
        amount: Amount,
    ) -> Result<Settlement, FarmError> {
        let account = ctx.sender;
        let mut pool = self.pool(pid)?.clone();
        let mut position = self.position(pid, &account);
        if amount > position.amount {
            return Err(FarmError::InsufficientBalance {
                requested: amount,
                available: position.amount,
            });
        }
        self.accrue_staged(pid, &mut pool, ctx.now, env)?;

        let harvested = self.harvest(env, pid, &pool, &position, &account)?;

        position.amount -= amount;
        position.reward_debt = accumulator::accrued(position.amount, pool.acc_reward_per_share)?;
        pool.total_staked = math::sub(pool.total_staked, amount, "pool stake")?;

        let bonus = self.notify_rewarder(env, &pool, &account, position.amount, ctx.now)?;
        if amount > 0 {
            env.ledger
                .transfer(&pool.stake_token, &self.address, &account, amount)?;
        }

        self.pools[pid] = pool;
        self.store_position(pid, account, position);
        env.events.emit(FarmEvent::Withdraw {
            account,
            pid,
            amount,
        });
        info!(
            target: "farm",
            "Pool {}: {} withdrew {}, harvested {}",
            pid, account, amount, harvested
        );
        Ok(Settlement {
            pid,
            account,
            amount,
            harvested,
            bonus,
        })
    }

    /// Return the whole stake without accruing or paying anything. Pending
    /// native and bonus rewards are forfeited.
    pub fn emergency_withdraw(
        &mut self,
        ctx: &CallContext,
        env: &mut FarmEnv<'_>,
        pid: PoolId,
    ) -> Result<Settlement, FarmError> {
        let account = ctx.sender;
        let mut pool = self.pool(pid)?.clone();
        let position = self.position(pid, &account);
        let amount = position.amount;

        let forfeited = match self.project(&pool, ctx.now) {
            Ok(projected) => {
                let acc = projected.map_or(pool.acc_reward_per_share, |(_, acc)| acc);
                accumulator::pending(amount, acc, position.reward_debt).unwrap_or(0)
            }
            Err(_) => 0,
        };
        pool.total_staked = pool.total_staked.saturating_sub(amount);

        if let Some(address) = pool.rewarder {
            let hook = HookContext {
                caller: self.address,
                now: ctx.now,
            };
            match env.rewarders.get_mut(&address) {
                Some(rewarder) => {
                    if let Err(err) = rewarder.on_emergency_withdraw(&hook, &*env.ledger, &account)
                    {
                        warn!(
                            target: "farm",
                            "Pool {}: rewarder {} failed during emergency withdraw: {}",
                            pid, address, err
                        );
                    }
                }
                None => warn!(
                    target: "farm",
                    "Pool {}: rewarder {} missing during emergency withdraw",
                    pid, address
                ),
            }
        }

        if amount > 0 {
            env.ledger
                .transfer(&pool.stake_token, &self.address, &account, amount)?;
        }

        self.pools[pid] = pool;
        self.positions.remove(&(pid, account));
        env.events.emit(FarmEvent::EmergencyWithdraw {
            account,
            pid,
            amount,
            forfeited,
        });
        warn!(
            target: "farm",
            "Pool {}: {} emergency withdrew {}, forfeiting {}",
            pid, account, amount, forfeited
        );
        Ok(Settlement {
            pid,
            account,
            amount,
            harvested: 0,
            bonus: None,
        })
    }

    fn store_position(&mut self, pid: PoolId, account: Address, position: UserPosition) {
        if position == UserPosition::default() {
            self.positions.remove(&(pid, account));
        } else {
            self.positions.insert((pid, account), position);
        }
    }

    // -------------------------------------------------------------------------
    // Governance
    // -------------------------------------------------------------------------

    fn ensure_owner(&self, ctx: &CallContext) -> Result<(), FarmError> {
        if ctx.sender != self.owner {
            return Err(FarmError::Unauthorized("caller is not the owner"));
        }
        Ok(())
    }

    /// A bound rewarder must be registered and measure the pool's stake token.
    fn ensure_rewarder(
        &self,
        rewarders: &RewarderRegistry,
        rewarder: Option<Address>,
        stake_token: Address,
    ) -> Result<(), FarmError> {
        let Some(address) = rewarder else {
            return Ok(());
        };
        let measures = rewarders
            .get(&address)
            .ok_or_else(|| {
                FarmError::InvalidConfiguration(format!("rewarder {address} is not registered"))
            })?
            .stake_token();
        if measures != stake_token {
            return Err(FarmError::RewarderStakeMismatch {
                rewarder: address,
                measures,
                stake_token,
            });
        }
        Ok(())
    }

    /// Add a pool for `stake_token`. Brings every pool current first.
    pub fn register_pool(
        &mut self,
        ctx: &CallContext,
        env: &mut FarmEnv<'_>,
        alloc_point: u64,
        stake_token: Address,
        rewarder: Option<Address>,
    ) -> Result<PoolId, FarmError> {
        self.ensure_owner(ctx)?;
        if stake_token.is_zero() {
            return Err(FarmError::InvalidConfiguration(
                "stake token must be non-zero".into(),
            ));
        }
        if self.pool_for_token(&stake_token).is_some() {
            return Err(FarmError::DuplicatePool(stake_token));
        }
        self.ensure_rewarder(env.rewarders, rewarder, stake_token)?;
        let total_alloc_point = self
            .emission
            .total_alloc_point
            .checked_add(alloc_point)
            .ok_or(FarmError::ArithmeticOverflow("total alloc point"))?;

        self.mass_update_pools(ctx, env)?;

        let pid = self.pools.len();
        self.pools.push(Pool {
            stake_token,
            alloc_point,
            last_reward_time: ctx.now.max(self.emission.start_time),
            acc_reward_per_share: 0,
            total_staked: 0,
            rewarder,
        });
        self.emission.total_alloc_point = total_alloc_point;
        env.events.emit(FarmEvent::PoolRegistered {
            pid,
            stake_token,
            alloc_point,
            rewarder,
        });
        info!(
            target: "farm",
            "Registered pool {} for {} with {} alloc points",
            pid, stake_token, alloc_point
        );
        Ok(pid)
    }

    /// Change a pool's weight, and its rewarder when `overwrite_rewarder`.
    pub fn update_pool(
        &mut self,
        ctx: &CallContext,
        env: &mut FarmEnv<'_>,
        pid: PoolId,
        alloc_point: u64,
        rewarder: Option<Address>,
        overwrite_rewarder: bool,
    ) -> Result<(), FarmError> {
        self.ensure_owner(ctx)?;
        let (previous, stake_token) = {
            let pool = self.pool(pid)?;
            (pool.alloc_point, pool.stake_token)
        };
        if overwrite_rewarder {
            self.ensure_rewarder(env.rewarders, rewarder, stake_token)?;
        }
        let total_alloc_point = (self.emission.total_alloc_point - previous)
            .checked_add(alloc_point)
            .ok_or(FarmError::ArithmeticOverflow("total alloc point"))?;

        self.mass_update_pools(ctx, env)?;

        self.emission.total_alloc_point = total_alloc_point;
        let pool = &mut self.pools[pid];
        pool.alloc_point = alloc_point;
        if overwrite_rewarder {
            pool.rewarder = rewarder;
        }
        let current_rewarder = pool.rewarder;
        env.events.emit(FarmEvent::PoolUpdated {
            pid,
            alloc_point,
            rewarder: current_rewarder,
            overwrite_rewarder,
        });
        info!(
            target: "farm",
            "Pool {}: alloc points {} -> {}, rewarder {:?}",
            pid, previous, alloc_point, current_rewarder
        );
        Ok(())
    }

    pub fn set_emission_rate(
        &mut self,
        ctx: &CallContext,
        env: &mut FarmEnv<'_>,
        reward_per_second: Amount,
    ) -> Result<(), FarmError> {
        self.ensure_owner(ctx)?;
        self.mass_update_pools(ctx, env)?;
        let previous = self.emission.reward_per_second;
        self.emission.reward_per_second = reward_per_second;
        env.events.emit(FarmEvent::EmissionRateUpdated {
            caller: ctx.sender,
            reward_per_second,
        });
        info!(
            target: "farm",
            "Emission rate changed from {} to {} per second",
            previous, reward_per_second
        );
        Ok(())
    }

    /// Replace the fund splits. Time elapsed so far is split with the old
    /// policy.
    pub fn set_splits(
        &mut self,
        ctx: &CallContext,
        env: &mut FarmEnv<'_>,
        dev_percent: u16,
        treasury_percent: u16,
        investor_percent: u16,
    ) -> Result<(), FarmError> {
        self.ensure_owner(ctx)?;
        let splits = FundSplits::new(dev_percent, treasury_percent, investor_percent)?;
        self.mass_update_pools(ctx, env)?;
        self.emission.splits = splits;
        env.events.emit(FarmEvent::SplitsUpdated {
            dev_percent,
            treasury_percent,
            investor_percent,
        });
        info!(
            target: "farm",
            "Splits set to dev {}, treasury {}, investor {}, lp {}",
            dev_percent,
            treasury_percent,
            investor_percent,
            splits.lp_percent()
        );
        Ok(())
    }

    /// Only the current holder of `role` may hand it over.
    pub fn set_fund_address(
        &mut self,
        ctx: &CallContext,
        events: &mut dyn EventSink<FarmEvent>,
        role: FundRole,
        address: Address,
    ) -> Result<(), FarmError> {
        let previous = self.emission.funds.get(role);
        if ctx.sender != previous {
            return Err(FarmError::Unauthorized(match role {
                FundRole::Dev => "only the dev address can replace itself",
                FundRole::Treasury => "only the treasury address can replace itself",
                FundRole::Investor => "only the investor address can replace itself",
            }));
        }
        if address.is_zero() {
            return Err(FarmError::InvalidConfiguration(format!(
                "{role} address must be non-zero"
            )));
        }
        self.emission.funds.set(role, address);
        events.emit(FarmEvent::FundAddressUpdated {
            role,
            previous,
            current: address,
        });
        info!(target: "farm", "{} address changed from {} to {}", role, previous, address);
        Ok(())
    }

    /// Move the emission start while emissions have not begun.
    pub fn update_start_time(
        &mut self,
        ctx: &CallContext,
        events: &mut dyn EventSink<FarmEvent>,
        start_time: Timestamp,
    ) -> Result<(), FarmError> {
        self.ensure_owner(ctx)?;
        if ctx.now >= self.emission.start_time {
            return Err(FarmError::InvalidConfiguration(
                "emissions have already started".into(),
            ));
        }
        if start_time <= ctx.now {
            return Err(FarmError::InvalidConfiguration(
                "new start time must be in the future".into(),
            ));
        }
        self.emission.start_time = start_time;
        for pool in &mut self.pools {
            pool.last_reward_time = start_time;
        }
        events.emit(FarmEvent::StartTimeUpdated { start_time });
        info!(target: "farm", "Emission start moved to {}", start_time);
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        ctx: &CallContext,
        events: &mut dyn EventSink<FarmEvent>,
        new_owner: Address,
    ) -> Result<(), FarmError> {
        self.ensure_owner(ctx)?;
        if new_owner.is_zero() {
            return Err(FarmError::InvalidConfiguration(
                "new owner must be non-zero".into(),
            ));
        }
        let previous = self.owner;
        self.owner = new_owner;
        events.emit(FarmEvent::OwnershipTransferred {
            previous,
            current: new_owner,
        });
        info!(target: "farm", "Ownership transferred from {} to {}", previous, new_owner);
        Ok(())
    }
}
