//! Scripted runs against a [`Runtime`].
//!
//! A scenario is a list of steps, each one operation sent by a named
//! account at a given time. Every step runs as its own transaction; a
//! failing step is reverted and recorded, and the run continues.
//!
//! ```toml
//! [[step]]
//! at = 120
//! from = "alice"
//! action = "deposit"
//! pool = "GTR-WAVAX"
//! amount = "1e18"
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use verdant_farm::{FundRole, Settlement, SplitOutcome};
use verdant_ledger::{StakingVault, TokenLedger};
use verdant_types::{Address, Amount, CallContext, Timestamp};

use crate::config::TokenAmount;
use crate::error::{Result, RuntimeError};
use crate::naming::resolve_account;
use crate::runtime::Runtime;
use crate::state::State;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Transfer {
        token: String,
        to: String,
        amount: TokenAmount,
    },
    /// Omitting `amount` approves without limit.
    Approve {
        token: String,
        spender: String,
        #[serde(default)]
        amount: Option<TokenAmount>,
    },
    Swap {
        token_in: String,
        token_out: String,
        amount: TokenAmount,
    },
    AddLiquidity {
        token_a: String,
        token_b: String,
        amount_a: TokenAmount,
        amount_b: TokenAmount,
    },
    Deposit {
        pool: String,
        amount: TokenAmount,
    },
    Withdraw {
        pool: String,
        amount: TokenAmount,
    },
    Harvest {
        pool: String,
    },
    EmergencyWithdraw {
        pool: String,
    },
    UpdatePool {
        pool: String,
    },
    MassUpdatePools,
    AddPool {
        stake: String,
        alloc_point: u64,
        #[serde(default)]
        rewarder: Option<String>,
    },
    SetPool {
        pool: String,
        alloc_point: u64,
        #[serde(default)]
        rewarder: Option<String>,
        #[serde(default)]
        overwrite_rewarder: bool,
    },
    SetEmissionRate {
        reward_per_second: TokenAmount,
    },
    SetSplits {
        dev_percent: u16,
        treasury_percent: u16,
        investor_percent: u16,
    },
    SetFundAddress {
        role: FundRole,
        address: String,
    },
    UpdateStartTime {
        start_time: Timestamp,
    },
    /// `contract` is `farmer` or `enricher`.
    TransferOwnership {
        contract: String,
        new_owner: String,
    },
    DeployRewarder {
        name: String,
        asset: String,
        stake: String,
        reward_per_second: TokenAmount,
    },
    SetRewardRate {
        rewarder: String,
        reward_per_second: TokenAmount,
    },
    RewarderEmergencyWithdraw {
        rewarder: String,
    },
    SetBridge {
        token: String,
        bridge: String,
    },
    Convert {
        token_a: String,
        token_b: String,
    },
    ConvertMultiple {
        tokens_a: Vec<String>,
        tokens_b: Vec<String>,
    },
    Stake {
        amount: TokenAmount,
    },
    Unstake {
        shares: TokenAmount,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Transfer { .. } => "transfer",
            Action::Approve { .. } => "approve",
            Action::Swap { .. } => "swap",
            Action::AddLiquidity { .. } => "add_liquidity",
            Action::Deposit { .. } => "deposit",
            Action::Withdraw { .. } => "withdraw",
            Action::Harvest { .. } => "harvest",
            Action::EmergencyWithdraw { .. } => "emergency_withdraw",
            Action::UpdatePool { .. } => "update_pool",
            Action::MassUpdatePools => "mass_update_pools",
            Action::AddPool { .. } => "add_pool",
            Action::SetPool { .. } => "set_pool",
            Action::SetEmissionRate { .. } => "set_emission_rate",
            Action::SetSplits { .. } => "set_splits",
            Action::SetFundAddress { .. } => "set_fund_address",
            Action::UpdateStartTime { .. } => "update_start_time",
            Action::TransferOwnership { .. } => "transfer_ownership",
            Action::DeployRewarder { .. } => "deploy_rewarder",
            Action::SetRewardRate { .. } => "set_reward_rate",
            Action::RewarderEmergencyWithdraw { .. } => "rewarder_emergency_withdraw",
            Action::SetBridge { .. } => "set_bridge",
            Action::Convert { .. } => "convert",
            Action::ConvertMultiple { .. } => "convert_multiple",
            Action::Stake { .. } => "stake",
            Action::Unstake { .. } => "unstake",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub at: Timestamp,
    pub from: String,
    /// Signer of the outer transaction when `from` relays on its behalf.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default)]
    pub expect_error: bool,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Read a TOML scenario, or JSON when the file ends in `.json`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| RuntimeError::Scenario(format!("{}: {e}", path.display())))?;
        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&text).map_err(|e| RuntimeError::Scenario(e.to_string()))
        } else {
            Self::from_toml_str(&text)
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| RuntimeError::Scenario(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub index: usize,
    pub at: Timestamp,
    pub from: String,
    pub action: String,
    pub ok: bool,
    pub expect_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Value,
}

impl StepReport {
    pub fn as_expected(&self) -> bool {
        self.ok != self.expect_error
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolReport {
    pub pid: usize,
    pub stake_token: Address,
    pub alloc_point: u64,
    pub total_staked: Amount,
    pub acc_reward_per_share: u128,
    pub rewarder: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub steps: Vec<StepReport>,
    pub unexpected: usize,
    pub reward_supply: Amount,
    pub pools: Vec<PoolReport>,
    pub vault_underlying: Amount,
    pub vault_shares: Amount,
    /// Non-zero balances of every account that sent a step, by symbol.
    pub balances: BTreeMap<String, BTreeMap<String, Amount>>,
    pub events: usize,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.unexpected == 0
    }

    fn capture(state: &State, steps: Vec<StepReport>, accounts: &BTreeSet<String>) -> Result<Self> {
        let ledger = state.ledger();
        let reward_token = state.farmer().emission().reward_token;
        let pools = state
            .farmer()
            .pools()
            .iter()
            .enumerate()
            .map(|(pid, pool)| PoolReport {
                pid,
                stake_token: pool.stake_token,
                alloc_point: pool.alloc_point,
                total_staked: pool.total_staked,
                acc_reward_per_share: pool.acc_reward_per_share,
                rewarder: pool.rewarder,
            })
            .collect();

        let mut balances = BTreeMap::new();
        for label in accounts {
            let account = resolve_account(label)?;
            let mut held = BTreeMap::new();
            for (symbol, token) in state.symbols() {
                let amount = state.balance_of(token, &account);
                if amount > 0 {
                    held.insert(symbol.clone(), amount);
                }
            }
            for pair in state.factory().pairs() {
                let amount = state.balance_of(&pair.address, &account);
                if amount > 0 {
                    let symbol = ledger_symbol(state, &pair.address);
                    held.insert(symbol, amount);
                }
            }
            balances.insert(label.clone(), held);
        }

        let unexpected = steps.iter().filter(|s| !s.as_expected()).count();
        Ok(Self {
            steps,
            unexpected,
            reward_supply: ledger.total_supply(&reward_token),
            pools,
            vault_underlying: state.moneybags().total_underlying(ledger),
            vault_shares: state.moneybags().total_shares(ledger),
            balances,
            events: state.events().len(),
        })
    }
}

fn ledger_symbol(state: &State, token: &Address) -> String {
    state
        .ledger()
        .metadata(token)
        .map(|m| m.symbol.clone())
        .unwrap_or_else(|| token.to_string())
}

fn context(step: &Step) -> Result<CallContext> {
    let sender = resolve_account(&step.from)?;
    Ok(match &step.origin {
        Some(origin) => CallContext::relayed(sender, resolve_account(origin)?, step.at),
        None => CallContext::external(sender, step.at),
    })
}

// Amounts are rendered as strings: JSON values cannot hold every u128.
fn settlement_detail(settlement: Settlement) -> Value {
    json!({
        "pid": settlement.pid,
        "amount": settlement.amount.to_string(),
        "harvested": settlement.harvested.to_string(),
        "bonus": settlement.bonus.map(|bonus| json!({
            "rewarder": bonus.rewarder,
            "token": bonus.token,
            "paid": bonus.paid.to_string(),
            "unpaid": bonus.unpaid.to_string(),
        })),
    })
}

fn split_detail(outcome: SplitOutcome) -> Value {
    json!({
        "dev": outcome.dev.to_string(),
        "treasury": outcome.treasury.to_string(),
        "investor": outcome.investor.to_string(),
        "lp": outcome.lp.to_string(),
    })
}

/// Apply one step. The runtime wraps this in a transaction.
fn apply(state: &mut State, step: &Step) -> Result<Value> {
    let ctx = context(step)?;
    match &step.action {
        Action::Transfer { token, to, amount } => {
            let (token, to) = (state.resolve_token(token)?, resolve_account(to)?);
            state.transfer(&ctx, token, to, amount.0)?;
            Ok(Value::Null)
        }
        Action::Approve {
            token,
            spender,
            amount,
        } => {
            let (token, spender) = (state.resolve_token(token)?, resolve_account(spender)?);
            let amount = amount.map_or(Amount::MAX, |a| a.0);
            state.approve(&ctx, token, spender, amount)?;
            Ok(Value::Null)
        }
        Action::Swap {
            token_in,
            token_out,
            amount,
        } => {
            let (token_in, token_out) = (state.resolve_token(token_in)?, state.resolve_token(token_out)?);
            let out = state.swap(&ctx, token_in, token_out, amount.0)?;
            Ok(json!({ "amount_out": out.to_string() }))
        }
        Action::AddLiquidity {
            token_a,
            token_b,
            amount_a,
            amount_b,
        } => {
            let (a, b) = (state.resolve_token(token_a)?, state.resolve_token(token_b)?);
            let minted = state.add_liquidity(&ctx, a, b, amount_a.0, amount_b.0)?;
            Ok(json!({ "liquidity": minted.to_string() }))
        }
        Action::Deposit { pool, amount } => {
            let pid = state.resolve_pool(pool)?;
            Ok(settlement_detail(state.deposit(&ctx, pid, amount.0)?))
        }
        Action::Withdraw { pool, amount } => {
            let pid = state.resolve_pool(pool)?;
            Ok(settlement_detail(state.withdraw(&ctx, pid, amount.0)?))
        }
        Action::Harvest { pool } => {
            let pid = state.resolve_pool(pool)?;
            Ok(settlement_detail(state.harvest(&ctx, pid)?))
        }
        Action::EmergencyWithdraw { pool } => {
            let pid = state.resolve_pool(pool)?;
            Ok(settlement_detail(state.emergency_withdraw(&ctx, pid)?))
        }
        Action::UpdatePool { pool } => {
            let pid = state.resolve_pool(pool)?;
            Ok(split_detail(state.update_pool(&ctx, pid)?))
        }
        Action::MassUpdatePools => {
            state.mass_update_pools(&ctx)?;
            Ok(Value::Null)
        }
        Action::AddPool {
            stake,
            alloc_point,
            rewarder,
        } => {
            let stake_token = state.resolve_token(stake)?;
            let rewarder = rewarder
                .as_deref()
                .map(|name| state.resolve_rewarder(name))
                .transpose()?;
            let pid = state.add_pool(&ctx, *alloc_point, stake_token, rewarder)?;
            Ok(json!({ "pid": pid }))
        }
        Action::SetPool {
            pool,
            alloc_point,
            rewarder,
            overwrite_rewarder,
        } => {
            let pid = state.resolve_pool(pool)?;
            let rewarder = rewarder
                .as_deref()
                .map(|name| state.resolve_rewarder(name))
                .transpose()?;
            state.set_pool(&ctx, pid, *alloc_point, rewarder, *overwrite_rewarder)?;
            Ok(Value::Null)
        }
        Action::SetEmissionRate { reward_per_second } => {
            state.set_emission_rate(&ctx, reward_per_second.0)?;
            Ok(Value::Null)
        }
        Action::SetSplits {
            dev_percent,
            treasury_percent,
            investor_percent,
        } => {
            state.set_splits(&ctx, *dev_percent, *treasury_percent, *investor_percent)?;
            Ok(Value::Null)
        }
        Action::SetFundAddress { role, address } => {
            state.set_fund_address(&ctx, *role, resolve_account(address)?)?;
            Ok(Value::Null)
        }
        Action::UpdateStartTime { start_time } => {
            state.update_start_time(&ctx, *start_time)?;
            Ok(Value::Null)
        }
        Action::TransferOwnership {
            contract,
            new_owner,
        } => {
            let new_owner = resolve_account(new_owner)?;
            match contract.as_str() {
                "farmer" => state.transfer_farm_ownership(&ctx, new_owner)?,
                "enricher" => state.transfer_enricher_ownership(&ctx, new_owner)?,
                other => {
                    return Err(RuntimeError::Scenario(format!(
                        "no ownable contract named {other}"
                    )))
                }
            }
            Ok(Value::Null)
        }
        Action::DeployRewarder {
            name,
            asset,
            stake,
            reward_per_second,
        } => {
            let asset = state.resolve_asset(asset)?;
            let stake_token = state.resolve_token(stake)?;
            let address = state.deploy_rewarder(&ctx, name, asset, stake_token, reward_per_second.0)?;
            Ok(json!({ "rewarder": address }))
        }
        Action::SetRewardRate {
            rewarder,
            reward_per_second,
        } => {
            let rewarder = state.resolve_rewarder(rewarder)?;
            let previous = state.set_reward_rate(&ctx, rewarder, reward_per_second.0)?;
            Ok(json!({ "previous": previous.to_string() }))
        }
        Action::RewarderEmergencyWithdraw { rewarder } => {
            let rewarder = state.resolve_rewarder(rewarder)?;
            let swept = state.rewarder_emergency_withdraw(&ctx, rewarder)?;
            Ok(json!({ "swept": swept.to_string() }))
        }
        Action::SetBridge { token, bridge } => {
            let (token, bridge) = (state.resolve_token(token)?, state.resolve_token(bridge)?);
            state.set_bridge(&ctx, token, bridge)?;
            Ok(Value::Null)
        }
        Action::Convert { token_a, token_b } => {
            let (a, b) = (state.resolve_token(token_a)?, state.resolve_token(token_b)?);
            let out = state.convert(&ctx, a, b)?;
            Ok(json!({ "reward_out": out.to_string() }))
        }
        Action::ConvertMultiple { tokens_a, tokens_b } => {
            let tokens_a = tokens_a
                .iter()
                .map(|t| state.resolve_token(t))
                .collect::<Result<Vec<_>>>()?;
            let tokens_b = tokens_b
                .iter()
                .map(|t| state.resolve_token(t))
                .collect::<Result<Vec<_>>>()?;
            let out = state.convert_multiple(&ctx, &tokens_a, &tokens_b)?;
            Ok(json!({ "reward_out": out.to_string() }))
        }
        Action::Stake { amount } => {
            let shares = state.stake(&ctx, amount.0)?;
            Ok(json!({ "shares": shares.to_string() }))
        }
        Action::Unstake { shares } => {
            let amount = state.unstake(&ctx, shares.0)?;
            Ok(json!({ "amount": amount.to_string() }))
        }
    }
}

/// Run every step in order and report the outcome and the final state.
pub fn run(runtime: &Runtime, scenario: &Scenario) -> Result<Report> {
    let mut steps = Vec::with_capacity(scenario.steps.len());
    let mut accounts = BTreeSet::new();
    for (index, step) in scenario.steps.iter().enumerate() {
        accounts.insert(step.from.clone());
        let name = step.action.name();
        let outcome = runtime.execute(name, |state| apply(state, step));
        let report = match outcome {
            Ok(detail) => StepReport {
                index,
                at: step.at,
                from: step.from.clone(),
                action: name.to_string(),
                ok: true,
                expect_error: step.expect_error,
                error: None,
                detail,
            },
            Err(err) => StepReport {
                index,
                at: step.at,
                from: step.from.clone(),
                action: name.to_string(),
                ok: false,
                expect_error: step.expect_error,
                error: Some(err.to_string()),
                detail: Value::Null,
            },
        };
        if !report.as_expected() {
            warn!(
                target: "runtime",
                "Step {} ({} by {}) did not go as expected: {}",
                index,
                name,
                step.from,
                report.error.as_deref().unwrap_or("succeeded")
            );
        }
        steps.push(report);
    }

    let report = runtime.view(|state| Report::capture(state, steps, &accounts))?;
    info!(
        target: "runtime",
        "Scenario finished: {} steps, {} unexpected, {} events",
        report.steps.len(),
        report.unexpected,
        report.events
    );
    Ok(report)
}

/// Reward token balance of `account` after a run, for quick checks.
pub fn reward_balance(runtime: &Runtime, account: &str) -> Result<Amount> {
    let account = resolve_account(account)?;
    Ok(runtime.view(|state| {
        let token = state.farmer().emission().reward_token;
        state.balance_of(&token, &account)
    }))
}

/// Address of the vault the enricher forwards to.
pub fn vault_address(runtime: &Runtime) -> Address {
    runtime.view(|state| state.moneybags().address())
}
