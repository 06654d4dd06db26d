//! The complete in-memory deployment and one method per operation.
//!
//! `State` is plain data and cheap enough to clone, which is what the
//! [`Runtime`](crate::Runtime) relies on for all-or-nothing execution.
//! Methods here may leave the state half-updated when they fail; callers go
//! through the runtime.

use std::collections::BTreeMap;

use tracing::info;
use verdant_enricher::{Enricher, EnricherConfig, EnricherEnv};
use verdant_farm::{
    FarmEnv, FarmEvent, Farmer, FarmerConfig, FundRole, PendingTokens, PoolId, RewardAsset,
    RewarderRegistry, Settlement, SimpleRewarderPerSec, SplitOutcome,
};
use verdant_ledger::{
    InMemoryLedger, Moneybags, PairFactory, StakingVault, SwapVenue, TokenLedger, TokenMetadata,
};
use verdant_types::{Address, Amount, CallContext, EventSink, Timestamp};

use crate::config::DeploymentConfig;
use crate::error::{Result, RuntimeError};
use crate::event::EventLog;
use crate::naming::{
    contract_address, resolve_account, rewarder_address, token_address, StakeRef, ENRICHER,
    FARMER, MONEYBAGS, NATIVE_ASSET, REWARDER_PREFIX,
};

const NATIVE_SYMBOL: &str = "AVAX";

#[derive(Debug, Clone)]
pub struct State {
    ledger: InMemoryLedger,
    factory: PairFactory,
    farmer: Farmer,
    rewarders: RewarderRegistry,
    enricher: Enricher,
    moneybags: Moneybags,
    symbols: BTreeMap<String, Address>,
    events: EventLog,
}

impl State {
    /// Build the genesis state described by `config`.
    pub fn genesis(config: &DeploymentConfig) -> Result<Self> {
        config.validate()?;
        let now = config.genesis_time;
        let farmer_address = contract_address(FARMER);
        let mut ledger = InMemoryLedger::new();
        let mut symbols = BTreeMap::new();

        let reward = token_address(&config.reward_token.symbol);
        let mut metadata =
            TokenMetadata::new(config.reward_token.symbol.as_str()).with_minter(farmer_address);
        if let Some(cap) = config.reward_token.max_supply {
            metadata = metadata.with_max_supply(cap.0);
        }
        ledger.register_token(reward, metadata)?;
        symbols.insert(config.reward_token.symbol.clone(), reward);

        let base = token_address(&config.base_asset.symbol);
        ledger.register_token(base, TokenMetadata::new(config.base_asset.symbol.as_str()))?;
        symbols.insert(config.base_asset.symbol.clone(), base);

        ledger.register_token(Address::NATIVE, TokenMetadata::new(NATIVE_SYMBOL))?;
        symbols.insert(NATIVE_ASSET.to_string(), Address::NATIVE);

        for token in &config.tokens {
            let address = token_address(&token.symbol);
            if !symbols.contains_key(&token.symbol) {
                ledger.register_token(address, TokenMetadata::new(token.symbol.as_str()))?;
                symbols.insert(token.symbol.clone(), address);
            }
            for (holder, amount) in &token.balances {
                ledger.credit_genesis(&address, &resolve_account(holder)?, amount.0)?;
            }
        }

        let mut factory = PairFactory::new();
        for pair in &config.pairs {
            let (a, b) = (token_address(&pair.token_a), token_address(&pair.token_b));
            factory.create_pair(&mut ledger, a, b)?;
            let provider = resolve_account(&pair.provider)?;
            factory.add_liquidity(&mut ledger, &provider, &a, &b, pair.amount_a.0, pair.amount_b.0)?;
        }

        let moneybags = Moneybags::deploy(
            &mut ledger,
            contract_address(MONEYBAGS),
            reward,
            &config.vault.share_symbol,
        )?;
        symbols.insert(config.vault.share_symbol.clone(), moneybags.address());

        let farmer = Farmer::new(FarmerConfig {
            address: farmer_address,
            owner: resolve_account(&config.farm.owner)?,
            reward_token: reward,
            dev_addr: resolve_account(&config.farm.dev)?,
            treasury_addr: resolve_account(&config.farm.treasury)?,
            investor_addr: resolve_account(&config.farm.investor)?,
            reward_per_second: config.farm.reward_per_second.0,
            start_time: config.farm.start_time,
            dev_percent: config.farm.dev_percent,
            treasury_percent: config.farm.treasury_percent,
            investor_percent: config.farm.investor_percent,
        })?;

        let enricher = Enricher::new(EnricherConfig {
            address: contract_address(ENRICHER),
            owner: resolve_account(&config.enricher.owner)?,
            reward_token: reward,
            base_asset: base,
            vault: moneybags.address(),
        })?;

        let mut state = Self {
            ledger,
            factory,
            farmer,
            rewarders: RewarderRegistry::new(),
            enricher,
            moneybags,
            symbols,
            events: EventLog::new(),
        };

        for rewarder in &config.rewarders {
            let ctx = CallContext::external(resolve_account(&rewarder.owner)?, now);
            let asset = state.resolve_asset(&rewarder.asset)?;
            let stake_token = state.resolve_token(&rewarder.stake)?;
            let address = state.deploy_rewarder(
                &ctx,
                &rewarder.name,
                asset,
                stake_token,
                rewarder.reward_per_second.0,
            )?;
            if rewarder.funding.0 > 0 {
                state
                    .ledger
                    .credit_genesis(&asset.ledger_id(), &address, rewarder.funding.0)?;
            }
        }

        let farm_owner = CallContext::external(state.farmer.owner(), now);
        for pool in &config.pools {
            let stake_token = state.resolve_token(&pool.stake)?;
            let rewarder = pool.rewarder.as_deref().map(rewarder_address);
            state.add_pool(&farm_owner, pool.alloc_point, stake_token, rewarder)?;
        }

        let enricher_owner = CallContext::external(state.enricher.owner(), now);
        for bridge in &config.bridges {
            let (from, to) = (state.resolve_token(&bridge.from)?, state.resolve_token(&bridge.to)?);
            state.set_bridge(&enricher_owner, from, to)?;
        }

        info!(
            target: "runtime",
            "Genesis built with {} tokens, {} pairs, {} pools and {} rewarders",
            state.symbols.len(),
            config.pairs.len(),
            state.farmer.pool_length(),
            state.rewarders.len()
        );
        Ok(state)
    }

    // =========================================================================
    // VIEWS AND NAME RESOLUTION
    // =========================================================================

    pub fn ledger(&self) -> &InMemoryLedger {
        &self.ledger
    }

    pub fn factory(&self) -> &PairFactory {
        &self.factory
    }

    pub fn farmer(&self) -> &Farmer {
        &self.farmer
    }

    pub fn rewarders(&self) -> &RewarderRegistry {
        &self.rewarders
    }

    pub fn enricher(&self) -> &Enricher {
        &self.enricher
    }

    pub fn moneybags(&self) -> &Moneybags {
        &self.moneybags
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn symbols(&self) -> impl Iterator<Item = (&String, &Address)> {
        self.symbols.iter()
    }

    /// A registered token symbol, or `A-B` for a pair's share token.
    pub fn resolve_token(&self, reference: &str) -> Result<Address> {
        match StakeRef::parse(reference) {
            StakeRef::Token(symbol) => self
                .symbols
                .get(symbol)
                .copied()
                .ok_or_else(|| RuntimeError::UnknownSymbol(symbol.to_string())),
            StakeRef::Pair(a, b) => {
                let (a, b) = (self.resolve_token(a)?, self.resolve_token(b)?);
                self.factory
                    .pair_for(&a, &b)
                    .ok_or_else(|| RuntimeError::UnknownSymbol(reference.to_string()))
            }
        }
    }

    pub fn resolve_asset(&self, reference: &str) -> Result<RewardAsset> {
        if reference == NATIVE_ASSET {
            return Ok(RewardAsset::Native);
        }
        Ok(RewardAsset::Token(self.resolve_token(reference)?))
    }

    pub fn resolve_pool(&self, stake: &str) -> Result<PoolId> {
        let token = self.resolve_token(stake)?;
        self.farmer
            .pool_for_token(&token)
            .ok_or_else(|| RuntimeError::UnknownPool(stake.to_string()))
    }

    /// A rewarder by name, with or without the `rewarder:` prefix.
    pub fn resolve_rewarder(&self, name: &str) -> Result<Address> {
        let name = name.strip_prefix(REWARDER_PREFIX).unwrap_or(name);
        let address = rewarder_address(name);
        if !self.rewarders.contains(&address) {
            return Err(RuntimeError::UnknownRewarder(name.to_string()));
        }
        Ok(address)
    }

    pub fn balance_of(&self, token: &Address, account: &Address) -> Amount {
        self.ledger.balance_of(token, account)
    }

    pub fn pending(&self, pid: PoolId, account: &Address, now: Timestamp) -> Result<PendingTokens> {
        Ok(self
            .farmer
            .pending_tokens(pid, account, now, &self.ledger, &self.rewarders)?)
    }

    fn farm(&mut self) -> (&mut Farmer, FarmEnv<'_>) {
        let State {
            farmer,
            ledger,
            rewarders,
            events,
            ..
        } = self;
        (
            farmer,
            FarmEnv {
                ledger,
                rewarders,
                events,
            },
        )
    }

    fn enrich(&mut self) -> (&mut Enricher, EnricherEnv<'_>) {
        let State {
            enricher,
            ledger,
            factory,
            moneybags,
            events,
            ..
        } = self;
        (
            enricher,
            EnricherEnv {
                ledger,
                venue: factory,
                vault: moneybags,
                events,
            },
        )
    }

    // =========================================================================
    // TOKENS AND PAIRS
    // =========================================================================

    pub fn transfer(
        &mut self,
        ctx: &CallContext,
        token: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        self.ledger.transfer(&token, &ctx.sender, &to, amount)?;
        Ok(())
    }

    pub fn approve(
        &mut self,
        ctx: &CallContext,
        token: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<()> {
        self.ledger.approve(&token, &ctx.sender, &spender, amount)?;
        Ok(())
    }

    /// Swap through the direct pair. Trading fees stay in the pair.
    pub fn swap(
        &mut self,
        ctx: &CallContext,
        token_in: Address,
        token_out: Address,
        amount_in: Amount,
    ) -> Result<Amount> {
        Ok(self.factory.swap_exact_in(
            &mut self.ledger,
            &token_in,
            &token_out,
            amount_in,
            &ctx.sender,
            &ctx.sender,
        )?)
    }

    pub fn add_liquidity(
        &mut self,
        ctx: &CallContext,
        token_a: Address,
        token_b: Address,
        amount_a: Amount,
        amount_b: Amount,
    ) -> Result<Amount> {
        Ok(self.factory.add_liquidity(
            &mut self.ledger,
            &ctx.sender,
            &token_a,
            &token_b,
            amount_a,
            amount_b,
        )?)
    }

    // =========================================================================
    // FARM
    // =========================================================================

    pub fn deposit(&mut self, ctx: &CallContext, pid: PoolId, amount: Amount) -> Result<Settlement> {
        let (farmer, mut env) = self.farm();
        Ok(farmer.deposit(ctx, &mut env, pid, amount)?)
    }

    pub fn withdraw(&mut self, ctx: &CallContext, pid: PoolId, amount: Amount) -> Result<Settlement> {
        let (farmer, mut env) = self.farm();
        Ok(farmer.withdraw(ctx, &mut env, pid, amount)?)
    }

    /// Claim without moving stake.
    pub fn harvest(&mut self, ctx: &CallContext, pid: PoolId) -> Result<Settlement> {
        self.deposit(ctx, pid, 0)
    }

    pub fn emergency_withdraw(&mut self, ctx: &CallContext, pid: PoolId) -> Result<Settlement> {
        let (farmer, mut env) = self.farm();
        Ok(farmer.emergency_withdraw(ctx, &mut env, pid)?)
    }

    pub fn update_pool(&mut self, ctx: &CallContext, pid: PoolId) -> Result<SplitOutcome> {
        let (farmer, mut env) = self.farm();
        Ok(farmer.accrue(ctx, &mut env, pid)?)
    }

    pub fn mass_update_pools(&mut self, ctx: &CallContext) -> Result<()> {
        let (farmer, mut env) = self.farm();
        Ok(farmer.mass_update_pools(ctx, &mut env)?)
    }

    pub fn add_pool(
        &mut self,
        ctx: &CallContext,
        alloc_point: u64,
        stake_token: Address,
        rewarder: Option<Address>,
    ) -> Result<PoolId> {
        let (farmer, mut env) = self.farm();
        Ok(farmer.register_pool(ctx, &mut env, alloc_point, stake_token, rewarder)?)
    }

    pub fn set_pool(
        &mut self,
        ctx: &CallContext,
        pid: PoolId,
        alloc_point: u64,
        rewarder: Option<Address>,
        overwrite_rewarder: bool,
    ) -> Result<()> {
        let (farmer, mut env) = self.farm();
        Ok(farmer.update_pool(ctx, &mut env, pid, alloc_point, rewarder, overwrite_rewarder)?)
    }

    pub fn set_emission_rate(&mut self, ctx: &CallContext, reward_per_second: Amount) -> Result<()> {
        let (farmer, mut env) = self.farm();
        Ok(farmer.set_emission_rate(ctx, &mut env, reward_per_second)?)
    }

    pub fn set_splits(
        &mut self,
        ctx: &CallContext,
        dev_percent: u16,
        treasury_percent: u16,
        investor_percent: u16,
    ) -> Result<()> {
        let (farmer, mut env) = self.farm();
        Ok(farmer.set_splits(ctx, &mut env, dev_percent, treasury_percent, investor_percent)?)
    }

    pub fn set_fund_address(&mut self, ctx: &CallContext, role: FundRole, address: Address) -> Result<()> {
        Ok(self.farmer.set_fund_address(ctx, &mut self.events, role, address)?)
    }

    pub fn update_start_time(&mut self, ctx: &CallContext, start_time: Timestamp) -> Result<()> {
        Ok(self.farmer.update_start_time(ctx, &mut self.events, start_time)?)
    }

    pub fn transfer_farm_ownership(&mut self, ctx: &CallContext, new_owner: Address) -> Result<()> {
        Ok(self.farmer.transfer_ownership(ctx, &mut self.events, new_owner)?)
    }

    // =========================================================================
    // REWARDERS
    // =========================================================================

    /// Deploy a per-second rewarder owned by the caller and make it
    /// available to the Farmer's pools.
    pub fn deploy_rewarder(
        &mut self,
        ctx: &CallContext,
        name: &str,
        asset: RewardAsset,
        stake_token: Address,
        reward_per_second: Amount,
    ) -> Result<Address> {
        let rewarder = SimpleRewarderPerSec::new(
            rewarder_address(name),
            ctx.sender,
            asset,
            stake_token,
            reward_per_second,
            self.farmer.address(),
            ctx.now,
        )?;
        let address = self.rewarders.register(Box::new(rewarder))?;
        info!(target: "runtime", "Deployed rewarder {} at {}", name, address);
        Ok(address)
    }

    pub fn set_reward_rate(
        &mut self,
        ctx: &CallContext,
        rewarder: Address,
        reward_per_second: Amount,
    ) -> Result<Amount> {
        let instance = self
            .rewarders
            .get_mut(&rewarder)
            .ok_or_else(|| RuntimeError::UnknownRewarder(rewarder.to_string()))?;
        let previous =
            instance.set_reward_rate(&ctx.sender, &self.ledger, ctx.now, reward_per_second)?;
        self.events.emit(FarmEvent::RewardRateUpdated {
            rewarder,
            previous,
            current: reward_per_second,
        });
        Ok(previous)
    }

    pub fn rewarder_emergency_withdraw(&mut self, ctx: &CallContext, rewarder: Address) -> Result<Amount> {
        let instance = self
            .rewarders
            .get_mut(&rewarder)
            .ok_or_else(|| RuntimeError::UnknownRewarder(rewarder.to_string()))?;
        Ok(instance.emergency_withdraw(&ctx.sender, &mut self.ledger)?)
    }

    // =========================================================================
    // ENRICHER AND VAULT
    // =========================================================================

    pub fn set_bridge(&mut self, ctx: &CallContext, token: Address, bridge: Address) -> Result<()> {
        Ok(self.enricher.set_bridge(ctx, &mut self.events, token, bridge)?)
    }

    pub fn convert(&mut self, ctx: &CallContext, token_a: Address, token_b: Address) -> Result<Amount> {
        let (enricher, mut env) = self.enrich();
        Ok(enricher.convert(ctx, &mut env, token_a, token_b)?)
    }

    pub fn convert_multiple(
        &mut self,
        ctx: &CallContext,
        tokens_a: &[Address],
        tokens_b: &[Address],
    ) -> Result<Amount> {
        let (enricher, mut env) = self.enrich();
        Ok(enricher.convert_multiple(ctx, &mut env, tokens_a, tokens_b)?)
    }

    pub fn transfer_enricher_ownership(&mut self, ctx: &CallContext, new_owner: Address) -> Result<()> {
        Ok(self.enricher.transfer_ownership(ctx, &mut self.events, new_owner)?)
    }

    pub fn stake(&mut self, ctx: &CallContext, amount: Amount) -> Result<Amount> {
        Ok(self.moneybags.stake(&mut self.ledger, &ctx.sender, amount)?)
    }

    pub fn unstake(&mut self, ctx: &CallContext, shares: Amount) -> Result<Amount> {
        Ok(self.moneybags.unstake(&mut self.ledger, &ctx.sender, shares)?)
    }
}
