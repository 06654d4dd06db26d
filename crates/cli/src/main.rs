//! Verdant command line
//!
//! Validates deployment configs, prints the genesis they produce, plans fee
//! conversions and runs scripted scenarios against an in-memory runtime.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use verdant_enricher::RouteStep;
use verdant_ledger::{StakingVault, TokenLedger};
use verdant_runtime::{parse_amount, run, DeploymentConfig, Runtime, Scenario, State};
use verdant_types::Address;

#[derive(Parser)]
#[command(name = "verdant")]
#[command(about = "Verdant emission farm and fee enricher", long_about = None)]
#[command(version)]
struct Cli {
    /// Deployment config (TOML). `VERDANT_*` variables override its keys.
    #[arg(long, short, global = true, default_value = "verdant.toml")]
    config: PathBuf,

    /// Log output style
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Compact,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sample deployment config
    Init {
        /// Destination file; stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Validate the config and print the genesis it produces
    Check,
    /// Show the swap route the enricher would take for a pair
    Plan {
        token_a: String,
        token_b: String,
    },
    /// Quote an exact-input swap against the genesis reserves
    Quote {
        token_in: String,
        token_out: String,
        /// Integer or scientific amount, e.g. 25e18
        amount: String,
    },
    /// Run a scenario and print the JSON report
    Simulate {
        /// Scenario file (TOML, or JSON with a .json extension)
        #[arg(long, short)]
        scenario: PathBuf,
        /// Also write the report to this file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init(),
    }
}

fn load_runtime(path: &Path) -> Result<Runtime> {
    let config = DeploymentConfig::load(path)
        .with_context(|| format!("failed to load deployment config {}", path.display()))?;
    Runtime::from_config(&config).context("genesis failed")
}

fn symbol_of(state: &State, token: &Address) -> String {
    state
        .ledger()
        .metadata(token)
        .map(|m| m.symbol.clone())
        .unwrap_or_else(|| token.to_string())
}

fn print_genesis(state: &State) {
    let ledger = state.ledger();
    println!("Tokens:");
    for (symbol, address) in state.symbols() {
        println!(
            "  {:<8} {}  supply {}",
            symbol,
            address,
            ledger.total_supply(address)
        );
    }

    println!("Pairs:");
    for pair in state.factory().pairs() {
        println!(
            "  {:<16} {}  reserves {} / {}",
            symbol_of(state, &pair.address),
            pair.address,
            pair.reserve0,
            pair.reserve1
        );
    }

    let emission = state.farmer().emission();
    println!(
        "Farm: {} per second from {}, splits dev {} treasury {} investor {} (per mille)",
        emission.reward_per_second,
        emission.start_time,
        emission.splits.dev_percent,
        emission.splits.treasury_percent,
        emission.splits.investor_percent
    );
    for (pid, pool) in state.farmer().pools().iter().enumerate() {
        let rewarder = pool
            .rewarder
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  pool {:<3} {:<16} alloc {:<6} rewarder {}",
            pid,
            symbol_of(state, &pool.stake_token),
            pool.alloc_point,
            rewarder
        );
    }

    println!("Bridges:");
    for (token, bridge) in state.enricher().graph().edges() {
        println!("  {} -> {}", symbol_of(state, token), symbol_of(state, bridge));
    }
    println!("Vault: {}", state.moneybags().address());
}

fn print_plan(state: &State, token_a: &str, token_b: &str) -> Result<()> {
    let a = state.resolve_token(token_a)?;
    let b = state.resolve_token(token_b)?;
    let plan = state.enricher().plan(state.factory(), a, b)?;
    println!("{} / {}:", token_a, token_b);
    for step in &plan.steps {
        match step {
            RouteStep::Swap { leg, from, to } => println!(
                "  swap   {:?} leg {} -> {}",
                leg,
                symbol_of(state, from),
                symbol_of(state, to)
            ),
            RouteStep::Merge => println!("  merge  legs"),
            RouteStep::Collect { leg } => println!("  collect {:?} leg", leg),
        }
    }
    Ok(())
}

fn print_quote(state: &State, token_in: &str, token_out: &str, amount: &str) -> Result<()> {
    let amount_in = parse_amount(amount)?;
    let (from, to) = (state.resolve_token(token_in)?, state.resolve_token(token_out)?);
    let amount_out = state.factory().quote_exact_in(&from, &to, amount_in)?;
    println!("{} {} -> {} {}", amount_in, token_in, amount_out, token_out);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Init { output } => {
            let text = DeploymentConfig::sample().to_toml_string()?;
            match output {
                Some(path) => {
                    fs::write(&path, text)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!("Sample config written to {}", path.display());
                }
                None => print!("{text}"),
            }
        }
        Commands::Check => {
            let runtime = load_runtime(&cli.config)?;
            runtime.view(print_genesis);
        }
        Commands::Plan { token_a, token_b } => {
            let runtime = load_runtime(&cli.config)?;
            runtime.view(|state| print_plan(state, &token_a, &token_b))?;
        }
        Commands::Quote {
            token_in,
            token_out,
            amount,
        } => {
            let runtime = load_runtime(&cli.config)?;
            runtime.view(|state| print_quote(state, &token_in, &token_out, &amount))?;
        }
        Commands::Simulate { scenario, output } => {
            let runtime = load_runtime(&cli.config)?;
            let script = Scenario::load(&scenario)
                .with_context(|| format!("failed to load scenario {}", scenario.display()))?;
            let report = run(&runtime, &script)?;
            let json = serde_json::to_string_pretty(&report)?;
            if let Some(path) = output {
                fs::write(&path, &json)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            println!("{json}");
            if !report.is_success() {
                bail!(
                    "{} of {} steps did not go as expected",
                    report.unexpected,
                    report.steps.len()
                );
            }
        }
    }
    Ok(())
}
