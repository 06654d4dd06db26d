//! Scenario runs
//!
//! A full season on the sample deployment: farming with a native bonus,
//! fee conversion into the vault, and vault entry and exit.
//!
//! Run with: cargo test -p verdant-runtime --test scenario_run

use verdant_runtime::naming::account_address;
use verdant_runtime::scenario::reward_balance;
use verdant_runtime::{run, DeploymentConfig, Event, Runtime, Scenario};
use verdant_types::{Address, Amount};

const E18: Amount = 1_000_000_000_000_000_000;

const SEASON: &str = r#"
[[step]]
at = 10
from = "lp-provider"
action = "transfer"
token = "GTR-WAVAX"
to = "alice"
amount = "1e18"

[[step]]
at = 10
from = "alice"
action = "approve"
token = "GTR-WAVAX"
spender = "farmer"

[[step]]
at = 20
from = "bob"
action = "deposit"
pool = "GTR-WAVAX"
amount = "1e18"
expect_error = true

[[step]]
at = 100
from = "alice"
action = "deposit"
pool = "GTR-WAVAX"
amount = "1e18"

[[step]]
at = 110
from = "alice"
action = "harvest"
pool = "GTR-WAVAX"

[[step]]
at = 110
from = "alice"
action = "withdraw"
pool = "GTR-WAVAX"
amount = "2e18"
expect_error = true

[[step]]
at = 120
from = "lp-provider"
action = "transfer"
token = "DAI-WAVAX"
to = "enricher"
amount = "1e18"

[[step]]
at = 120
from = "proxy"
origin = "keeper"
action = "convert"
token_a = "DAI"
token_b = "WAVAX"
expect_error = true

[[step]]
at = 121
from = "keeper"
action = "convert"
token_a = "DAI"
token_b = "WAVAX"

[[step]]
at = 130
from = "alice"
action = "approve"
token = "GTR"
spender = "moneybags"

[[step]]
at = 130
from = "alice"
action = "stake"
amount = "1e18"

[[step]]
at = 140
from = "alice"
action = "unstake"
shares = "1e18"
"#;

fn season() -> (Runtime, verdant_runtime::Report) {
    let runtime = Runtime::from_config(&DeploymentConfig::sample()).unwrap();
    let scenario = Scenario::from_toml_str(SEASON).unwrap();
    let report = run(&runtime, &scenario).unwrap();
    (runtime, report)
}

#[test]
fn test_season_runs_as_expected() {
    let (_, report) = season();
    assert!(report.is_success(), "{:#?}", report.steps);
    assert_eq!(report.steps.len(), 12);
    assert!(!report.steps[2].ok);
    assert!(report.steps[2]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("allowance")));
}

#[test]
fn test_season_farm_rewards() {
    let (runtime, report) = season();

    // 10 seconds at 10e18/s, two thirds to this pool, half of that to stakers.
    let harvest = &report.steps[4].detail;
    assert_eq!(harvest["harvested"], "33333333333333000000");
    assert_eq!(harvest["bonus"]["paid"], "10000000000000000");
    assert_eq!(
        reward_balance(&runtime, "dev-fund").unwrap(),
        13_333_333_333_333_333_333
    );
    assert_eq!(
        reward_balance(&runtime, "investors").unwrap(),
        6_666_666_666_666_666_666
    );
    assert_eq!(
        report.reward_supply,
        1_000_000 * E18 + 66_666_666_666_666_666_666
    );
    assert_eq!(report.pools[0].total_staked, E18);
    assert_eq!(report.pools[1].total_staked, 0);

    let native = runtime.view(|s| s.balance_of(&Address::NATIVE, &account_address("alice")));
    assert_eq!(native, 10_000_000_000_000_000);
}

#[test]
fn test_season_fees_enrich_stakers() {
    let (runtime, report) = season();
    let converted: Amount = 1_590_898_251_382_934_275;
    assert_eq!(report.steps[8].detail["reward_out"], converted.to_string());

    // Alice entered an empty-share vault holding the converted fees, so her
    // single share claimed them all on the way out.
    assert_eq!(report.steps[10].detail["shares"], E18.to_string());
    assert_eq!(
        report.steps[11].detail["amount"],
        (E18 + converted).to_string()
    );
    assert_eq!(report.vault_underlying, 0);
    assert_eq!(report.vault_shares, 0);
    assert_eq!(
        reward_balance(&runtime, "alice").unwrap(),
        33_333_333_333_333_000_000 + converted
    );

    let forwarded = runtime
        .events()
        .into_iter()
        .filter(|e| {
            matches!(
                e,
                Event::Enricher(verdant_enricher::EnricherEvent::RewardsForwarded { .. })
            )
        })
        .count();
    assert_eq!(forwarded, 1);
}

#[test]
fn test_report_serializes() {
    let (_, report) = season();
    let text = serde_json::to_string_pretty(&report).unwrap();
    assert!(text.contains("\"unexpected\": 0"));
    assert!(report.balances["alice"].contains_key("GTR"));
}

#[test]
fn test_unexpected_failure_is_counted() {
    let runtime = Runtime::from_config(&DeploymentConfig::sample()).unwrap();
    let scenario = Scenario::from_toml_str(
        r#"
[[step]]
at = 5
from = "stranger"
action = "set_emission_rate"
reward_per_second = 1
"#,
    )
    .unwrap();
    let report = run(&runtime, &scenario).unwrap();
    assert_eq!(report.unexpected, 1);
    assert!(!report.is_success());
}

#[test]
fn test_ownership_handoff() {
    let runtime = Runtime::from_config(&DeploymentConfig::sample()).unwrap();
    let scenario = Scenario::from_toml_str(
        r#"
[[step]]
at = 5
from = "deployer"
action = "transfer_ownership"
contract = "farmer"
new_owner = "multisig"

[[step]]
at = 6
from = "deployer"
action = "set_emission_rate"
reward_per_second = 1
expect_error = true

[[step]]
at = 7
from = "multisig"
action = "set_emission_rate"
reward_per_second = "5e18"

[[step]]
at = 8
from = "deployer"
action = "transfer_ownership"
contract = "vault"
new_owner = "multisig"
expect_error = true
"#,
    )
    .unwrap();
    let report = run(&runtime, &scenario).unwrap();
    assert!(report.is_success(), "{:#?}", report.steps);
    runtime.view(|state| {
        assert_eq!(state.farmer().owner(), account_address("multisig"));
        assert_eq!(state.farmer().emission().reward_per_second, 5 * E18);
    });
}
