//! Per-mille split of every emission between the fund addresses and
//! liquidity providers.

use std::fmt;

use serde::{Deserialize, Serialize};
use verdant_types::math;
use verdant_types::{Address, Amount};

use crate::error::FarmError;

/// Denominator for all split percentages (per-mille).
pub const PERCENT_DENOMINATOR: u16 = 1000;

/// Role that receives a fixed share of every emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundRole {
    Dev,
    Treasury,
    Investor,
}

impl FundRole {
    pub const ALL: [FundRole; 3] = [FundRole::Dev, FundRole::Treasury, FundRole::Investor];

    pub fn as_str(&self) -> &'static str {
        match self {
            FundRole::Dev => "dev",
            FundRole::Treasury => "treasury",
            FundRole::Investor => "investor",
        }
    }
}

impl fmt::Display for FundRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dev, treasury and investor shares in per-mille. Liquidity providers get
/// whatever is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundSplits {
    pub dev_percent: u16,
    pub treasury_percent: u16,
    pub investor_percent: u16,
}

impl FundSplits {
    pub fn new(dev_percent: u16, treasury_percent: u16, investor_percent: u16) -> Result<Self, FarmError> {
        let splits = Self {
            dev_percent,
            treasury_percent,
            investor_percent,
        };
        splits.validate()?;
        Ok(splits)
    }

    /// Each share and their sum must stay within [`PERCENT_DENOMINATOR`].
    pub fn validate(&self) -> Result<(), FarmError> {
        for role in FundRole::ALL {
            if self.percent_for(role) > PERCENT_DENOMINATOR {
                return Err(FarmError::InvalidConfiguration(format!(
                    "invalid {role} percent value"
                )));
            }
        }
        let total = u32::from(self.dev_percent)
            + u32::from(self.treasury_percent)
            + u32::from(self.investor_percent);
        if total > u32::from(PERCENT_DENOMINATOR) {
            return Err(FarmError::InvalidConfiguration(
                "total percent over max".to_string(),
            ));
        }
        Ok(())
    }

    pub fn percent_for(&self, role: FundRole) -> u16 {
        match role {
            FundRole::Dev => self.dev_percent,
            FundRole::Treasury => self.treasury_percent,
            FundRole::Investor => self.investor_percent,
        }
    }

    /// Share left for liquidity providers.
    pub fn lp_percent(&self) -> u16 {
        PERCENT_DENOMINATOR
            .saturating_sub(self.dev_percent)
            .saturating_sub(self.treasury_percent)
            .saturating_sub(self.investor_percent)
    }

    /// Divide `total` by the configured shares. Fund shares round down and
    /// the rounding dust goes to liquidity providers, so the parts always
    /// sum to `total`.
    pub fn apply(&self, total: Amount) -> Result<SplitOutcome, FarmError> {
        let denominator = Amount::from(PERCENT_DENOMINATOR);
        let dev = math::mul_div(total, self.dev_percent.into(), denominator, "dev share")?;
        let treasury = math::mul_div(
            total,
            self.treasury_percent.into(),
            denominator,
            "treasury share",
        )?;
        let investor = math::mul_div(
            total,
            self.investor_percent.into(),
            denominator,
            "investor share",
        )?;
        let funds = math::add(math::add(dev, treasury, "fund shares")?, investor, "fund shares")?;
        let lp = math::sub(total, funds, "lp share")?;
        Ok(SplitOutcome {
            dev,
            treasury,
            investor,
            lp,
        })
    }
}

/// One emission divided between the funds and liquidity providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitOutcome {
    pub dev: Amount,
    pub treasury: Amount,
    pub investor: Amount,
    pub lp: Amount,
}

impl SplitOutcome {
    pub fn for_role(&self, role: FundRole) -> Amount {
        match role {
            FundRole::Dev => self.dev,
            FundRole::Treasury => self.treasury,
            FundRole::Investor => self.investor,
        }
    }

    pub fn total(&self) -> Amount {
        self.dev
            .saturating_add(self.treasury)
            .saturating_add(self.investor)
            .saturating_add(self.lp)
    }
}

/// Current holder of each fund role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundAddresses {
    pub dev: Address,
    pub treasury: Address,
    pub investor: Address,
}

impl FundAddresses {
    pub fn get(&self, role: FundRole) -> Address {
        match role {
            FundRole::Dev => self.dev,
            FundRole::Treasury => self.treasury,
            FundRole::Investor => self.investor,
        }
    }

    pub fn set(&mut self, role: FundRole, address: Address) {
        match role {
            FundRole::Dev => self.dev = address,
            FundRole::Treasury => self.treasury = address,
            FundRole::Investor => self.investor = address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_validate_bounds() {
        assert!(FundSplits::new(1000, 0, 0).is_ok());
        assert!(FundSplits::new(400, 300, 300).is_ok());

        let err = FundSplits::new(1001, 0, 0).unwrap_err();
        assert_eq!(
            err,
            FarmError::InvalidConfiguration("invalid dev percent value".into())
        );
        let err = FundSplits::new(0, 1001, 0).unwrap_err();
        assert_eq!(
            err,
            FarmError::InvalidConfiguration("invalid treasury percent value".into())
        );
        let err = FundSplits::new(0, 0, 1001).unwrap_err();
        assert_eq!(
            err,
            FarmError::InvalidConfiguration("invalid investor percent value".into())
        );
        let err = FundSplits::new(500, 400, 101).unwrap_err();
        assert_eq!(
            err,
            FarmError::InvalidConfiguration("total percent over max".into())
        );
    }

    #[test]
    fn test_apply_matches_expected_rates() {
        let splits = FundSplits::new(200, 200, 100).unwrap();
        assert_eq!(splits.lp_percent(), 500);
        let outcome = splits.apply(100).unwrap();
        assert_eq!(
            outcome,
            SplitOutcome {
                dev: 20,
                treasury: 20,
                investor: 10,
                lp: 50
            }
        );
    }

    #[test]
    fn test_rounding_dust_goes_to_lp() {
        let splits = FundSplits::new(333, 333, 333).unwrap();
        let outcome = splits.apply(10).unwrap();
        assert_eq!((outcome.dev, outcome.treasury, outcome.investor), (3, 3, 3));
        assert_eq!(outcome.lp, 1);
        assert_eq!(outcome.total(), 10);
    }

    #[test]
    fn test_fund_addresses_by_role() {
        let mut funds = FundAddresses {
            dev: Address([1; 20]),
            treasury: Address([2; 20]),
            investor: Address([3; 20]),
        };
        funds.set(FundRole::Treasury, Address([9; 20]));
        assert_eq!(funds.get(FundRole::Treasury), Address([9; 20]));
        assert_eq!(funds.get(FundRole::Dev), Address([1; 20]));
        assert_eq!(FundRole::Investor.to_string(), "investor");
    }

    proptest! {
        #[test]
        fn split_parts_sum_to_total(
            (dev, treasury, investor) in (0u16..=1000)
                .prop_flat_map(|dev| (Just(dev), 0..=1000 - dev))
                .prop_flat_map(|(dev, treasury)| (Just(dev), Just(treasury), 0..=1000 - dev - treasury)),
            total in 0u128..=u128::MAX / 2,
        ) {
            let splits = FundSplits::new(dev, treasury, investor).unwrap();
            let outcome = splits.apply(total).unwrap();
            prop_assert_eq!(outcome.total(), total);
            prop_assert!(outcome.dev + outcome.treasury + outcome.investor <= total);
        }
    }
}
