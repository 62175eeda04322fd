use serde::{Deserialize, Serialize};

use super::error::ParamError;

pub const DEFAULT_SIMULATIONS: u32 = 1000;
pub const DEFAULT_SEED: u64 = 42;
/// Oldest age a projection may run to.
pub const MAX_AGE: u32 = 150;
pub const MAX_SIMULATIONS: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSettings {
    pub balance: f64,
    pub annual_contribution: f64,
}

/// Immutable inputs for one batch. Percent fields are 0..=100; market
/// statistics are real (inflation-adjusted) decimal fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParameters {
    pub current_age: u32,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    pub taxable: AccountSettings,
    pub pretax: AccountSettings,
    pub roth: AccountSettings,
    pub min_spending: f64,
    pub discretionary_spending: f64,
    pub spending_cut_flexibility: f64,
    pub fixed_income_annual: f64,
    pub fixed_income_start_age: u32,
    pub expected_return: f64,
    pub volatility: f64,
    pub income_tax_rate: f64,
    pub capital_gains_inclusion: f64,
    pub simulations: u32,
    pub seed: u64,
}

impl SimulationParameters {
    /// Number of simulated years after the initial snapshot.
    pub fn horizon(&self) -> u32 {
        self.life_expectancy.saturating_sub(self.current_age)
    }

    pub fn initial_net_worth(&self) -> f64 {
        self.taxable.balance + self.pretax.balance + self.roth.balance
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        if self.life_expectancy > MAX_AGE {
            return Err(ParamError::AboveLimit {
                field: "lifeExpectancy",
                value: self.life_expectancy,
                max: MAX_AGE,
            });
        }
        if self.current_age >= self.retirement_age {
            return Err(ParamError::AgeOrder {
                earlier: "currentAge",
                later: "retirementAge",
            });
        }
        if self.retirement_age >= self.life_expectancy {
            return Err(ParamError::AgeOrder {
                earlier: "retirementAge",
                later: "lifeExpectancy",
            });
        }

        for (field, value) in [
            ("taxable.balance", self.taxable.balance),
            ("taxable.annualContribution", self.taxable.annual_contribution),
            ("pretax.balance", self.pretax.balance),
            ("pretax.annualContribution", self.pretax.annual_contribution),
            ("roth.balance", self.roth.balance),
            ("roth.annualContribution", self.roth.annual_contribution),
            ("minSpending", self.min_spending),
            ("discretionarySpending", self.discretionary_spending),
            ("fixedIncomeAnnual", self.fixed_income_annual),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ParamError::NegativeAmount { field, value });
            }
        }

        for (field, value) in [
            ("spendingCutFlexibility", self.spending_cut_flexibility),
            ("incomeTaxRate", self.income_tax_rate),
            ("capitalGainsInclusion", self.capital_gains_inclusion),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ParamError::PercentOutOfRange { field, value });
            }
        }

        if !self.expected_return.is_finite() {
            return Err(ParamError::NonFinite {
                field: "expectedReturn",
            });
        }
        if !self.volatility.is_finite() {
            return Err(ParamError::NonFinite {
                field: "volatility",
            });
        }
        if self.volatility < 0.0 {
            return Err(ParamError::NegativeVolatility(self.volatility));
        }

        if self.simulations == 0 {
            return Err(ParamError::NoSimulations);
        }
        if self.simulations > MAX_SIMULATIONS {
            return Err(ParamError::AboveLimit {
                field: "simulations",
                value: self.simulations,
                max: MAX_SIMULATIONS,
            });
        }

        Ok(())
    }
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            current_age: 35,
            retirement_age: 60,
            life_expectancy: 95,
            taxable: AccountSettings {
                balance: 50_000.0,
                annual_contribution: 10_000.0,
            },
            pretax: AccountSettings {
                balance: 150_000.0,
                annual_contribution: 20_000.0,
            },
            roth: AccountSettings {
                balance: 25_000.0,
                annual_contribution: 6_500.0,
            },
            min_spending: 40_000.0,
            discretionary_spending: 20_000.0,
            spending_cut_flexibility: 50.0,
            fixed_income_annual: 20_000.0,
            fixed_income_start_age: 67,
            expected_return: 0.05,
            volatility: 0.12,
            income_tax_rate: 25.0,
            capital_gains_inclusion: 50.0,
            simulations: DEFAULT_SIMULATIONS,
            seed: DEFAULT_SEED,
        }
    }
}

/// One recorded year of a single path. `total` is always the sum of the
/// three account balances as recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearBalances {
    pub taxable: f64,
    pub pretax: f64,
    pub roth: f64,
    pub total: f64,
}

/// Per-year balances for one path, starting at `current_age`.
pub type PathTrajectory = Vec<YearBalances>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileBand {
    pub age: u32,
    pub p20: f64,
    pub p50: f64,
    pub p80: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepresentativeYear {
    pub age: u32,
    pub taxable: f64,
    pub pretax: f64,
    pub roth: f64,
    pub total: f64,
}

/// Batch summary.
///
/// `probability_data` holds per-age percentiles computed independently for
/// every year. `median_data` is one whole path, the one ranked at the median
/// by terminal wealth; its yearly totals generally differ from the per-year
/// p50 band.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub probability_data: Vec<PercentileBand>,
    pub median_data: Vec<RepresentativeYear>,
    pub success_rate: f64,
    pub median_end_wealth: f64,
    /// First age where the p20 band reaches zero; `None` means the band
    /// lasted through life expectancy.
    pub survival_age: Option<u32>,
    pub initial_net_worth: f64,
    pub simulations: u32,
}
