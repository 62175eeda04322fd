use super::types::{SimulationParameters, YearBalances};

/// Lowest effective after-tax factor used in a gross-up division.
pub const MIN_TAX_FACTOR: f64 = 0.01;

/// Clamps an after-tax factor so it can divide a net amount. Anything at or
/// below zero (or NaN) becomes [`MIN_TAX_FACTOR`].
pub fn effective_tax_factor(raw: f64) -> f64 {
    if raw > 0.0 { raw } else { MIN_TAX_FACTOR }
}

/// Withdrawal tax treatment, as fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxRates {
    pub income_tax: f64,
    pub gains_inclusion: f64,
}

impl TaxRates {
    pub fn from_params(params: &SimulationParameters) -> Self {
        Self {
            income_tax: params.income_tax_rate / 100.0,
            gains_inclusion: params.capital_gains_inclusion / 100.0,
        }
    }

    /// Net received per gross unit sold from the taxable account.
    pub fn taxable_factor(self) -> f64 {
        effective_tax_factor(1.0 - self.gains_inclusion * self.income_tax)
    }

    /// Net received per gross unit drawn from the pre-tax account.
    pub fn pretax_factor(self) -> f64 {
        effective_tax_factor(1.0 - self.income_tax)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Contributions {
    pub taxable: f64,
    pub pretax: f64,
    pub roth: f64,
}

impl Contributions {
    pub fn from_params(params: &SimulationParameters) -> Self {
        Self {
            taxable: params.taxable.annual_contribution,
            pretax: params.pretax.annual_contribution,
            roth: params.roth.annual_contribution,
        }
    }
}

/// Account balances for a single simulated path.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AccountLedger {
    pub taxable: f64,
    pub pretax: f64,
    pub roth: f64,
}

impl AccountLedger {
    pub fn from_params(params: &SimulationParameters) -> Self {
        Self {
            taxable: params.taxable.balance,
            pretax: params.pretax.balance,
            roth: params.roth.balance,
        }
    }

    pub fn total(&self) -> f64 {
        self.taxable + self.pretax + self.roth
    }

    pub fn snapshot(&self) -> YearBalances {
        YearBalances {
            taxable: self.taxable,
            pretax: self.pretax,
            roth: self.roth,
            total: self.total(),
        }
    }

    /// One shared return for all three accounts.
    pub fn apply_growth(&mut self, rate: f64) {
        let multiplier = 1.0 + rate;
        self.taxable *= multiplier;
        self.pretax *= multiplier;
        self.roth *= multiplier;
    }

    pub fn apply_contributions(&mut self, amounts: &Contributions) {
        self.taxable += amounts.taxable;
        self.pretax += amounts.pretax;
        self.roth += amounts.roth;
    }

    /// Draws `net_needed` after tax in taxable -> pre-tax -> roth order and
    /// returns the net amount that could not be funded.
    pub fn withdraw(&mut self, net_needed: f64, rates: TaxRates) -> f64 {
        if net_needed <= 0.0 {
            return 0.0;
        }

        let remaining = draw_grossed_up(&mut self.taxable, net_needed, rates.taxable_factor());
        let remaining = draw_grossed_up(&mut self.pretax, remaining, rates.pretax_factor());
        draw_grossed_up(&mut self.roth, remaining, 1.0)
    }

    /// Surplus income is reinvested in the taxable account.
    pub fn deposit_surplus(&mut self, amount: f64) {
        self.taxable += amount;
    }

    pub fn floor_at_zero(&mut self) {
        self.taxable = self.taxable.max(0.0);
        self.pretax = self.pretax.max(0.0);
        self.roth = self.roth.max(0.0);
    }
}

fn draw_grossed_up(balance: &mut f64, net_needed: f64, factor: f64) -> f64 {
    if net_needed <= 0.0 {
        return 0.0;
    }

    let gross = net_needed / factor;
    if *balance >= gross {
        *balance -= gross;
        return 0.0;
    }

    let available = balance.max(0.0);
    *balance = 0.0;
    net_needed - available * factor
}
