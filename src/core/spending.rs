use super::types::SimulationParameters;

/// What the ledger must do this retired year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeriodCashflow {
    /// Net amount to draw from the accounts.
    Withdraw(f64),
    /// Fixed income beyond the year's spending, reinvested in taxable.
    Deposit(f64),
}

/// Yearly decumulation rule. Essentials are never cut; discretionary
/// spending may be trimmed up to the flexibility ceiling when the year's
/// market gain does not cover the portfolio's share of spending.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpendingPolicy {
    pub min_spending: f64,
    pub discretionary_spending: f64,
    /// Fraction of discretionary spending that may be cut.
    pub cut_flexibility: f64,
    pub fixed_income_annual: f64,
    pub fixed_income_start_age: u32,
}

impl SpendingPolicy {
    pub fn from_params(params: &SimulationParameters) -> Self {
        Self {
            min_spending: params.min_spending,
            discretionary_spending: params.discretionary_spending,
            cut_flexibility: params.spending_cut_flexibility / 100.0,
            fixed_income_annual: params.fixed_income_annual,
            fixed_income_start_age: params.fixed_income_start_age,
        }
    }

    pub fn target_spending(&self) -> f64 {
        self.min_spending + self.discretionary_spending
    }

    pub fn fixed_income_at(&self, age: u32) -> f64 {
        if age >= self.fixed_income_start_age {
            self.fixed_income_annual
        } else {
            0.0
        }
    }

    /// Spending the portfolio must fund before any cut; negative when
    /// fixed income exceeds the target.
    pub fn portfolio_need(&self, age: u32) -> f64 {
        self.target_spending() - self.fixed_income_at(age)
    }

    pub fn max_cut(&self) -> f64 {
        self.discretionary_spending * self.cut_flexibility
    }

    /// `gain` is this year's dollar growth of the whole portfolio.
    pub fn plan(&self, age: u32, gain: f64) -> PeriodCashflow {
        let need = self.portfolio_need(age);

        let withdrawal = if need > 0.0 && gain < need {
            let shortfall = need - gain;
            need - shortfall.min(self.max_cut())
        } else {
            need
        };

        if withdrawal < 0.0 {
            PeriodCashflow::Deposit(-withdrawal)
        } else {
            PeriodCashflow::Withdraw(withdrawal)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn policy(min: f64, discretionary: f64, flex_pct: f64) -> SpendingPolicy {
        SpendingPolicy {
            min_spending: min,
            discretionary_spending: discretionary,
            cut_flexibility: flex_pct / 100.0,
            fixed_income_annual: 0.0,
            fixed_income_start_age: 200,
        }
    }

    fn withdraw_amount(flow: PeriodCashflow) -> f64 {
        match flow {
            PeriodCashflow::Withdraw(v) => v,
            PeriodCashflow::Deposit(v) => panic!("expected withdrawal, got deposit {v}"),
        }
    }

    #[test]
    fn shortfall_cut_is_capped_by_flexibility() {
        // need 60k, gain 40k, discretionary 20k at 50% -> cut 10k.
        let p = policy(40_000.0, 20_000.0, 50.0);
        let amount = withdraw_amount(p.plan(70, 40_000.0));
        assert!((amount - 50_000.0).abs() < EPS);
    }

    #[test]
    fn small_shortfall_is_fully_absorbed_by_cut() {
        let p = policy(40_000.0, 20_000.0, 50.0);
        let amount = withdraw_amount(p.plan(70, 55_000.0));
        assert!((amount - 55_000.0).abs() < EPS);
    }

    #[test]
    fn gain_at_or_above_need_withdraws_full_need() {
        let p = policy(40_000.0, 20_000.0, 50.0);
        assert_eq!(p.plan(70, 60_000.0), PeriodCashflow::Withdraw(60_000.0));
        assert_eq!(p.plan(70, 90_000.0), PeriodCashflow::Withdraw(60_000.0));
    }

    #[test]
    fn essentials_are_never_cut() {
        let p = policy(40_000.0, 20_000.0, 100.0);
        let amount = withdraw_amount(p.plan(70, -500_000.0));
        assert!((amount - 40_000.0).abs() < EPS);
    }

    #[test]
    fn zero_flexibility_never_cuts() {
        let p = policy(40_000.0, 20_000.0, 0.0);
        let amount = withdraw_amount(p.plan(70, -10_000.0));
        assert!((amount - 60_000.0).abs() < EPS);
    }

    #[test]
    fn fixed_income_surplus_becomes_deposit() {
        let mut p = policy(30_000.0, 10_000.0, 50.0);
        p.fixed_income_annual = 50_000.0;
        p.fixed_income_start_age = 67;
        assert_eq!(p.plan(67, 0.0), PeriodCashflow::Deposit(10_000.0));
    }

    #[test]
    fn fixed_income_starts_at_inclusive_age() {
        let mut p = policy(30_000.0, 10_000.0, 0.0);
        p.fixed_income_annual = 15_000.0;
        p.fixed_income_start_age = 67;
        assert_eq!(p.portfolio_need(66), 40_000.0);
        assert_eq!(p.portfolio_need(67), 25_000.0);
    }

    #[test]
    fn exact_coverage_by_fixed_income_withdraws_nothing() {
        let mut p = policy(30_000.0, 10_000.0, 50.0);
        p.fixed_income_annual = 40_000.0;
        p.fixed_income_start_age = 60;
        assert_eq!(p.plan(65, -1_000.0), PeriodCashflow::Withdraw(0.0));
    }
}
