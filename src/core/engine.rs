use super::ledger::{AccountLedger, Contributions, TaxRates};
use super::random::RandomVariateSource;
use super::spending::{PeriodCashflow, SpendingPolicy};
use super::types::{PathTrajectory, SimulationParameters};

/// Per-path constants derived once from the parameter set.
#[derive(Debug, Clone, Copy)]
pub struct PathPlan {
    current_age: u32,
    retirement_age: u32,
    horizon: u32,
    expected_return: f64,
    volatility: f64,
    start: AccountLedger,
    contributions: Contributions,
    policy: SpendingPolicy,
    rates: TaxRates,
}

impl PathPlan {
    pub fn new(params: &SimulationParameters) -> Self {
        Self {
            current_age: params.current_age,
            retirement_age: params.retirement_age,
            horizon: params.horizon(),
            expected_return: params.expected_return,
            volatility: params.volatility,
            start: AccountLedger::from_params(params),
            contributions: Contributions::from_params(params),
            policy: SpendingPolicy::from_params(params),
            rates: TaxRates::from_params(params),
        }
    }

    pub fn trajectory_len(&self) -> usize {
        self.horizon as usize + 1
    }

    /// Runs one path: an initial snapshot, then one entry per simulated year.
    pub fn simulate<S: RandomVariateSource + ?Sized>(&self, source: &mut S) -> PathTrajectory {
        let mut ledger = self.start;
        let mut trajectory = Vec::with_capacity(self.trajectory_len());
        trajectory.push(ledger.snapshot());

        for step in 1..=self.horizon {
            let age = self.current_age + step;
            let rate = source.sample(self.expected_return, self.volatility);
            step_year(
                &mut ledger,
                age,
                rate,
                self.retirement_age,
                &self.contributions,
                &self.policy,
                self.rates,
            );
            trajectory.push(ledger.snapshot());
        }

        trajectory
    }
}

pub fn simulate_path<S: RandomVariateSource + ?Sized>(
    params: &SimulationParameters,
    source: &mut S,
) -> PathTrajectory {
    PathPlan::new(params).simulate(source)
}

fn step_year(
    ledger: &mut AccountLedger,
    age: u32,
    rate: f64,
    retirement_age: u32,
    contributions: &Contributions,
    policy: &SpendingPolicy,
    rates: TaxRates,
) {
    let before = ledger.total();
    ledger.apply_growth(rate);
    let gain = ledger.total() - before;

    if age < retirement_age {
        ledger.apply_contributions(contributions);
    } else {
        match policy.plan(age, gain) {
            PeriodCashflow::Withdraw(amount) => {
                let _unmet = ledger.withdraw(amount, rates);
            }
            PeriodCashflow::Deposit(amount) => ledger.deposit_surplus(amount),
        }
    }

    ledger.floor_at_zero();
}
