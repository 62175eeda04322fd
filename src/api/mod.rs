mod server;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use crate::core::{
    AccountSettings, DEFAULT_SEED, DEFAULT_SIMULATIONS, ParamError, SimulationParameters,
};

pub use server::{router, run_http_server};

#[derive(Parser, Debug)]
#[command(
    name = "fire-projection",
    about = "Monte Carlo retirement projection (taxable + pre-tax + roth, flexible spending)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one batch and print the result as JSON
    Run(RunArgs),
    /// Serve the simulation API over HTTP
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct RunArgs {
    #[arg(long, default_value_t = 35)]
    pub current_age: u32,
    #[arg(long, default_value_t = 60)]
    pub retirement_age: u32,
    #[arg(long, default_value_t = 95, help = "Age to fund through")]
    pub life_expectancy: u32,
    #[arg(long, default_value_t = 50_000.0)]
    pub taxable_balance: f64,
    #[arg(long, default_value_t = 10_000.0)]
    pub taxable_contribution: f64,
    #[arg(long, default_value_t = 150_000.0)]
    pub pretax_balance: f64,
    #[arg(long, default_value_t = 20_000.0)]
    pub pretax_contribution: f64,
    #[arg(long, default_value_t = 25_000.0)]
    pub roth_balance: f64,
    #[arg(long, default_value_t = 6_500.0)]
    pub roth_contribution: f64,
    #[arg(
        long,
        default_value_t = 40_000.0,
        help = "Non-negotiable annual spending in retirement"
    )]
    pub min_spending: f64,
    #[arg(long, default_value_t = 20_000.0)]
    pub discretionary_spending: f64,
    #[arg(
        long,
        default_value_t = 50.0,
        help = "Share of discretionary spending that may be cut in a shortfall year, in percent"
    )]
    pub spending_cut_flexibility: f64,
    #[arg(long, default_value_t = 20_000.0)]
    pub fixed_income_annual: f64,
    #[arg(long, default_value_t = 67, help = "First age receiving fixed income")]
    pub fixed_income_start_age: u32,
    #[arg(
        long,
        default_value_t = 5.0,
        allow_negative_numbers = true,
        help = "Expected annual real return in percent"
    )]
    pub expected_return: f64,
    #[arg(long, default_value_t = 12.0, help = "Annual real return volatility in percent")]
    pub volatility: f64,
    #[arg(long, default_value_t = 25.0, help = "Income tax rate in percent")]
    pub income_tax_rate: f64,
    #[arg(
        long,
        default_value_t = 50.0,
        help = "Share of a taxable-account withdrawal counted as income, in percent"
    )]
    pub capital_gains_inclusion: f64,
    #[arg(long, default_value_t = DEFAULT_SIMULATIONS)]
    pub simulations: u32,
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
}

impl Default for RunArgs {
    fn default() -> Self {
        let params = SimulationParameters::default();
        Self {
            current_age: params.current_age,
            retirement_age: params.retirement_age,
            life_expectancy: params.life_expectancy,
            taxable_balance: params.taxable.balance,
            taxable_contribution: params.taxable.annual_contribution,
            pretax_balance: params.pretax.balance,
            pretax_contribution: params.pretax.annual_contribution,
            roth_balance: params.roth.balance,
            roth_contribution: params.roth.annual_contribution,
            min_spending: params.min_spending,
            discretionary_spending: params.discretionary_spending,
            spending_cut_flexibility: params.spending_cut_flexibility,
            fixed_income_annual: params.fixed_income_annual,
            fixed_income_start_age: params.fixed_income_start_age,
            expected_return: 5.0,
            volatility: 12.0,
            income_tax_rate: params.income_tax_rate,
            capital_gains_inclusion: params.capital_gains_inclusion,
            simulations: params.simulations,
            seed: params.seed,
        }
    }
}

/// Web payload; every field is optional and falls back to [`RunArgs`]
/// defaults. Market statistics are in percent, like the CLI flags.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulatePayload {
    current_age: Option<u32>,
    retirement_age: Option<u32>,
    life_expectancy: Option<u32>,

    taxable_balance: Option<f64>,
    taxable_contribution: Option<f64>,
    pretax_balance: Option<f64>,
    pretax_contribution: Option<f64>,
    roth_balance: Option<f64>,
    roth_contribution: Option<f64>,

    min_spending: Option<f64>,
    discretionary_spending: Option<f64>,
    #[serde(alias = "cutFlexibility")]
    spending_cut_flexibility: Option<f64>,
    fixed_income_annual: Option<f64>,
    fixed_income_start_age: Option<u32>,

    expected_return: Option<f64>,
    volatility: Option<f64>,
    income_tax_rate: Option<f64>,
    #[serde(alias = "cgInclusion")]
    capital_gains_inclusion: Option<f64>,

    simulations: Option<u32>,
    seed: Option<u64>,

    /// Identifies an interactive caller; a newer batch from the same session
    /// supersedes one still running.
    session_id: Option<String>,
}

impl SimulatePayload {
    pub fn take_session_id(&mut self) -> Option<String> {
        self.session_id.take()
    }
}

pub fn build_params(args: RunArgs) -> Result<SimulationParameters, ParamError> {
    let params = SimulationParameters {
        current_age: args.current_age,
        retirement_age: args.retirement_age,
        life_expectancy: args.life_expectancy,
        taxable: AccountSettings {
            balance: args.taxable_balance,
            annual_contribution: args.taxable_contribution,
        },
        pretax: AccountSettings {
            balance: args.pretax_balance,
            annual_contribution: args.pretax_contribution,
        },
        roth: AccountSettings {
            balance: args.roth_balance,
            annual_contribution: args.roth_contribution,
        },
        min_spending: args.min_spending,
        discretionary_spending: args.discretionary_spending,
        spending_cut_flexibility: args.spending_cut_flexibility,
        fixed_income_annual: args.fixed_income_annual,
        fixed_income_start_age: args.fixed_income_start_age,
        expected_return: args.expected_return / 100.0,
        volatility: args.volatility / 100.0,
        income_tax_rate: args.income_tax_rate,
        capital_gains_inclusion: args.capital_gains_inclusion,
        simulations: args.simulations,
        seed: args.seed,
    };
    params.validate()?;
    Ok(params)
}

pub fn params_from_payload(payload: SimulatePayload) -> Result<SimulationParameters, ParamError> {
    let mut args = RunArgs::default();

    macro_rules! apply {
        ($($field:ident),* $(,)?) => {
            $(
                if let Some(v) = payload.$field {
                    args.$field = v;
                }
            )*
        };
    }

    apply!(
        current_age,
        retirement_age,
        life_expectancy,
        taxable_balance,
        taxable_contribution,
        pretax_balance,
        pretax_contribution,
        roth_balance,
        roth_contribution,
        min_spending,
        discretionary_spending,
        spending_cut_flexibility,
        fixed_income_annual,
        fixed_income_start_age,
        expected_return,
        volatility,
        income_tax_rate,
        capital_gains_inclusion,
        simulations,
        seed,
    );

    build_params(args)
}

#[cfg(test)]
fn params_from_json(json: &str) -> Result<SimulationParameters, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    params_from_payload(payload).map_err(|e| e.to_string())
}
