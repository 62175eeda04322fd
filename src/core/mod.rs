mod aggregate;
mod batch;
mod engine;
mod error;
mod ledger;
mod random;
mod spending;
mod types;

pub use aggregate::{aggregate, run_simulation, run_simulation_with};
pub use batch::{BatchError, BatchOutcome, BatchScheduler, BatchTicket, SessionRegistry, run_batch};
pub use engine::{PathPlan, simulate_path};
pub use error::ParamError;
pub use ledger::{AccountLedger, Contributions, MIN_TAX_FACTOR, TaxRates, effective_tax_factor};
pub use random::{BoxMullerSource, RandomVariateSource, derive_seed};
pub use spending::{PeriodCashflow, SpendingPolicy};
pub use types::{
    AccountSettings, AggregateResult, DEFAULT_SEED, DEFAULT_SIMULATIONS, MAX_AGE, MAX_SIMULATIONS,
    PathTrajectory, PercentileBand, RepresentativeYear, SimulationParameters, YearBalances,
};
