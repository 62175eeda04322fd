use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info};

use super::engine::PathPlan;
use super::error::ParamError;
use super::random::{BoxMullerSource, RandomVariateSource};
use super::types::{
    AggregateResult, PathTrajectory, PercentileBand, RepresentativeYear, SimulationParameters,
};

const P20: usize = 20;
const P50: usize = 50;
const P80: usize = 80;

/// Runs a full batch with the default seeded source: one ChaCha stream per
/// path, derived from `params.seed` and the path index.
pub fn run_simulation(params: &SimulationParameters) -> Result<AggregateResult, ParamError> {
    let seed = params.seed;
    run_simulation_with(params, |path_index| {
        BoxMullerSource::for_path(seed, path_index)
    })
}

/// Runs a batch with a caller-supplied source per path. Paths are executed
/// in parallel and collected in index order.
pub fn run_simulation_with<S, F>(
    params: &SimulationParameters,
    source_for_path: F,
) -> Result<AggregateResult, ParamError>
where
    S: RandomVariateSource,
    F: Fn(u32) -> S + Sync,
{
    params.validate()?;

    let plan = PathPlan::new(params);
    debug!(
        simulations = params.simulations,
        horizon = params.horizon(),
        "running simulation batch"
    );

    let paths: Vec<PathTrajectory> = (0..params.simulations)
        .into_par_iter()
        .map(|path_index| {
            let mut source = source_for_path(path_index);
            plan.simulate(&mut source)
        })
        .collect();

    let result = aggregate(params, &paths);
    info!(
        success_rate = result.success_rate,
        median_end_wealth = result.median_end_wealth,
        survival_age = ?result.survival_age,
        "simulation batch complete"
    );
    Ok(result)
}

/// Folds `paths` (all of identical length) into the batch summary.
pub fn aggregate(params: &SimulationParameters, paths: &[PathTrajectory]) -> AggregateResult {
    let n = paths.len();
    let years = paths.first().map_or(0, |p| p.len());
    let initial_net_worth = params.initial_net_worth();

    let mut probability_data = Vec::with_capacity(years);
    let mut column = Vec::with_capacity(n);
    for idx in 0..years {
        column.clear();
        column.extend(paths.iter().map(|p| p[idx].total));
        column.sort_by(|a, b| a.total_cmp(b));
        probability_data.push(PercentileBand {
            age: params.current_age + idx as u32,
            p20: nearest_rank(&column, P20),
            p50: nearest_rank(&column, P50),
            p80: nearest_rank(&column, P80),
        });
    }

    let median_data = representative_path(paths)
        .map(|path| {
            path.iter()
                .enumerate()
                .map(|(idx, year)| RepresentativeYear {
                    age: params.current_age + idx as u32,
                    taxable: year.taxable,
                    pretax: year.pretax,
                    roth: year.roth,
                    total: year.total,
                })
                .collect()
        })
        .unwrap_or_default();

    let successes = paths
        .iter()
        .filter(|p| p.last().is_some_and(|y| y.total >= initial_net_worth))
        .count();
    let success_rate = if n == 0 {
        0.0
    } else {
        successes as f64 / n as f64
    };

    let median_end_wealth = probability_data.last().map_or(0.0, |band| band.p50);
    let survival_age = probability_data
        .iter()
        .find(|band| band.p20 <= 0.0)
        .map(|band| band.age);

    AggregateResult {
        probability_data,
        median_data,
        success_rate,
        median_end_wealth,
        survival_age,
        initial_net_worth,
        simulations: n as u32,
    }
}

/// Value at rank `floor(len * pct / 100)` of an ascending slice.
fn nearest_rank(sorted: &[f64], pct: usize) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (sorted.len() * pct / 100).min(sorted.len() - 1);
    sorted[rank]
}

/// Path ranked at the median by terminal total balance.
fn representative_path(paths: &[PathTrajectory]) -> Option<&PathTrajectory> {
    let mut order: Vec<(f64, usize)> = paths
        .iter()
        .enumerate()
        .filter_map(|(idx, p)| p.last().map(|y| (y.total, idx)))
        .collect();
    if order.is_empty() {
        return None;
    }
    order.sort_by(|a, b| a.0.total_cmp(&b.0));
    let rank = (order.len() * P50 / 100).min(order.len() - 1);
    paths.get(order[rank].1)
}
