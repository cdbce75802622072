use std::time::Instant;

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::debug;

use super::error::SimulationError;
use super::sampler::{fresh_base_seed, standard_normal, trajectory_rng};
use super::stress::run_stress_test;
use super::types::{
    GoalResult, PercentileSummary, Percentiles, ProjectionInputs, SimulationOutcome,
    SimulationRequest, SimulationSettings,
};

const MONTHS_PER_YEAR: f64 = 12.0;

/// Dispatches a request to exactly one compute path. Outcomes that overflowed
/// to infinity or NaN are reported as errors rather than returned.
pub fn run_simulation(
    request: &SimulationRequest,
    settings: SimulationSettings,
) -> Result<SimulationOutcome, SimulationError> {
    let started = Instant::now();
    let outcome = match request {
        SimulationRequest::MonteCarlo(projection) => {
            SimulationOutcome::MonteCarlo(run_monte_carlo(projection, settings))
        }
        SimulationRequest::StressTest {
            portfolio_value,
            allocation,
        } => SimulationOutcome::StressTest(run_stress_test(*portfolio_value, *allocation)),
        SimulationRequest::GoalProbability {
            projection,
            target_amount,
        } => SimulationOutcome::GoalProbability(run_goal_probability(
            projection,
            *target_amount,
            settings,
        )),
    };
    debug!(
        simulation_type = %request.simulation_type(),
        iterations = settings.iterations,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "simulation finished"
    );

    if !outcome.is_finite() {
        return Err(SimulationError::NonFiniteResult(request.simulation_type()));
    }
    Ok(outcome)
}

pub fn run_monte_carlo(
    projection: &ProjectionInputs,
    settings: SimulationSettings,
) -> PercentileSummary {
    let mut terminal_values = simulate_terminal_values(projection, settings);
    summarize_terminal_values(&mut terminal_values, projection.initial_amount)
}

pub fn run_goal_probability(
    projection: &ProjectionInputs,
    target_amount: f64,
    settings: SimulationSettings,
) -> GoalResult {
    let terminal_values = simulate_terminal_values(projection, settings);
    summarize_goal(&terminal_values, target_amount)
}

/// Terminal value of every trajectory, indexed by trajectory.
fn simulate_terminal_values(
    projection: &ProjectionInputs,
    settings: SimulationSettings,
) -> Vec<f64> {
    let base_seed = settings.seed.unwrap_or_else(fresh_base_seed);
    (0..settings.iterations)
        .into_par_iter()
        .map(|trajectory| {
            let mut rng = trajectory_rng(base_seed, trajectory);
            simulate_trajectory(projection, || standard_normal(&mut rng))
        })
        .collect()
}

/// Compounds one trajectory month by month. Growth applies to the existing
/// balance before the month's contribution lands. Balances are not floored.
fn simulate_trajectory(
    projection: &ProjectionInputs,
    mut next_deviate: impl FnMut() -> f64,
) -> f64 {
    let monthly_mean = projection.expected_return / MONTHS_PER_YEAR;
    let monthly_vol = projection.volatility / MONTHS_PER_YEAR.sqrt();

    let mut value = projection.initial_amount;
    for _ in 0..projection.months() {
        let monthly_growth = monthly_mean + next_deviate() * monthly_vol;
        value = value * (1.0 + monthly_growth) + projection.monthly_contribution;
    }
    value
}

fn summarize_terminal_values(values: &mut [f64], initial_amount: f64) -> PercentileSummary {
    if values.is_empty() {
        return PercentileSummary {
            percentiles: Percentiles {
                p10: 0.0,
                p25: 0.0,
                p50: 0.0,
                p75: 0.0,
                p90: 0.0,
            },
            success_rate: 0.0,
            mean: 0.0,
            standard_deviation: 0.0,
        };
    }

    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let at_or_above_start = values.iter().filter(|v| **v >= initial_amount).count();

    PercentileSummary {
        percentiles: Percentiles {
            p10: percentile(values, 0.10),
            p25: percentile(values, 0.25),
            p50: percentile(values, 0.50),
            p75: percentile(values, 0.75),
            p90: percentile(values, 0.90),
        },
        success_rate: 100.0 * at_or_above_start as f64 / n,
        mean,
        standard_deviation: variance.sqrt(),
    }
}

fn summarize_goal(values: &[f64], target_amount: f64) -> GoalResult {
    if values.is_empty() {
        return GoalResult {
            probability: 0.0,
            average_overage: 0.0,
        };
    }

    let (successes, overage_sum) = values
        .iter()
        .filter(|v| **v >= target_amount)
        .fold((0_usize, 0.0_f64), |(count, sum), v| {
            (count + 1, sum + (v - target_amount))
        });

    GoalResult {
        probability: 100.0 * successes as f64 / values.len() as f64,
        average_overage: if successes == 0 {
            0.0
        } else {
            overage_sum / successes as f64
        },
    }
}

/// Nearest-rank read of an ascending slice at index floor(n * p).
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (sorted.len() as f64 * p).floor() as usize;
    sorted[rank.min(sorted.len() - 1)]
}
