mod engine;
mod error;
mod sampler;
mod stress;
mod types;

pub use engine::{run_goal_probability, run_monte_carlo, run_simulation};
pub use error::SimulationError;
pub use sampler::{open_unit, standard_normal};
pub use stress::{STRESS_SCENARIOS, StressScenario, run_stress_test};
pub use types::{
    Allocation, DEFAULT_ITERATIONS, GoalResult, PercentileSummary, Percentiles,
    ProjectionInputs, Severity, SimulationOutcome, SimulationRequest, SimulationSettings,
    SimulationType, StressResult,
};
