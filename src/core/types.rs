use std::fmt;

use serde::Serialize;

pub const DEFAULT_ITERATIONS: u32 = 10_000;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SimulationType {
    MonteCarlo,
    StressTest,
    GoalProbability,
}

impl SimulationType {
    pub fn as_str(self) -> &'static str {
        match self {
            SimulationType::MonteCarlo => "monte-carlo",
            SimulationType::StressTest => "stress-test",
            SimulationType::GoalProbability => "goal-probability",
        }
    }
}

impl fmt::Display for SimulationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentage weights across the three asset classes.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Allocation {
    pub stocks: f64,
    pub bonds: f64,
    pub alternatives: f64,
}

impl Allocation {
    pub fn total(self) -> f64 {
        self.stocks + self.bonds + self.alternatives
    }
}

impl Default for Allocation {
    fn default() -> Self {
        Self {
            stocks: 60.0,
            bonds: 30.0,
            alternatives: 10.0,
        }
    }
}

/// Parameters of the monthly compounding process shared by the projector and
/// the goal estimator.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProjectionInputs {
    pub initial_amount: f64,
    pub monthly_contribution: f64,
    pub years: u32,
    pub expected_return: f64,
    pub volatility: f64,
}

impl ProjectionInputs {
    pub fn months(&self) -> u32 {
        self.years * 12
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SimulationRequest {
    MonteCarlo(ProjectionInputs),
    StressTest {
        portfolio_value: f64,
        allocation: Allocation,
    },
    GoalProbability {
        projection: ProjectionInputs,
        target_amount: f64,
    },
}

impl SimulationRequest {
    pub fn simulation_type(&self) -> SimulationType {
        match self {
            SimulationRequest::MonteCarlo(_) => SimulationType::MonteCarlo,
            SimulationRequest::StressTest { .. } => SimulationType::StressTest,
            SimulationRequest::GoalProbability { .. } => SimulationType::GoalProbability,
        }
    }
}

/// Knobs that are not part of the financial question itself.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SimulationSettings {
    pub iterations: u32,
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Percentiles {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileSummary {
    pub percentiles: Percentiles,
    pub success_rate: f64,
    pub mean: f64,
    pub standard_deviation: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    pub fn classify(impact: f64) -> Self {
        let magnitude = impact.abs();
        if magnitude > 25.0 {
            Severity::Severe
        } else if magnitude > 15.0 {
            Severity::Moderate
        } else {
            Severity::Mild
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StressResult {
    pub scenario: &'static str,
    pub impact: f64,
    pub projected_value: f64,
    pub duration: u32,
    pub recovery_estimate: u32,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalResult {
    pub probability: f64,
    pub average_overage: f64,
}

/// Result of one dispatched request; serializes to the bare payload of the
/// selected compute path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SimulationOutcome {
    MonteCarlo(PercentileSummary),
    StressTest(Vec<StressResult>),
    GoalProbability(GoalResult),
}

impl SimulationOutcome {
    /// False when any reported number overflowed to infinity or NaN, which
    /// JSON cannot carry.
    pub fn is_finite(&self) -> bool {
        match self {
            SimulationOutcome::MonteCarlo(summary) => {
                let p = summary.percentiles;
                [
                    p.p10,
                    p.p25,
                    p.p50,
                    p.p75,
                    p.p90,
                    summary.success_rate,
                    summary.mean,
                    summary.standard_deviation,
                ]
                .iter()
                .all(|v| v.is_finite())
            }
            SimulationOutcome::StressTest(rows) => rows
                .iter()
                .all(|row| row.impact.is_finite() && row.projected_value.is_finite()),
            SimulationOutcome::GoalProbability(goal) => {
                goal.probability.is_finite() && goal.average_overage.is_finite()
            }
        }
    }
}
