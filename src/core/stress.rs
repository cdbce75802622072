use serde::Serialize;

use super::types::{Allocation, Severity, StressResult};

/// Historical shock applied hypothetically to the current allocation.
/// Shocks are percentage moves per asset class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StressScenario {
    pub name: &'static str,
    pub stocks: f64,
    pub bonds: f64,
    pub alternatives: f64,
    pub duration_months: u32,
}

pub const STRESS_SCENARIOS: [StressScenario; 5] = [
    StressScenario {
        name: "2008 Financial Crisis",
        stocks: -37.0,
        bonds: 5.0,
        alternatives: -15.0,
        duration_months: 18,
    },
    StressScenario {
        name: "2020 COVID Crash",
        stocks: -34.0,
        bonds: 8.0,
        alternatives: -22.0,
        duration_months: 6,
    },
    StressScenario {
        name: "2000 Dot-com Bubble",
        stocks: -49.0,
        bonds: 12.0,
        alternatives: -8.0,
        duration_months: 31,
    },
    StressScenario {
        name: "Rising Interest Rates",
        stocks: -12.0,
        bonds: -18.0,
        alternatives: -5.0,
        duration_months: 12,
    },
    StressScenario {
        name: "Inflation Surge",
        stocks: -8.0,
        bonds: -22.0,
        alternatives: 15.0,
        duration_months: 24,
    },
];

impl StressScenario {
    /// Weighted percentage impact on a portfolio with the given allocation.
    pub fn impact(&self, allocation: Allocation) -> f64 {
        (allocation.stocks / 100.0) * self.stocks
            + (allocation.bonds / 100.0) * self.bonds
            + (allocation.alternatives / 100.0) * self.alternatives
    }

    pub fn evaluate(&self, portfolio_value: f64, allocation: Allocation) -> StressResult {
        let impact = self.impact(allocation);
        let recovery = (self.duration_months as f64 * (1.0 + impact.abs() / 20.0)).ceil();

        // Only the reported figure is rounded.
        StressResult {
            scenario: self.name,
            impact: round_to_cents(impact),
            projected_value: (portfolio_value * (1.0 + impact / 100.0)).round(),
            duration: self.duration_months,
            recovery_estimate: recovery as u32,
            severity: Severity::classify(impact),
        }
    }
}

/// Evaluates every catalog entry, in catalog order. The allocation is taken
/// as given; callers are responsible for it summing to 100.
pub fn run_stress_test(portfolio_value: f64, allocation: Allocation) -> Vec<StressResult> {
    STRESS_SCENARIOS
        .iter()
        .map(|scenario| scenario.evaluate(portfolio_value, allocation))
        .collect()
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn all_stocks() -> Allocation {
        Allocation {
            stocks: 100.0,
            bonds: 0.0,
            alternatives: 0.0,
        }
    }

    #[test]
    fn all_stock_portfolio_in_2008_loses_37_percent() {
        let rows = run_stress_test(100_000.0, all_stocks());
        let crisis = &rows[0];
        assert_eq!(crisis.scenario, "2008 Financial Crisis");
        assert_approx(crisis.impact, -37.0);
        assert_approx(crisis.projected_value, 63_000.0);
        assert_eq!(crisis.severity, Severity::Severe);
        // ceil(18 * (1 + 37/20)) = ceil(51.3)
        assert_eq!(crisis.recovery_estimate, 52);
        assert_eq!(crisis.duration, 18);
    }

    #[test]
    fn default_allocation_matches_hand_calculation() {
        let rows = run_stress_test(250_000.0, Allocation::default());

        // 0.6 * -12 + 0.3 * -18 + 0.1 * -5
        let rates = &rows[3];
        assert_eq!(rates.scenario, "Rising Interest Rates");
        assert_approx(rates.impact, -13.1);
        assert_approx(rates.projected_value, 217_250.0);
        assert_eq!(rates.severity, Severity::Mild);
        // ceil(12 * 1.655) = ceil(19.86)
        assert_eq!(rates.recovery_estimate, 20);

        // 0.6 * -8 + 0.3 * -22 + 0.1 * 15
        let inflation = &rows[4];
        assert_approx(inflation.impact, -9.9);
        assert_eq!(inflation.severity, Severity::Mild);

        // 0.6 * -37 + 0.3 * 5 + 0.1 * -15
        let crisis = &rows[0];
        assert_approx(crisis.impact, -22.2);
        assert_eq!(crisis.severity, Severity::Moderate);
    }

    #[test]
    fn positive_impact_still_extends_recovery_and_raises_value() {
        let rows = run_stress_test(
            1_000.0,
            Allocation {
                stocks: 0.0,
                bonds: 0.0,
                alternatives: 100.0,
            },
        );
        let inflation = &rows[4];
        assert_approx(inflation.impact, 15.0);
        assert_approx(inflation.projected_value, 1_150.0);
        assert_eq!(inflation.severity, Severity::Mild);
        // ceil(24 * 1.75)
        assert_eq!(inflation.recovery_estimate, 42);
    }

    #[test]
    fn severity_uses_unrounded_impact_near_threshold() {
        let allocation = Allocation {
            stocks: 71.4381,
            bonds: 28.5619,
            alternatives: 0.0,
        };
        let raw = STRESS_SCENARIOS[0].impact(allocation);
        assert!(raw < -25.0 && raw > -25.01, "raw impact {raw}");

        let crisis = &run_stress_test(100_000.0, allocation)[0];
        assert_approx(crisis.impact, -25.0);
        assert_eq!(crisis.severity, Severity::Severe);
    }

    #[test]
    fn recovery_estimate_uses_unrounded_impact() {
        let allocation = Allocation {
            stocks: 35.7238,
            bonds: 64.2762,
            alternatives: 0.0,
        };
        let crisis = &run_stress_test(100_000.0, allocation)[0];
        assert_approx(crisis.impact, -10.0);
        // ceil(18 * (1 + 10.003996 / 20)) = ceil(27.0036)
        assert_eq!(crisis.recovery_estimate, 28);
        assert_eq!(crisis.severity, Severity::Mild);
    }

    #[test]
    fn severity_thresholds_are_strict() {
        assert_eq!(Severity::classify(-25.0), Severity::Moderate);
        assert_eq!(Severity::classify(-25.01), Severity::Severe);
        assert_eq!(Severity::classify(15.0), Severity::Mild);
        assert_eq!(Severity::classify(-15.5), Severity::Moderate);
        assert_eq!(Severity::classify(0.0), Severity::Mild);
    }

    #[test]
    fn stress_result_serializes_with_web_keys() {
        let rows = run_stress_test(100_000.0, all_stocks());
        let json = serde_json::to_value(&rows[0]).expect("serializable");
        assert_eq!(json["scenario"], "2008 Financial Crisis");
        assert_eq!(json["severity"], "severe");
        assert_eq!(json["projectedValue"], 63_000.0);
        assert_eq!(json["recoveryEstimate"], 52);
        assert_eq!(json["duration"], 18);
    }

    proptest! {
        #[test]
        fn prop_always_five_rows_in_catalog_order(
            portfolio_value in 0u32..5_000_000,
            stocks in 0u32..=100,
            bonds_share in 0u32..=100,
        ) {
            let bonds = (100 - stocks) * bonds_share / 100;
            let allocation = Allocation {
                stocks: stocks as f64,
                bonds: bonds as f64,
                alternatives: (100 - stocks - bonds) as f64,
            };
            let rows = run_stress_test(portfolio_value as f64, allocation);

            prop_assert_eq!(rows.len(), STRESS_SCENARIOS.len());
            for (row, scenario) in rows.iter().zip(STRESS_SCENARIOS.iter()) {
                prop_assert_eq!(row.scenario, scenario.name);
                prop_assert_eq!(row.duration, scenario.duration_months);
                prop_assert!(row.recovery_estimate >= row.duration);
                prop_assert_eq!(row.severity, Severity::classify(scenario.impact(allocation)));
                prop_assert!(row.projected_value >= 0.0);
            }
        }
    }
}
