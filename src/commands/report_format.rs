use crate::services::output_formatter::FormattedResult;
use crate::services::sensitivity::{OutputMetric, SensitivityDriver};
use crate::services::simulation_types::SimulationResult;

pub fn format_simulation_report(result: &SimulationResult, formatted: &FormattedResult) -> String {
    let iterations = if result.partial {
        format!(
            "{} (partial, {} requested)",
            result.num_runs, result.requested_runs
        )
    } else {
        result.num_runs.to_string()
    };

    let mut lines = Vec::new();
    lines.push("Simulation Report".to_string());
    lines.push(format!("Plan: {}", result.plan_name));
    lines.push(format!("Seed: {}", result.seed));
    lines.push(format!("Iterations: {iterations}"));
    lines.push(format!(
        "Success probability: {}",
        percent(formatted.success_probability)
    ));
    lines.push(format!(
        "Failure probability: {}",
        percent(formatted.failure_probability)
    ));
    lines.push(format!(
        "Delay probability: {}",
        percent(result.delay_probability)
    ));
    lines.push(format!(
        "Budget overrun probability: {}",
        percent(result.budget_overrun_probability)
    ));
    lines.push(format!("Recommendation: {}", formatted.recommendation));
    lines.push(String::new());
    lines.push("Percentiles:".to_string());
    lines.push("Percentile | Duration | Cost".to_string());
    lines.push("-----------|----------|-----".to_string());
    let duration = &formatted.duration_percentiles;
    let cost = &formatted.cost_percentiles;
    lines.push(format_percentile_row("P10", duration.p10, cost.p10));
    lines.push(format_percentile_row("P50", duration.p50, cost.p50));
    lines.push(format_percentile_row("P90", duration.p90, cost.p90));
    lines.push(String::new());
    lines.push(formatted.narrative.clone());

    lines.join("\n")
}

pub fn format_sensitivity_report(metric: OutputMetric, drivers: &[SensitivityDriver]) -> String {
    let metric = match metric {
        OutputMetric::TotalDuration => "total duration",
        OutputMetric::TotalCost => "total cost",
    };

    let mut lines = Vec::new();
    lines.push(format!("Sensitivity of {metric}"));
    lines.push("Rank | Driver | Score | Variance".to_string());
    lines.push("-----|--------|-------|---------".to_string());
    for driver in drivers {
        lines.push(format!(
            "{} | {} | {:.3} | {:.2}",
            driver.rank, driver.name, driver.sensitivity_score, driver.variance_contribution
        ));
    }
    lines.join("\n")
}

fn percent(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

fn format_percentile_row(label: &str, duration: f64, cost: f64) -> String {
    format!("{label} | {duration:.2} | {cost:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::output_formatter::OutputFormatter;
    use crate::services::run_config::RunConfiguration;
    use crate::services::sensitivity::DriverKind;
    use crate::services::simulation::run_simulation;
    use crate::test_support::reference_plan;

    fn build_report() -> (SimulationResult, FormattedResult) {
        let result =
            run_simulation(&reference_plan(), &RunConfiguration::with_runs(500).seeded(4)).unwrap();
        let formatted = OutputFormatter::default()
            .format_simulation_result(&result)
            .unwrap();
        (result, formatted)
    }

    #[test]
    fn format_simulation_report_includes_header_and_table() {
        let (result, formatted) = build_report();
        let output = format_simulation_report(&result, &formatted);

        assert!(output.contains("Simulation Report"));
        assert!(output.contains("Plan: Reference"));
        assert!(output.contains("Seed: 4"));
        assert!(output.contains("Iterations: 500"));
        assert!(output.contains(&format!("Recommendation: {}", formatted.recommendation)));
        assert!(output.contains("Percentile | Duration | Cost"));
        assert!(output.contains(&format!(
            "P50 | {:.2} | {:.2}",
            formatted.duration_percentiles.p50, formatted.cost_percentiles.p50
        )));
        assert!(output.ends_with(&formatted.narrative));
    }

    #[test]
    fn format_simulation_report_marks_partial_runs() {
        let (mut result, formatted) = build_report();
        result.partial = true;
        result.requested_runs = 1_000;

        let output = format_simulation_report(&result, &formatted);
        assert!(output.contains("Iterations: 500 (partial, 1000 requested)"));
    }

    #[test]
    fn format_sensitivity_report_lists_drivers_in_rank_order() {
        let drivers = vec![
            SensitivityDriver {
                name: "R1 risk".to_string(),
                kind: DriverKind::RiskTrigger,
                source_id: "R1".to_string(),
                sensitivity_score: 0.5123,
                variance_contribution: 54.0,
                rank: 1,
            },
            SensitivityDriver {
                name: "T2 duration".to_string(),
                kind: DriverKind::TaskDuration,
                source_id: "T2".to_string(),
                sensitivity_score: 0.4,
                variance_contribution: 42.25,
                rank: 2,
            },
        ];

        let output = format_sensitivity_report(OutputMetric::TotalDuration, &drivers);
        assert!(output.starts_with("Sensitivity of total duration"));
        assert!(output.contains("1 | R1 risk | 0.512 | 54.00"));
        assert!(output.contains("2 | T2 duration | 0.400 | 42.25"));
    }
}
