use std::process::ExitCode;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::commands::base_commands::{Commands, resolve_run_configuration};
use crate::commands::report_format::format_simulation_report;
use crate::domain::plan::PlanSpec;
use crate::services::histogram::{HistogramSpec, write_histogram_png};
use crate::services::output_formatter::{FormattedResult, OutputFormatter};
use crate::services::plan_yaml::load_plan_from_yaml_file;
use crate::services::run_config::RunConfiguration;
use crate::services::simulation::run_simulation;
use crate::services::simulation_types::{RiskFrequency, SimulationResult, SummaryStats};

/// What `simulate` writes to its output file. Raw per-iteration arrays stay
/// out of it.
#[derive(Serialize, Debug)]
pub struct SimulationSummary {
    pub plan: String,
    pub generated_at: String,
    pub run_id: Uuid,
    pub seed: u64,
    pub requested_runs: usize,
    pub result: FormattedResult,
    pub delay_probability: f64,
    pub budget_overrun_probability: f64,
    pub critical_risk_probability: f64,
    pub duration_stats: SummaryStats,
    pub cost_stats: SummaryStats,
    pub risk_frequencies: Vec<RiskFrequency>,
}

impl SimulationSummary {
    pub fn new(result: &SimulationResult, formatted: FormattedResult) -> Self {
        Self {
            plan: result.plan_name.clone(),
            generated_at: Utc::now().to_rfc3339(),
            run_id: result.run_id,
            seed: result.seed,
            requested_runs: result.requested_runs,
            result: formatted,
            delay_probability: result.delay_probability,
            budget_overrun_probability: result.budget_overrun_probability,
            critical_risk_probability: result.critical_risk_probability,
            duration_stats: result.duration_stats,
            cost_stats: result.cost_stats,
            risk_frequencies: result.risk_frequencies.clone(),
        }
    }
}

pub fn simulate_command(cmd: Commands) -> ExitCode {
    let Commands::Simulate {
        input,
        output,
        runs,
        seed,
        config,
        histogram,
    } = cmd
    else {
        return ExitCode::FAILURE;
    };

    let run_config = match resolve_run_configuration(config.as_deref(), runs, seed) {
        Ok(run_config) => run_config,
        Err(e) => {
            eprintln!("Failed to load run configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let plan = match load_plan_from_yaml_file(&input) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Failed to load plan: {e}");
            return ExitCode::FAILURE;
        }
    };

    let simulation = match run_simulation(&plan, &run_config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Failed to simulate plan: {e}");
            return ExitCode::FAILURE;
        }
    };

    let formatted = match OutputFormatter::new(run_config.thresholds)
        .and_then(|formatter| formatter.format_simulation_result(&simulation))
    {
        Ok(formatted) => formatted,
        Err(e) => {
            eprintln!("Failed to format simulation result: {e}");
            return ExitCode::FAILURE;
        }
    };

    let report = format_simulation_report(&simulation, &formatted);
    let summary = SimulationSummary::new(&simulation, formatted);
    let contents = match serialize_summary(&output, &summary) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("Failed to serialize simulation output: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = std::fs::write(&output, contents) {
        eprintln!("Failed to write simulation output: {e}");
        return ExitCode::FAILURE;
    }

    println!("{report}");
    println!("Simulation result written to {output}");

    if histogram {
        return write_histograms(&output, &plan, &run_config, &simulation);
    }
    ExitCode::SUCCESS
}

/// JSON when the output path ends in `.json`, YAML otherwise.
fn serialize_summary(output: &str, summary: &SimulationSummary) -> Result<String, String> {
    if output.ends_with(".json") {
        serde_json::to_string_pretty(summary).map_err(|e| e.to_string())
    } else {
        serde_yaml::to_string(summary).map_err(|e| e.to_string())
    }
}

fn write_histograms(
    output: &str,
    plan: &PlanSpec,
    run_config: &RunConfiguration,
    simulation: &SimulationResult,
) -> ExitCode {
    let duration_path = format!("{output}.duration.png");
    let cost_path = format!("{output}.cost.png");
    let duration_spec = HistogramSpec {
        caption: "Simulated duration",
        x_desc: "Total duration",
        limit: plan
            .deadline
            .map(|deadline| deadline + run_config.deadline_buffer),
    };
    let cost_spec = HistogramSpec {
        caption: "Simulated cost",
        x_desc: "Total cost",
        limit: plan
            .budget
            .map(|budget| budget * run_config.budget_tolerance),
    };

    for (path, values, spec) in [
        (&duration_path, &simulation.durations, &duration_spec),
        (&cost_path, &simulation.costs, &cost_spec),
    ] {
        if let Err(e) = write_histogram_png(path, values, spec) {
            eprintln!("Failed to write simulation histogram: {e}");
            return ExitCode::FAILURE;
        }
        println!("Simulation histogram written to {path}");
    }
    ExitCode::SUCCESS
}
