use std::process::ExitCode;

use crate::commands::base_commands::{Commands, resolve_run_configuration};
use crate::commands::report_format::format_sensitivity_report;
use crate::services::sensitivity::{OutputMetric, SensitivityAnalyzer};
use crate::services::simulation::simulate_plan_from_yaml_file;

pub fn sensitivity_command(cmd: Commands) -> ExitCode {
    let Commands::Sensitivity {
        input,
        runs,
        seed,
        config,
        metric,
        top,
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

    let simulation = match simulate_plan_from_yaml_file(&input, &run_config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Failed to simulate plan: {e}");
            return ExitCode::FAILURE;
        }
    };

    let metric = OutputMetric::from(metric);
    match SensitivityAnalyzer::new(metric)
        .with_top_k(top)
        .analyze(&simulation)
    {
        Ok(drivers) => {
            println!("{}", format_sensitivity_report(metric, &drivers));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to analyze sensitivity: {e}");
            ExitCode::FAILURE
        }
    }
}
