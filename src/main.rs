use std::process::ExitCode;

use clap::Parser;
use plan_forecasts::commands::base_commands::{CliArgs, Commands};
use plan_forecasts::commands::completions_cmd::completions_command;
use plan_forecasts::commands::sensitivity_cmd::sensitivity_command;
use plan_forecasts::commands::simulate_cmd::simulate_command;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_logging();
    let args = CliArgs::parse();
    match args.command {
        cmd @ Commands::Simulate { .. } => simulate_command(cmd),
        cmd @ Commands::Sensitivity { .. } => sensitivity_command(cmd),
        cmd @ Commands::Completions { .. } => completions_command(cmd),
    }
}

// Logs go to stderr so stdout stays clean for reports and completions.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "plan_forecasts=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
