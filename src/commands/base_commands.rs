use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::services::run_config::{
    RunConfigError, RunConfiguration, load_run_configuration_from_yaml_file,
};
use crate::services::sensitivity::OutputMetric;

#[derive(Parser)]
#[command(author, version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Simulate a plan with Monte Carlo sampling and write the result as YAML
    Simulate {
        /// Plan YAML file
        #[arg(short, long)]
        input: String,
        /// Output YAML file
        #[arg(short, long)]
        output: String,
        /// Number of simulation iterations (overrides the config file)
        #[arg(short = 'n', long)]
        runs: Option<usize>,
        /// Seed for reproducible runs (overrides the config file)
        #[arg(long)]
        seed: Option<u64>,
        /// Optional run configuration YAML file
        #[arg(short, long)]
        config: Option<String>,
        /// Also write duration and cost histograms next to the output
        #[arg(long)]
        histogram: bool,
    },
    /// Rank the plan inputs driving the variance of a simulated output
    Sensitivity {
        /// Plan YAML file
        #[arg(short, long)]
        input: String,
        /// Number of simulation iterations (overrides the config file)
        #[arg(short = 'n', long)]
        runs: Option<usize>,
        /// Seed for reproducible runs (overrides the config file)
        #[arg(long)]
        seed: Option<u64>,
        /// Optional run configuration YAML file
        #[arg(short, long)]
        config: Option<String>,
        /// Output to decompose
        #[arg(short, long, value_enum, default_value_t = MetricArg::Duration)]
        metric: MetricArg,
        /// Number of drivers to list
        #[arg(short = 'k', long, default_value_t = 5)]
        top: usize,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    Duration,
    Cost,
}

impl From<MetricArg> for OutputMetric {
    fn from(metric: MetricArg) -> Self {
        match metric {
            MetricArg::Duration => OutputMetric::TotalDuration,
            MetricArg::Cost => OutputMetric::TotalCost,
        }
    }
}

/// Config file first, then command-line overrides.
pub fn resolve_run_configuration(
    config_path: Option<&str>,
    runs: Option<usize>,
    seed: Option<u64>,
) -> Result<RunConfiguration, RunConfigError> {
    let mut config = match config_path {
        Some(path) => load_run_configuration_from_yaml_file(path)?,
        None => RunConfiguration::default(),
    };
    if let Some(runs) = runs {
        config.num_runs = runs;
    }
    if seed.is_some() {
        config.seed = seed;
    }
    config.validate()?;
    Ok(config)
}
