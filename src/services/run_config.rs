use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::simulation_types::Recommendation;

pub const DEFAULT_NUM_RUNS: usize = 10_000;
pub const DEFAULT_BATCH_SIZE: usize = 1_024;
pub const DEFAULT_GO_THRESHOLD: f64 = 0.80;
pub const DEFAULT_NO_GO_THRESHOLD: f64 = 0.50;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("threshold {name} = {value} is outside [0, 1]")]
    OutOfRange { name: &'static str, value: f64 },
    #[error("no-go threshold {no_go} exceeds go threshold {go}")]
    Inverted { go: f64, no_go: f64 },
}

#[derive(Error, Debug)]
pub enum RunConfigError {
    #[error("failed to read run configuration: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse run configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("number of runs must be greater than zero")]
    ZeroRuns,
    #[error("batch size must be greater than zero")]
    ZeroBatchSize,
    #[error("worker thread count must be greater than zero")]
    ZeroWorkers,
    #[error("invalid deadline buffer {0}")]
    InvalidDeadlineBuffer(f64),
    #[error("invalid budget tolerance {0}")]
    InvalidBudgetTolerance(f64),
    #[error("invalid recommendation thresholds: {0}")]
    Thresholds(#[from] ThresholdError),
}

/// Success-probability cut-offs for the recommendation tiers.
///
/// GO at or above `go`, NO-GO strictly below `no_go`, CAUTION in between
/// (closed at `no_go`, open at `go`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationThresholds {
    pub go: f64,
    pub no_go: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            go: DEFAULT_GO_THRESHOLD,
            no_go: DEFAULT_NO_GO_THRESHOLD,
        }
    }
}

impl RecommendationThresholds {
    pub fn validate(&self) -> Result<(), ThresholdError> {
        for (name, value) in [("go", self.go), ("no_go", self.no_go)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ThresholdError::OutOfRange { name, value });
            }
        }
        if self.no_go > self.go {
            return Err(ThresholdError::Inverted {
                go: self.go,
                no_go: self.no_go,
            });
        }
        Ok(())
    }

    pub fn classify(&self, success_probability: f64) -> Recommendation {
        if success_probability >= self.go {
            Recommendation::Go
        } else if success_probability < self.no_go {
            Recommendation::NoGo
        } else {
            Recommendation::Caution
        }
    }
}

/// Parameters of one simulation run. Every field has a default, so a YAML
/// file only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfiguration {
    pub num_runs: usize,
    pub seed: Option<u64>,
    pub thresholds: RecommendationThresholds,
    /// Added to the plan deadline before judging success.
    pub deadline_buffer: f64,
    /// Multiplier on the plan budget before judging success.
    pub budget_tolerance: f64,
    pub batch_size: usize,
    pub parallel: bool,
    pub worker_threads: Option<usize>,
    pub iteration_budget: Option<usize>,
    pub timeout_ms: Option<u64>,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            num_runs: DEFAULT_NUM_RUNS,
            seed: None,
            thresholds: RecommendationThresholds::default(),
            deadline_buffer: 0.0,
            budget_tolerance: 1.0,
            batch_size: DEFAULT_BATCH_SIZE,
            parallel: true,
            worker_threads: None,
            iteration_budget: None,
            timeout_ms: None,
        }
    }
}

impl RunConfiguration {
    pub fn with_runs(num_runs: usize) -> Self {
        Self {
            num_runs,
            ..Self::default()
        }
    }

    pub fn seeded(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), RunConfigError> {
        if self.num_runs == 0 {
            return Err(RunConfigError::ZeroRuns);
        }
        if self.batch_size == 0 {
            return Err(RunConfigError::ZeroBatchSize);
        }
        if self.worker_threads == Some(0) {
            return Err(RunConfigError::ZeroWorkers);
        }
        if !self.deadline_buffer.is_finite() || self.deadline_buffer < 0.0 {
            return Err(RunConfigError::InvalidDeadlineBuffer(self.deadline_buffer));
        }
        if !self.budget_tolerance.is_finite() || self.budget_tolerance <= 0.0 {
            return Err(RunConfigError::InvalidBudgetTolerance(self.budget_tolerance));
        }
        self.thresholds.validate()?;
        Ok(())
    }
}

pub fn load_run_configuration_from_yaml_file<P: AsRef<Path>>(
    path: P,
) -> Result<RunConfiguration, RunConfigError> {
    let contents = std::fs::read_to_string(path)?;
    deserialize_run_configuration_from_yaml_str(&contents)
}

pub fn deserialize_run_configuration_from_yaml_str(
    input: &str,
) -> Result<RunConfiguration, RunConfigError> {
    let config: RunConfiguration = serde_yaml::from_str(input)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RunConfiguration::default();
        assert_eq!(config.num_runs, 10_000);
        assert_eq!(config.seed, None);
        assert_eq!(config.thresholds.go, 0.80);
        assert_eq!(config.thresholds.no_go, 0.50);
        assert_eq!(config.budget_tolerance, 1.0);
        assert_eq!(config.deadline_buffer, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn classify_respects_tier_boundaries() {
        let thresholds = RecommendationThresholds::default();
        assert_eq!(thresholds.classify(0.80), Recommendation::Go);
        assert_eq!(thresholds.classify(1.0), Recommendation::Go);
        assert_eq!(thresholds.classify(0.799999), Recommendation::Caution);
        assert_eq!(thresholds.classify(0.50), Recommendation::Caution);
        assert_eq!(thresholds.classify(0.4999), Recommendation::NoGo);
        assert_eq!(thresholds.classify(0.0), Recommendation::NoGo);
    }

    #[test]
    fn partial_yaml_keeps_defaults_for_missing_keys() {
        let yaml = "num_runs: 500\nseed: 42\nthresholds:\n  go: 0.9\n";
        let config = deserialize_run_configuration_from_yaml_str(yaml).unwrap();
        assert_eq!(config.num_runs, 500);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.thresholds.go, 0.9);
        assert_eq!(config.thresholds.no_go, 0.50);
        assert!(config.parallel);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let zero_runs = RunConfiguration::with_runs(0);
        assert!(matches!(zero_runs.validate(), Err(RunConfigError::ZeroRuns)));

        let mut tolerance = RunConfiguration::default();
        tolerance.budget_tolerance = 0.0;
        assert!(matches!(
            tolerance.validate(),
            Err(RunConfigError::InvalidBudgetTolerance(_))
        ));

        let mut inverted = RunConfiguration::default();
        inverted.thresholds = RecommendationThresholds { go: 0.4, no_go: 0.6 };
        assert!(matches!(
            inverted.validate(),
            Err(RunConfigError::Thresholds(ThresholdError::Inverted { .. }))
        ));

        let yaml = "thresholds:\n  go: 1.5\n";
        assert!(matches!(
            deserialize_run_configuration_from_yaml_str(yaml),
            Err(RunConfigError::Thresholds(ThresholdError::OutOfRange { name: "go", .. }))
        ));
    }
}
