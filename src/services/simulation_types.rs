use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::plan::RiskEvent;
use crate::services::percentiles::PercentileSummary;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum Recommendation {
    Go,
    Caution,
    NoGo,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Recommendation::Go => "GO",
            Recommendation::Caution => "CAUTION",
            Recommendation::NoGo => "NO-GO",
        };
        f.write_str(label)
    }
}

/// Outcome of one iteration. Only the numeric parts outlive the iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario<'plan> {
    pub total_duration: f64,
    pub total_cost: f64,
    pub success: bool,
    pub triggered_risks: Vec<&'plan RiskEvent>,
}

impl Scenario<'_> {
    pub fn triggered_risk_ids(&self) -> impl Iterator<Item = &str> {
        self.triggered_risks.iter().map(|risk| risk.id.as_str())
    }

    pub fn critical_fired(&self) -> bool {
        self.triggered_risks.iter().any(|risk| risk.is_critical())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct SummaryStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl SummaryStats {
    /// Population statistics; all zero for an empty slice.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RiskFrequency {
    pub id: String,
    pub frequency: f64,
}

/// Realized input values per driver, in iteration order. Column `i` of each
/// series belongs to iteration `i` of `SimulationResult::durations`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DriverSamples {
    pub task_ids: Vec<String>,
    pub risk_ids: Vec<String>,
    pub task_durations: Vec<Vec<f64>>,
    pub task_costs: Vec<Vec<f64>>,
    pub risk_triggers: Vec<Vec<bool>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub run_id: Uuid,
    pub plan_name: String,
    pub seed: u64,
    pub requested_runs: usize,
    pub num_runs: usize,
    /// Fewer than `requested_runs` iterations completed.
    pub partial: bool,
    pub success_count: usize,
    pub failure_count: usize,
    pub success_probability: f64,
    pub failure_probability: f64,
    pub delay_probability: f64,
    pub budget_overrun_probability: f64,
    pub critical_risk_probability: f64,
    pub duration_percentiles: PercentileSummary,
    pub cost_percentiles: PercentileSummary,
    pub duration_stats: SummaryStats,
    pub cost_stats: SummaryStats,
    pub risk_frequencies: Vec<RiskFrequency>,
    pub recommendation: Recommendation,
    /// Total duration per iteration, unsorted.
    pub durations: Vec<f64>,
    /// Total cost per iteration, unsorted.
    pub costs: Vec<f64>,
    pub drivers: DriverSamples,
}
