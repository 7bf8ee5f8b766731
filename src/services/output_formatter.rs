use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::percentiles::PercentileSummary;
use crate::services::run_config::{RecommendationThresholds, ThresholdError};
use crate::services::simulation_types::{Recommendation, SimulationResult};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("{field} = {value} is not a probability in [0, 1]")]
    InvalidProbability { field: &'static str, value: f64 },
    #[error("invalid recommendation thresholds: {0}")]
    Thresholds(#[from] ThresholdError),
}

/// Loosely-typed simulation summary as produced upstream. Percentile maps
/// may be incomplete; absent keys read as `0.0`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct RawSimulationResult {
    #[serde(default)]
    pub num_runs: usize,
    pub success_probability: f64,
    pub failure_probability: f64,
    #[serde(default)]
    pub partial: bool,
    #[serde(default)]
    pub duration_percentiles: BTreeMap<String, f64>,
    #[serde(default)]
    pub cost_percentiles: BTreeMap<String, f64>,
}

impl From<&SimulationResult> for RawSimulationResult {
    fn from(result: &SimulationResult) -> Self {
        Self {
            num_runs: result.num_runs,
            success_probability: result.success_probability,
            failure_probability: result.failure_probability,
            partial: result.partial,
            duration_percentiles: percentile_map(&result.duration_percentiles),
            cost_percentiles: percentile_map(&result.cost_percentiles),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FormattedResult {
    pub num_runs: usize,
    pub partial: bool,
    pub success_probability: f64,
    pub failure_probability: f64,
    pub recommendation: Recommendation,
    pub narrative: String,
    pub duration_percentiles: PercentileSummary,
    pub cost_percentiles: PercentileSummary,
}

/// Pure transform from a raw result to a recommendation and its narrative.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFormatter {
    thresholds: RecommendationThresholds,
}

impl OutputFormatter {
    pub fn new(thresholds: RecommendationThresholds) -> Result<Self, FormatError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> RecommendationThresholds {
        self.thresholds
    }

    pub fn format_results(&self, raw: &RawSimulationResult) -> Result<FormattedResult, FormatError> {
        check_probability("success_probability", raw.success_probability)?;
        check_probability("failure_probability", raw.failure_probability)?;

        let duration_percentiles = summary_from_map(&raw.duration_percentiles);
        let cost_percentiles = summary_from_map(&raw.cost_percentiles);
        let recommendation = self.thresholds.classify(raw.success_probability);
        let narrative = narrative(
            recommendation,
            raw,
            &duration_percentiles,
            &cost_percentiles,
        );

        Ok(FormattedResult {
            num_runs: raw.num_runs,
            partial: raw.partial,
            success_probability: raw.success_probability,
            failure_probability: raw.failure_probability,
            recommendation,
            narrative,
            duration_percentiles,
            cost_percentiles,
        })
    }

    pub fn format_simulation_result(
        &self,
        result: &SimulationResult,
    ) -> Result<FormattedResult, FormatError> {
        self.format_results(&RawSimulationResult::from(result))
    }
}

/// Formats with the default GO/NO-GO thresholds.
pub fn format_results(raw: &RawSimulationResult) -> Result<FormattedResult, FormatError> {
    OutputFormatter::default().format_results(raw)
}

fn check_probability(field: &'static str, value: f64) -> Result<(), FormatError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(FormatError::InvalidProbability { field, value })
    }
}

fn percentile_map(summary: &PercentileSummary) -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("p10".to_string(), summary.p10),
        ("p50".to_string(), summary.p50),
        ("p90".to_string(), summary.p90),
    ])
}

fn summary_from_map(map: &BTreeMap<String, f64>) -> PercentileSummary {
    PercentileSummary {
        p10: lookup_percentile(map, 10),
        p50: lookup_percentile(map, 50),
        p90: lookup_percentile(map, 90),
    }
}

// Accepts both `p50` and bare `50` keys.
fn lookup_percentile(map: &BTreeMap<String, f64>, percentile: u8) -> f64 {
    map.get(&format!("p{percentile}"))
        .or_else(|| map.get(&percentile.to_string()))
        .copied()
        .unwrap_or(0.0)
}

fn narrative(
    recommendation: Recommendation,
    raw: &RawSimulationResult,
    duration: &PercentileSummary,
    cost: &PercentileSummary,
) -> String {
    let chance = format!("{:.1}%", raw.success_probability * 100.0);
    let outlook = format!(
        "Median completion is {:.1} (P90 {:.1}) at a median cost of {:.0} (P90 {:.0}).",
        duration.p50, duration.p90, cost.p50, cost.p90
    );

    let mut text = match recommendation {
        Recommendation::Go => format!(
            "GO: the plan met its deadline and budget in {chance} of simulated runs. {outlook} \
             Proceed as planned and keep tracking the largest risk drivers."
        ),
        Recommendation::Caution => format!(
            "CAUTION: the plan met its deadline and budget in only {chance} of simulated runs. \
             {outlook} Proceed only with mitigation for the dominant schedule and cost drivers, \
             or add buffer to the deadline or budget."
        ),
        Recommendation::NoGo => format!(
            "NO-GO: the plan met its deadline and budget in just {chance} of simulated runs. \
             {outlook} Rework the scope or constraints before committing to this plan."
        ),
    };

    if raw.partial {
        text.push_str(&format!(
            " Based on a partial run of {} iterations.",
            raw.num_runs
        ));
    }
    text
}
