//! First-order variance decomposition of a simulated output.
//!
//! Each driver partitions the retained iterations into groups (quantile bins
//! for sampled durations and costs, triggered / not triggered for risks).
//! The variance of the group means, weighted by group size, is the part of
//! the output variance explained by that driver alone. Interactions between
//! drivers are not captured; a Sobol-style decomposition would be needed for
//! that.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::simulation_types::SimulationResult;

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_BINS: usize = 10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensitivityError {
    #[error("top_k must be greater than zero")]
    ZeroTopK,
    #[error("at least two bins are required, got {0}")]
    TooFewBins(usize),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputMetric {
    TotalDuration,
    TotalCost,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    TaskDuration,
    TaskCost,
    RiskTrigger,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SensitivityDriver {
    pub name: String,
    pub kind: DriverKind,
    pub source_id: String,
    pub sensitivity_score: f64,
    pub variance_contribution: f64,
    pub rank: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensitivityAnalyzer {
    metric: OutputMetric,
    top_k: usize,
    bins: usize,
}

impl Default for SensitivityAnalyzer {
    fn default() -> Self {
        Self::new(OutputMetric::TotalDuration)
    }
}

impl SensitivityAnalyzer {
    pub fn new(metric: OutputMetric) -> Self {
        Self {
            metric,
            top_k: DEFAULT_TOP_K,
            bins: DEFAULT_BINS,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = bins;
        self
    }

    /// Ranks every driver of `result` and returns the `top_k` strongest,
    /// highest score first. Equal scores keep declaration order.
    pub fn analyze(
        &self,
        result: &SimulationResult,
    ) -> Result<Vec<SensitivityDriver>, SensitivityError> {
        if self.top_k == 0 {
            return Err(SensitivityError::ZeroTopK);
        }
        if self.bins < 2 {
            return Err(SensitivityError::TooFewBins(self.bins));
        }

        let output = match self.metric {
            OutputMetric::TotalDuration => result.durations.as_slice(),
            OutputMetric::TotalCost => result.costs.as_slice(),
        };
        let decomposition = Decomposition::new(output);
        let drivers = &result.drivers;

        let mut ranked = Vec::new();
        for (id, series) in drivers.task_ids.iter().zip(&drivers.task_durations) {
            let groups = quantile_groups(series, self.bins);
            ranked.push(decomposition.driver(
                format!("{id} duration"),
                DriverKind::TaskDuration,
                id,
                &groups,
                self.bins,
            ));
        }
        for (id, series) in drivers.task_ids.iter().zip(&drivers.task_costs) {
            let groups = quantile_groups(series, self.bins);
            ranked.push(decomposition.driver(
                format!("{id} cost"),
                DriverKind::TaskCost,
                id,
                &groups,
                self.bins,
            ));
        }
        for (id, triggers) in drivers.risk_ids.iter().zip(&drivers.risk_triggers) {
            let groups: Vec<usize> = triggers
                .iter()
                .map(|triggered| usize::from(*triggered))
                .collect();
            ranked.push(decomposition.driver(
                format!("{id} risk"),
                DriverKind::RiskTrigger,
                id,
                &groups,
                2,
            ));
        }

        ranked.sort_by(|a, b| b.sensitivity_score.total_cmp(&a.sensitivity_score));
        ranked.truncate(self.top_k);
        for (position, driver) in ranked.iter_mut().enumerate() {
            driver.rank = position + 1;
        }
        Ok(ranked)
    }
}

struct Decomposition<'a> {
    output: &'a [f64],
    mean: f64,
    total_variance: f64,
}

impl<'a> Decomposition<'a> {
    fn new(output: &'a [f64]) -> Self {
        if output.is_empty() {
            return Self {
                output,
                mean: 0.0,
                total_variance: 0.0,
            };
        }
        let n = output.len() as f64;
        let mean = output.iter().sum::<f64>() / n;
        let total_variance = output.iter().map(|y| (y - mean).powi(2)).sum::<f64>() / n;
        Self {
            output,
            mean,
            total_variance,
        }
    }

    fn driver(
        &self,
        name: String,
        kind: DriverKind,
        source_id: &str,
        groups: &[usize],
        group_count: usize,
    ) -> SensitivityDriver {
        // A plan without effective uncertainty explains nothing.
        let (sensitivity_score, variance_contribution) = if self.total_variance > 0.0 {
            let between = self.between_group_variance(groups, group_count);
            ((between / self.total_variance).clamp(0.0, 1.0), between)
        } else {
            (0.0, 0.0)
        };

        SensitivityDriver {
            name,
            kind,
            source_id: source_id.to_string(),
            sensitivity_score,
            variance_contribution,
            rank: 0,
        }
    }

    fn between_group_variance(&self, groups: &[usize], group_count: usize) -> f64 {
        let mut sums = vec![0.0; group_count];
        let mut counts = vec![0usize; group_count];
        for (group, value) in groups.iter().zip(self.output) {
            sums[*group] += value;
            counts[*group] += 1;
        }

        let n = self.output.len() as f64;
        sums.iter()
            .zip(&counts)
            .filter(|(_, count)| **count > 0)
            .map(|(sum, count)| {
                let group_mean = sum / *count as f64;
                *count as f64 * (group_mean - self.mean).powi(2)
            })
            .sum::<f64>()
            / n
    }
}

/// Assigns each value to one of `bins` equal-count bins by rank. Ties take
/// the bin of their first occurrence, so equal values never split.
fn quantile_groups(values: &[f64], bins: usize) -> Vec<usize> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|a, b| values[*a].total_cmp(&values[*b]));

    let mut groups = vec![0; n];
    let mut first_rank = 0;
    for (rank, &index) in order.iter().enumerate() {
        if rank > 0 && values[index] != values[order[rank - 1]] {
            first_rank = rank;
        }
        groups[index] = first_rank * bins / n;
    }
    groups
}
