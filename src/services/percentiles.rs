//! Percentile helpers for already-sorted slices.
//!
//! - Empty input => `None` (or `0.0` for the convenience wrapper).
//! - `percentile <= 0` => first element.
//! - `percentile >= 100` => last element.
//! - Otherwise we compute a position within `[0, len-1]` and interpolate
//!   linearly between the two neighbouring ranks.

use serde::{Deserialize, Serialize};

/// P10/P50/P90 of one simulated output.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct PercentileSummary {
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
}

impl PercentileSummary {
    pub fn from_sorted(sorted_values: &[f64]) -> Self {
        Self {
            p10: value_or_zero(sorted_values, 10.0),
            p50: value_or_zero(sorted_values, 50.0),
            p90: value_or_zero(sorted_values, 90.0),
        }
    }

    /// Sorts a copy of `values` first.
    pub fn from_unsorted(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        Self::from_sorted(&sorted)
    }
}

/// Returns the interpolated percentile value from a slice that is already
/// sorted in ascending order.
pub fn value_sorted(sorted_values: &[f64], percentile: f64) -> Option<f64> {
    let last = sorted_values.len().checked_sub(1)?;
    if percentile <= 0.0 {
        return sorted_values.first().copied();
    }
    if percentile >= 100.0 {
        return sorted_values.last().copied();
    }

    let position = (percentile / 100.0) * last as f64;
    let lower = position.floor() as usize;
    let upper = (lower + 1).min(last);
    let weight = position - lower as f64;
    let low_value = sorted_values[lower];
    let high_value = sorted_values[upper];
    Some(low_value + (high_value - low_value) * weight)
}

pub fn value_or_zero(sorted_values: &[f64], percentile: f64) -> f64 {
    value_sorted(sorted_values, percentile).unwrap_or(0.0)
}
