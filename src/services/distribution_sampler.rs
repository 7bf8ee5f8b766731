use rand::Rng;
use rand_distr::{Beta, Distribution, LogNormal};
use thiserror::Error;

use crate::domain::estimate::ThreePointEstimate;

/// Standard normal quantile at 0.95.
const Z_95: f64 = 1.644_853_626_951_472_2;
const MIN_LOG_SIGMA: f64 = 0.05;
const MIN_MEDIAN_SHARE: f64 = 0.05;
const MAX_REDRAWS: usize = 64;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistributionError {
    #[error("invalid distribution parameters (min {min}, likely {likely}, max {max})")]
    InvalidDistributionParameters { min: f64, likely: f64, max: f64 },
}

impl DistributionError {
    fn from_estimate(estimate: &ThreePointEstimate) -> Self {
        Self::InvalidDistributionParameters {
            min: estimate.min,
            likely: estimate.likely,
            max: estimate.max,
        }
    }
}

/// Draws one value within `[min, max]` from a three-point estimate.
pub trait ThreePointSampler {
    fn sample<R: Rng + ?Sized>(
        &self,
        estimate: &ThreePointEstimate,
        rng: &mut R,
    ) -> Result<f64, DistributionError>;
}

/// Beta-PERT shape, weighting the most likely value four times.
#[derive(Debug, Clone, Copy, Default)]
pub struct BetaPertSampler;

impl ThreePointSampler for BetaPertSampler {
    fn sample<R: Rng + ?Sized>(
        &self,
        estimate: &ThreePointEstimate,
        rng: &mut R,
    ) -> Result<f64, DistributionError> {
        check_parameters(estimate)?;
        let range = estimate.range();
        if range < f64::EPSILON {
            return Ok(estimate.min);
        }

        let alpha = 1.0 + 4.0 * ((estimate.likely - estimate.min) / range);
        let beta = 1.0 + 4.0 * ((estimate.max - estimate.likely) / range);
        let beta_dist =
            Beta::new(alpha, beta).map_err(|_| DistributionError::from_estimate(estimate))?;
        let sample = beta_dist.sample(rng);
        Ok((estimate.min + sample * range).clamp(estimate.min, estimate.max))
    }
}

/// Right-skewed lognormal shifted to start at `min`.
///
/// The median of the shifted variable sits at `likely - min` (floored at a
/// small share of the range) and the range maps to its 95th percentile, so
/// most of the mass stays near the likely value while a long tail reaches
/// towards `max`. Draws beyond `max` are redrawn, then clamped.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNormalSampler;

impl ThreePointSampler for LogNormalSampler {
    fn sample<R: Rng + ?Sized>(
        &self,
        estimate: &ThreePointEstimate,
        rng: &mut R,
    ) -> Result<f64, DistributionError> {
        check_parameters(estimate)?;
        let range = estimate.range();
        if range < f64::EPSILON {
            return Ok(estimate.min);
        }

        let median = (estimate.likely - estimate.min).clamp(range * MIN_MEDIAN_SHARE, range);
        let mu = median.ln();
        let sigma = ((range.ln() - mu) / Z_95).max(MIN_LOG_SIGMA);
        let log_normal =
            LogNormal::new(mu, sigma).map_err(|_| DistributionError::from_estimate(estimate))?;

        let mut offset = log_normal.sample(rng);
        for _ in 0..MAX_REDRAWS {
            if offset <= range {
                break;
            }
            offset = log_normal.sample(rng);
        }
        Ok((estimate.min + offset).clamp(estimate.min, estimate.max))
    }
}

/// Samples a task duration with the Beta-PERT shape.
pub fn sample_duration<R: Rng + ?Sized>(
    estimate: &ThreePointEstimate,
    rng: &mut R,
) -> Result<f64, DistributionError> {
    BetaPertSampler.sample(estimate, rng)
}

/// Samples a task cost with the lognormal shape.
pub fn sample_cost<R: Rng + ?Sized>(
    estimate: &ThreePointEstimate,
    rng: &mut R,
) -> Result<f64, DistributionError> {
    LogNormalSampler.sample(estimate, rng)
}

fn check_parameters(estimate: &ThreePointEstimate) -> Result<(), DistributionError> {
    if estimate.is_consistent() {
        Ok(())
    } else {
        Err(DistributionError::from_estimate(estimate))
    }
}
