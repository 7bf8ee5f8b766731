use serde::{Deserialize, Serialize};

/// Minimum, most likely and maximum value of an uncertain quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreePointEstimate {
    pub min: f64,
    pub likely: f64,
    pub max: f64,
}

impl ThreePointEstimate {
    pub fn new(min: f64, likely: f64, max: f64) -> Self {
        Self { min, likely, max }
    }

    /// A point estimate with no uncertainty.
    pub fn fixed(value: f64) -> Self {
        Self::new(value, value, value)
    }

    /// Non-negative, finite and ordered `min <= likely <= max`.
    pub fn is_consistent(&self) -> bool {
        let values = [self.min, self.likely, self.max];
        values.iter().all(|value| value.is_finite() && *value >= 0.0)
            && self.min <= self.likely
            && self.likely <= self.max
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}
