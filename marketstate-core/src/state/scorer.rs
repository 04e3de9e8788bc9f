//! Tier scorer: slope → small integer score.
//!
//! Comparisons are strict, so a slope sitting exactly on a threshold falls
//! into the lower-magnitude band.

use serde::{Deserialize, Serialize};

/// Symmetric thresholds for one tier. Both values are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub neutral: f64,
    /// Only set for the mini tier when its double band is enabled.
    pub double: Option<f64>,
}

impl ThresholdSet {
    pub fn new(neutral: f64, double: Option<f64>) -> Self {
        Self { neutral, double }
    }

    /// Thresholds proportional to a tier's slope range.
    pub fn from_range(slope_range: f64, neutral_ratio: f64, double_ratio: Option<f64>) -> Self {
        Self {
            neutral: slope_range * neutral_ratio,
            double: double_ratio.map(|r| slope_range * r),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.neutral.is_finite() && self.double.map_or(true, f64::is_finite)
    }

    /// Score a slope against these thresholds.
    pub fn score(&self, slope: f64) -> i32 {
        score(slope, self.neutral, self.double)
    }
}

/// Map a slope to `{-2..=2}` (with a double threshold) or `{-1..=1}` (without).
pub fn score(slope: f64, neutral: f64, double: Option<f64>) -> i32 {
    if let Some(double) = double {
        if slope > double {
            return 2;
        }
        if slope < -double {
            return -2;
        }
    }
    if slope > neutral {
        1
    } else if slope < -neutral {
        -1
    } else {
        0
    }
}
