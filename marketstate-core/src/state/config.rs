//! Calculator configuration.
//!
//! Threshold and output behavior are tagged variants so the fixed-threshold
//! and single-channel flavors of the indicator are configuration, not code.

use serde::{Deserialize, Serialize};

use crate::error::MarketStateError;

use super::band::OutputMode;
use super::range::RangeMethod;
use super::tier::TierValues;

pub const DEFAULT_LOOKBACK: usize = 2000;
pub const DEFAULT_NEUTRAL_RATIO: f64 = 0.05;
pub const DEFAULT_DOUBLE_RATIO: f64 = 0.3;
pub const DEFAULT_SMOOTHING_PERIOD: usize = 5;

/// How tier thresholds are obtained each update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Constant thresholds shared by all tiers (double applies to mini only).
    Fixed { neutral: f64, double: f64 },
    /// Thresholds proportional to each tier's recent slope range.
    Adaptive {
        lookback: usize,
        neutral_ratio: f64,
        double_ratio: f64,
        #[serde(default)]
        method: RangeMethod,
    },
}

impl Default for ThresholdMode {
    fn default() -> Self {
        ThresholdMode::Adaptive {
            lookback: DEFAULT_LOOKBACK,
            neutral_ratio: DEFAULT_NEUTRAL_RATIO,
            double_ratio: DEFAULT_DOUBLE_RATIO,
            method: RangeMethod::Scan,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketStateConfig {
    /// Slope windows in bars.
    pub periods: TierValues<usize>,
    /// Whether the mini tier may score ±2.
    pub mini_double_band: bool,
    pub thresholds: ThresholdMode,
    pub smoothing_period: usize,
    pub output: OutputMode,
}

impl Default for MarketStateConfig {
    fn default() -> Self {
        Self {
            periods: TierValues::new(8, 20, 100),
            mini_double_band: true,
            thresholds: ThresholdMode::default(),
            smoothing_period: DEFAULT_SMOOTHING_PERIOD,
            output: OutputMode::ThreeChannel,
        }
    }
}

impl MarketStateConfig {
    pub fn with_periods(mini: usize, fast: usize, slow: usize) -> Self {
        Self {
            periods: TierValues::new(mini, fast, slow),
            ..Self::default()
        }
    }

    /// Largest slope period across the tiers.
    pub fn max_period(&self) -> usize {
        self.periods.mini.max(self.periods.fast).max(self.periods.slow)
    }

    /// Bars each series must hold before the first output.
    pub fn warmup_bars(&self) -> usize {
        self.max_period().saturating_add(1)
    }

    /// History a provider must keep for full-window range estimation.
    pub fn required_history(&self) -> usize {
        let lookback = match self.thresholds {
            ThresholdMode::Adaptive { lookback, .. } => lookback,
            ThresholdMode::Fixed { .. } => 0,
        };
        lookback.saturating_add(self.warmup_bars())
    }

    pub fn validate(&self) -> Result<(), MarketStateError> {
        for (tier, &period) in self.periods.iter() {
            if period == 0 {
                return Err(MarketStateError::invalid(format!(
                    "period_{} must be >= 1",
                    tier.as_str()
                )));
            }
        }
        if self.smoothing_period == 0 {
            return Err(MarketStateError::invalid("smoothing_period must be >= 1"));
        }
        match self.thresholds {
            ThresholdMode::Fixed { neutral, double } => {
                check_non_negative("neutral threshold", neutral)?;
                check_non_negative("double threshold", double)?;
            }
            ThresholdMode::Adaptive {
                lookback,
                neutral_ratio,
                double_ratio,
                ..
            } => {
                if lookback == 0 {
                    return Err(MarketStateError::invalid("lookback must be >= 1"));
                }
                if self
                    .max_period()
                    .checked_add(1)
                    .and_then(|warmup| lookback.checked_add(warmup))
                    .is_none()
                {
                    return Err(MarketStateError::invalid(format!(
                        "lookback {lookback} plus the largest period overflows"
                    )));
                }
                check_non_negative("neutral_ratio", neutral_ratio)?;
                check_non_negative("double_ratio", double_ratio)?;
            }
        }
        Ok(())
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<(), MarketStateError> {
    if !value.is_finite() || value < 0.0 {
        return Err(MarketStateError::invalid(format!(
            "{name} must be finite and >= 0, got {value}"
        )));
    }
    Ok(())
}
