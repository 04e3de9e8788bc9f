//! Exponential Moving Average (EMA), streaming form.
//!
//! Recursive: EMA[t] = EMA[t-1] + alpha * (value[t] - EMA[t-1]), alpha = 2 / (period + 1).
//! A constant input therefore leaves the EMA exactly constant.
//! Seed is either the first value (charting-platform style, defined from bar 0)
//! or the SMA of the first `period` values (NaN before the seed bar).
//! A NaN input taints every later output.

use serde::{Deserialize, Serialize};

/// How the EMA recursion is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmaSeed {
    /// EMA[0] = value[0].
    #[default]
    FirstValue,
    /// EMA[period-1] = SMA of the first `period` values.
    Sma,
}

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    seed: EmaSeed,
    current: Option<f64>,
    seed_sum: f64,
    seed_count: usize,
    tainted: bool,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self::with_seed(period, EmaSeed::default())
    }

    pub fn with_seed(period: usize, seed: EmaSeed) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            seed,
            current: None,
            seed_sum: 0.0,
            seed_count: 0,
            tainted: false,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Latest EMA value, `None` before the seed bar.
    pub fn value(&self) -> Option<f64> {
        if self.tainted {
            return Some(f64::NAN);
        }
        self.current
    }

    /// Feed one value and return the EMA at this bar (NaN before the seed).
    pub fn update(&mut self, value: f64) -> f64 {
        if self.tainted {
            return f64::NAN;
        }
        if value.is_nan() {
            self.tainted = true;
            return f64::NAN;
        }

        let next = match (self.current, self.seed) {
            (Some(prev), _) => prev + self.alpha * (value - prev),
            (None, EmaSeed::FirstValue) => value,
            (None, EmaSeed::Sma) => {
                self.seed_sum += value;
                self.seed_count += 1;
                if self.seed_count < self.period {
                    return f64::NAN;
                }
                self.seed_sum / self.period as f64
            }
        };
        self.current = Some(next);
        next
    }

    pub fn reset(&mut self) {
        *self = Self::with_seed(self.period, self.seed);
    }
}

/// Compute EMA values for a whole series at once.
pub fn ema_of_series(values: &[f64], period: usize, seed: EmaSeed) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; values.len()];
    }
    let mut ema = Ema::with_seed(period, seed);
    values.iter().map(|&v| ema.update(v)).collect()
}
