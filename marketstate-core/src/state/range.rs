//! Adaptive range estimator: spread between the highest and lowest slope seen
//! over the last `lookback + 1` offsets of a tier's series.
//!
//! Extrema are seeded from the offset-0 slope of the series being scanned.
//!
//! The window is clamped to the history that exists: offsets
//! `0..=min(lookback, len - 1 - period)`.
//!
//! Two evaluation strategies produce identical values when fed once per bar:
//! - `slope_range`: rescans the window, O(lookback) per call.
//! - `RollingRange`: monotonic deques over the pushed slopes, amortized O(1).

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::MarketStateError;

use super::series::ValueSeries;
use super::slope::{max_slope_offset, slope};

/// Strategy used to evaluate the slope range each update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeMethod {
    /// Rescan the full window every update.
    #[default]
    Scan,
    /// Maintain sliding extrema; assumes exactly one update per new bar.
    Rolling,
}

/// Highest minus lowest slope over offsets `0..=lookback` (clamped to history).
///
/// Returns NaN if any slope in the window is NaN.
pub fn slope_range<S: ValueSeries + ?Sized>(
    series: &S,
    period: usize,
    lookback: usize,
) -> Result<f64, MarketStateError> {
    let first = slope(series, period, 0)?;
    if first.is_nan() {
        return Ok(f64::NAN);
    }
    let last_offset = max_slope_offset(series, period).map_or(0, |m| m.min(lookback));

    let mut highest = first;
    let mut lowest = first;
    for offset in 1..=last_offset {
        let s = slope(series, period, offset)?;
        if s.is_nan() {
            return Ok(f64::NAN);
        }
        if s > highest {
            highest = s;
        }
        if s < lowest {
            lowest = s;
        }
    }

    Ok(highest - lowest)
}

/// Sliding-window max/min over the last `window` pushed values.
#[derive(Debug, Clone)]
pub struct SlidingRange {
    window: usize,
    next_index: usize,
    maxima: VecDeque<(usize, f64)>,
    minima: VecDeque<(usize, f64)>,
    nan_indices: VecDeque<usize>,
}

impl SlidingRange {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            next_index: 0,
            maxima: VecDeque::new(),
            minima: VecDeque::new(),
            nan_indices: VecDeque::new(),
        }
    }

    pub fn push(&mut self, value: f64) {
        let index = self.next_index;
        self.next_index += 1;

        if value.is_nan() {
            self.nan_indices.push_back(index);
        } else {
            while self.maxima.back().is_some_and(|&(_, v)| v <= value) {
                self.maxima.pop_back();
            }
            self.maxima.push_back((index, value));
            while self.minima.back().is_some_and(|&(_, v)| v >= value) {
                self.minima.pop_back();
            }
            self.minima.push_back((index, value));
        }

        let oldest = self.next_index.saturating_sub(self.window);
        while self.maxima.front().is_some_and(|&(i, _)| i < oldest) {
            self.maxima.pop_front();
        }
        while self.minima.front().is_some_and(|&(i, _)| i < oldest) {
            self.minima.pop_front();
        }
        while self.nan_indices.front().is_some_and(|&i| i < oldest) {
            self.nan_indices.pop_front();
        }
    }

    /// Number of values currently inside the window.
    pub fn len(&self) -> usize {
        self.next_index.min(self.window)
    }

    pub fn is_empty(&self) -> bool {
        self.next_index == 0
    }

    pub fn max(&self) -> Option<f64> {
        self.maxima.front().map(|&(_, v)| v)
    }

    pub fn min(&self) -> Option<f64> {
        self.minima.front().map(|&(_, v)| v)
    }

    /// `max - min` of the window; NaN while a NaN is inside; `None` if empty.
    pub fn range(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        if !self.nan_indices.is_empty() {
            return Some(f64::NAN);
        }
        Some(self.max()? - self.min()?)
    }

    pub fn clear(&mut self) {
        *self = Self::new(self.window);
    }
}

/// Per-tier incremental slope range.
///
/// The first update back-fills the window from the series' history; every
/// later update pushes only the offset-0 slope.
#[derive(Debug, Clone)]
pub struct RollingRange {
    period: usize,
    lookback: usize,
    window: SlidingRange,
    primed: bool,
}

impl RollingRange {
    pub fn new(period: usize, lookback: usize) -> Self {
        Self {
            period,
            lookback,
            window: SlidingRange::new(lookback.saturating_add(1)),
            primed: false,
        }
    }

    pub fn update<S: ValueSeries + ?Sized>(&mut self, series: &S) -> Result<f64, MarketStateError> {
        let newest = slope(series, self.period, 0)?;
        if !self.primed {
            let last_offset =
                max_slope_offset(series, self.period).map_or(0, |m| m.min(self.lookback));
            let mut history = Vec::with_capacity(last_offset);
            for offset in (1..=last_offset).rev() {
                history.push(slope(series, self.period, offset)?);
            }
            for s in history {
                self.window.push(s);
            }
            self.primed = true;
        }
        self.window.push(newest);
        Ok(self.window.range().unwrap_or(f64::NAN))
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.primed = false;
    }
}
