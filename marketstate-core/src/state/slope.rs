//! Slope estimator: average per-bar change of a series over `period` bars.

use crate::error::MarketStateError;

use super::series::ValueSeries;

/// `(series[offset] - series[offset + period]) / period`.
///
/// Fails with `InsufficientHistory` when the series cannot supply
/// `offset + period`. `period` must be >= 1; the calculator validates this at
/// construction.
pub fn slope<S: ValueSeries + ?Sized>(
    series: &S,
    period: usize,
    offset: usize,
) -> Result<f64, MarketStateError> {
    debug_assert!(period >= 1, "slope period must be >= 1");
    let required = offset + period;
    let insufficient = || MarketStateError::InsufficientHistory {
        required,
        available: series.len(),
    };
    let current = series.get(offset).ok_or_else(insufficient)?;
    let previous = series.get(required).ok_or_else(insufficient)?;
    Ok((current - previous) / period as f64)
}

/// Largest offset at which `slope(series, period, offset)` can be evaluated.
pub fn max_slope_offset<S: ValueSeries + ?Sized>(series: &S, period: usize) -> Option<usize> {
    series.len().checked_sub(period + 1)
}
