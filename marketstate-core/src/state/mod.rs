//! The market state pipeline.
//!
//! slope → adaptive range → tier score → raw sum → smoother → band.
//!
//! Everything here reads tier values through `ValueSeries` and never computes
//! the underlying moving averages.

pub mod band;
pub mod calculator;
pub mod config;
pub mod range;
pub mod scorer;
pub mod series;
pub mod slope;
pub mod smoother;
pub mod tier;

pub use band::{Band, BandValues, ChannelOutput, OutputMode, BEARISH_LEVEL, BULLISH_LEVEL};
pub use calculator::{compute_series, MarketStateCalculator, MarketStateUpdate, Phase};
pub use config::{
    MarketStateConfig, ThresholdMode, DEFAULT_DOUBLE_RATIO, DEFAULT_LOOKBACK,
    DEFAULT_NEUTRAL_RATIO, DEFAULT_SMOOTHING_PERIOD,
};
pub use range::{slope_range, RangeMethod, RollingRange, SlidingRange};
pub use scorer::{score, ThresholdSet};
pub use series::{SeriesBuffer, SeriesView, ValueSeries};
pub use slope::slope;
pub use smoother::StateSmoother;
pub use tier::{Tier, TierValues};
