//! Market State Core: EMA-slope market state scoring.
//!
//! This crate contains the pipeline and the pieces a host needs to drive it:
//! - `state`: slope estimator, adaptive range, tier scorer, smoother, band
//!   classifier and the per-stream calculator
//! - `indicators`: streaming EMA used as the value provider
//! - `domain`: bar type shared with the runner
//! - `error`: pipeline error taxonomy

pub mod domain;
pub mod error;
pub mod indicators;
pub mod state;

pub use error::MarketStateError;
pub use state::{
    Band, BandValues, ChannelOutput, MarketStateCalculator, MarketStateConfig, MarketStateUpdate,
    OutputMode, Phase, RangeMethod, ThresholdMode, Tier, TierValues, ValueSeries,
};
