//! Market state calculator: per-stream orchestration of the pipeline.
//!
//! Each update runs: slopes (×3) → slope ranges (×3, adaptive mode only) →
//! tier scores (×3) → raw sum → smoother → band classifier.
//!
//! State machine: `WarmingUp` until every tier series holds more bars than
//! the largest slope period, then `Active` for the rest of the stream. Only
//! `reset()` goes back to `WarmingUp`.
//!
//! All mutable state (smoother memory, rolling range windows) lives in the
//! instance; one instance serves exactly one stream.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::MarketStateError;

use super::band::{Band, ChannelOutput};
use super::config::{MarketStateConfig, ThresholdMode};
use super::range::{slope_range, RangeMethod, RollingRange};
use super::scorer::ThresholdSet;
use super::series::{SeriesView, ValueSeries};
use super::slope::slope;
use super::smoother::StateSmoother;
use super::tier::{Tier, TierValues};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    WarmingUp,
    Active,
}

/// Everything computed for one emitted bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStateUpdate {
    pub slopes: TierValues<f64>,
    pub thresholds: TierValues<ThresholdSet>,
    /// `None` when a slope or threshold was not finite.
    pub scores: Option<TierValues<i32>>,
    /// Sum of the tier scores, in `[-4, 4]`.
    pub raw: Option<i32>,
    pub smoothed: f64,
    pub band: Band,
    pub output: ChannelOutput,
}

impl MarketStateUpdate {
    /// False when an upstream value was NaN or infinite.
    pub fn is_valid(&self) -> bool {
        self.raw.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct MarketStateCalculator {
    config: MarketStateConfig,
    rolling: Option<TierValues<RollingRange>>,
    smoother: StateSmoother,
    phase: Phase,
}

impl MarketStateCalculator {
    /// Validates the config; invalid periods, lookback or ratios are rejected here.
    pub fn new(config: MarketStateConfig) -> Result<Self, MarketStateError> {
        config.validate()?;
        let rolling = match config.thresholds {
            ThresholdMode::Adaptive {
                lookback,
                method: RangeMethod::Rolling,
                ..
            } => Some(config.periods.map(|_, &p| RollingRange::new(p, lookback))),
            _ => None,
        };
        Ok(Self {
            smoother: StateSmoother::new(config.smoothing_period),
            config,
            rolling,
            phase: Phase::WarmingUp,
        })
    }

    pub fn config(&self) -> &MarketStateConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Smoother memory, `None` before the first valid update.
    pub fn smoothed(&self) -> Option<f64> {
        self.smoother.previous()
    }

    /// Run the pipeline for the current bar.
    ///
    /// Returns `None` while warming up (or if a series cannot supply a needed
    /// offset); otherwise exactly one update.
    pub fn on_bar_update<S: ValueSeries + ?Sized>(
        &mut self,
        mini: &S,
        fast: &S,
        slow: &S,
    ) -> Option<MarketStateUpdate> {
        match self.evaluate(TierValues::new(mini, fast, slow)) {
            Ok(update) => Some(update),
            Err(e) => {
                debug!(error = %e, phase = ?self.phase, "market state update skipped");
                None
            }
        }
    }

    /// Forget all stream state (smoother memory, range windows, phase).
    pub fn reset(&mut self) {
        self.smoother.reset();
        if let Some(rolling) = self.rolling.as_mut() {
            rolling.mini.reset();
            rolling.fast.reset();
            rolling.slow.reset();
        }
        self.phase = Phase::WarmingUp;
    }

    fn evaluate<S: ValueSeries + ?Sized>(
        &mut self,
        series: TierValues<&S>,
    ) -> Result<MarketStateUpdate, MarketStateError> {
        let available = series.iter().map(|(_, s)| s.len()).min().unwrap_or(0);
        let max_period = self.config.max_period();
        if available <= max_period {
            return Err(MarketStateError::InsufficientHistory {
                required: max_period,
                available,
            });
        }

        let periods = self.config.periods;
        let slopes = series
            .map(|tier, s| slope(*s, *periods.get(tier), 0))
            .transpose()?;
        let thresholds = self.thresholds(&series)?;

        if self.phase == Phase::WarmingUp {
            self.phase = Phase::Active;
            debug!(bars = available, "market state active");
        }

        let finite = slopes.iter().all(|(_, s)| s.is_finite())
            && thresholds.iter().all(|(_, t)| t.is_finite());

        let (scores, raw, smoothed) = if finite {
            let scores = slopes.map(|tier, &s| thresholds.get(tier).score(s));
            let raw = scores.mini + scores.fast + scores.slow;
            let smoothed = self.smoother.update(raw as f64);
            (Some(scores), Some(raw), smoothed)
        } else {
            warn!(
                slope_mini = slopes.mini,
                slope_fast = slopes.fast,
                slope_slow = slopes.slow,
                "non-finite slope or threshold; emitting NaN state"
            );
            (None, None, f64::NAN)
        };

        Ok(MarketStateUpdate {
            slopes,
            thresholds,
            scores,
            raw,
            smoothed,
            band: Band::classify(smoothed),
            output: ChannelOutput::new(self.config.output, smoothed),
        })
    }

    fn thresholds<S: ValueSeries + ?Sized>(
        &mut self,
        series: &TierValues<&S>,
    ) -> Result<TierValues<ThresholdSet>, MarketStateError> {
        let periods = self.config.periods;
        let double_enabled = self.config.mini_double_band;
        let double_for = |tier: Tier, value: f64| {
            (tier == Tier::Mini && double_enabled).then_some(value)
        };

        match self.config.thresholds {
            ThresholdMode::Fixed { neutral, double } => {
                Ok(periods.map(|tier, _| ThresholdSet::new(neutral, double_for(tier, double))))
            }
            ThresholdMode::Adaptive {
                lookback,
                neutral_ratio,
                double_ratio,
                ..
            } => {
                let ranges = match self.rolling.as_mut() {
                    Some(rolling) => TierValues::new(
                        rolling.mini.update(series.mini)?,
                        rolling.fast.update(series.fast)?,
                        rolling.slow.update(series.slow)?,
                    ),
                    None => series
                        .map(|tier, s| slope_range(*s, *periods.get(tier), lookback))
                        .transpose()?,
                };
                Ok(ranges.map(|tier, &range| {
                    ThresholdSet::from_range(range, neutral_ratio, double_for(tier, double_ratio))
                }))
            }
        }
    }
}

/// Run a fresh calculator over three chronologically ordered tier series.
///
/// Element `i` of the result is the output the calculator emits when bar `i`
/// is the current bar.
pub fn compute_series(
    config: &MarketStateConfig,
    mini: &[f64],
    fast: &[f64],
    slow: &[f64],
) -> Result<Vec<Option<MarketStateUpdate>>, MarketStateError> {
    let mut calc = MarketStateCalculator::new(config.clone())?;
    let n = mini.len().min(fast.len()).min(slow.len());
    Ok((0..n)
        .map(|i| {
            calc.on_bar_update(
                &SeriesView::at_bar(mini, i),
                &SeriesView::at_bar(fast, i),
                &SeriesView::at_bar(slow, i),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::band::{BandValues, OutputMode};
    use crate::state::series::SeriesBuffer;

    fn small_config() -> MarketStateConfig {
        MarketStateConfig {
            periods: TierValues::new(2, 3, 4),
            thresholds: ThresholdMode::Adaptive {
                lookback: 10,
                neutral_ratio: 0.05,
                double_ratio: 0.3,
                method: RangeMethod::Scan,
            },
            ..Default::default()
        }
    }

    fn linear(n: usize, step: f64) -> Vec<f64> {
        (0..n).map(|i| 100.0 + step * i as f64).collect()
    }

    #[test]
    fn invalid_config_rejected_at_construction() {
        let config = MarketStateConfig::with_periods(0, 20, 100);
        assert!(matches!(
            MarketStateCalculator::new(config),
            Err(MarketStateError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn warms_up_until_history_exceeds_max_period() {
        let mut calc = MarketStateCalculator::new(small_config()).unwrap();
        let mut buf = SeriesBuffer::new();
        for i in 0..4 {
            buf.push(i as f64);
            assert!(calc.on_bar_update(&buf, &buf, &buf).is_none());
            assert_eq!(calc.phase(), Phase::WarmingUp);
        }
        buf.push(4.0);
        assert!(calc.on_bar_update(&buf, &buf, &buf).is_some());
        assert_eq!(calc.phase(), Phase::Active);
    }

    #[test]
    fn shortest_series_gates_warmup() {
        let mut calc = MarketStateCalculator::new(small_config()).unwrap();
        let long = SeriesView::new(&[1.0; 20]);
        let short = SeriesView::new(&[1.0; 4]);
        assert!(calc.on_bar_update(&long, &long, &short).is_none());
    }

    #[test]
    fn first_active_update_is_unsmoothed() {
        let values = linear(30, 1.0);
        let mut calc = MarketStateCalculator::new(small_config()).unwrap();
        let view = SeriesView::new(&values);
        let update = calc.on_bar_update(&view, &view, &view).unwrap();
        // Linear series: all slopes equal, range 0, thresholds 0 → 2 + 1 + 1
        assert_eq!(update.scores, Some(TierValues::new(2, 1, 1)));
        assert_eq!(update.raw, Some(4));
        assert_eq!(update.smoothed, 4.0);
        assert_eq!(update.band, Band::Bullish);
        assert_eq!(
            update.output,
            ChannelOutput::ThreeChannel(BandValues {
                bullish: Some(4.0),
                bearish: None,
                neutral: None
            })
        );
    }

    #[test]
    fn smoothing_carries_across_updates() {
        let config = MarketStateConfig {
            smoothing_period: 3,
            ..small_config()
        };
        let mut calc = MarketStateCalculator::new(config).unwrap();
        let up = linear(30, 1.0);
        let flat = vec![100.0; 30];
        let u1 = calc
            .on_bar_update(&SeriesView::new(&up), &SeriesView::new(&up), &SeriesView::new(&up))
            .unwrap();
        assert_eq!(u1.smoothed, 4.0);
        let u2 = calc
            .on_bar_update(
                &SeriesView::new(&flat),
                &SeriesView::new(&flat),
                &SeriesView::new(&flat),
            )
            .unwrap();
        assert_eq!(u2.raw, Some(0));
        assert_eq!(u2.smoothed, 2.0);
        assert_eq!(calc.smoothed(), Some(2.0));
    }

    #[test]
    fn mini_double_band_can_be_disabled() {
        let config = MarketStateConfig {
            mini_double_band: false,
            ..small_config()
        };
        let values = linear(30, 1.0);
        let view = SeriesView::new(&values);
        let mut calc = MarketStateCalculator::new(config).unwrap();
        let update = calc.on_bar_update(&view, &view, &view).unwrap();
        assert_eq!(update.thresholds.mini.double, None);
        assert_eq!(update.raw, Some(3));
    }

    #[test]
    fn fixed_thresholds_apply_to_all_tiers() {
        let config = MarketStateConfig {
            thresholds: ThresholdMode::Fixed {
                neutral: 0.5,
                double: 2.0,
            },
            smoothing_period: 1,
            ..small_config()
        };
        let values = linear(30, 1.0);
        let view = SeriesView::new(&values);
        let mut calc = MarketStateCalculator::new(config).unwrap();
        let update = calc.on_bar_update(&view, &view, &view).unwrap();
        assert_eq!(update.thresholds.fast, ThresholdSet::new(0.5, None));
        assert_eq!(update.thresholds.mini, ThresholdSet::new(0.5, Some(2.0)));
        // slope 1.0: mini 1 (not > 2.0), fast 1, slow 1
        assert_eq!(update.raw, Some(3));
        assert_eq!(update.band, Band::Bullish);
    }

    #[test]
    fn single_channel_output() {
        let config = MarketStateConfig {
            output: OutputMode::SingleChannel,
            ..small_config()
        };
        let values = vec![50.0; 30];
        let view = SeriesView::new(&values);
        let mut calc = MarketStateCalculator::new(config).unwrap();
        let update = calc.on_bar_update(&view, &view, &view).unwrap();
        assert_eq!(update.output, ChannelOutput::SingleChannel { value: 0.0 });
    }

    #[test]
    fn nan_input_surfaces_as_nan_and_keeps_memory() {
        let mut calc = MarketStateCalculator::new(small_config()).unwrap();
        let good = linear(30, 1.0);
        let g = SeriesView::new(&good);
        calc.on_bar_update(&g, &g, &g).unwrap();
        assert_eq!(calc.smoothed(), Some(4.0));

        let mut bad = linear(30, 1.0);
        bad[29] = f64::NAN;
        let b = SeriesView::new(&bad);
        let update = calc.on_bar_update(&b, &g, &g).unwrap();
        assert!(!update.is_valid());
        assert!(update.smoothed.is_nan());
        assert_eq!(update.band, Band::Neutral);
        assert!(update.output.band_values().unwrap().neutral.unwrap().is_nan());
        assert_eq!(calc.smoothed(), Some(4.0));
    }

    #[test]
    fn infinite_input_is_not_scored() {
        let mut calc = MarketStateCalculator::new(small_config()).unwrap();
        let mut values = linear(30, 1.0);
        values[29] = f64::INFINITY;
        let v = SeriesView::new(&values);
        let update = calc.on_bar_update(&v, &v, &v).unwrap();
        assert_eq!(update.scores, None);
        assert!(update.smoothed.is_nan());
    }

    #[test]
    fn reset_returns_to_warming_up() {
        let mut calc = MarketStateCalculator::new(small_config()).unwrap();
        let values = linear(30, -1.0);
        let v = SeriesView::new(&values);
        calc.on_bar_update(&v, &v, &v).unwrap();
        assert_eq!(calc.phase(), Phase::Active);
        calc.reset();
        assert_eq!(calc.phase(), Phase::WarmingUp);
        assert_eq!(calc.smoothed(), None);
        let update = calc.on_bar_update(&v, &v, &v).unwrap();
        assert_eq!(update.smoothed, -4.0);
    }

    #[test]
    fn rolling_method_matches_scan() {
        let values: Vec<f64> = (0..400)
            .map(|i| 100.0 + (i as f64 * 0.07).sin() * 5.0 + (i as f64 * 0.31).cos())
            .collect();
        let scan = MarketStateConfig {
            periods: TierValues::new(3, 7, 15),
            thresholds: ThresholdMode::Adaptive {
                lookback: 60,
                neutral_ratio: 0.05,
                double_ratio: 0.3,
                method: RangeMethod::Scan,
            },
            ..Default::default()
        };
        let rolling = MarketStateConfig {
            thresholds: ThresholdMode::Adaptive {
                lookback: 60,
                neutral_ratio: 0.05,
                double_ratio: 0.3,
                method: RangeMethod::Rolling,
            },
            ..scan.clone()
        };
        let a = compute_series(&scan, &values, &values, &values).unwrap();
        let b = compute_series(&rolling, &values, &values, &values).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().filter(|u| u.is_some()).count() > 300);
    }

    #[test]
    fn compute_series_aligns_outputs_with_bars() {
        let values = linear(10, 1.0);
        let out = compute_series(&small_config(), &values, &values, &values).unwrap();
        assert_eq!(out.len(), 10);
        assert!(out[..4].iter().all(Option::is_none));
        assert!(out[4..].iter().all(Option::is_some));
    }
}
