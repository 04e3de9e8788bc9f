//! Run orchestration: one stream per symbol, symbols in parallel.
//!
//! Two entry points:
//! - `run()`: loads bars from the configured source, then runs every symbol.
//!   Used by the CLI.
//! - `run_symbol()`: takes pre-loaded bars for a single symbol. No I/O.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use marketstate_core::domain::Bar;
use marketstate_core::indicators::EmaSeed;
use marketstate_core::{Band, MarketStateConfig, MarketStateError, MarketStateUpdate, TierValues};

use crate::config::{ConfigError, EmaConfig, RunConfig, RunId};
use crate::data_loader::{load_bars, LoadError, LoadedData};
use crate::stream::MarketStateStream;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("market state error: {0}")]
    MarketState(#[from] MarketStateError),
    #[error("symbol '{0}' not found in loaded data")]
    SymbolNotFound(String),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// One emitted bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRow {
    pub bar_index: usize,
    pub date: NaiveDate,
    pub close: f64,
    pub update: MarketStateUpdate,
}

/// Band statistics over a symbol's emitted rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSummary {
    pub bar_count: usize,
    /// Bars before the first emitted update.
    pub warmup_bars: usize,
    pub emitted: usize,
    /// Updates carrying NaN because an input was not finite.
    pub invalid_updates: usize,
    pub bullish_bars: usize,
    pub bearish_bars: usize,
    pub neutral_bars: usize,
    /// Changes of band between consecutive valid updates.
    pub band_transitions: usize,
    pub last_band: Option<Band>,
    pub last_smoothed: Option<f64>,
}

impl StateSummary {
    pub fn from_rows(bar_count: usize, rows: &[StateRow]) -> Self {
        let mut summary = Self {
            bar_count,
            warmup_bars: rows.first().map_or(bar_count, |r| r.bar_index),
            emitted: rows.len(),
            ..Default::default()
        };

        let mut previous: Option<Band> = None;
        for row in rows {
            if !row.update.is_valid() {
                summary.invalid_updates += 1;
                continue;
            }
            match row.update.band {
                Band::Bullish => summary.bullish_bars += 1,
                Band::Bearish => summary.bearish_bars += 1,
                Band::Neutral => summary.neutral_bars += 1,
            }
            if previous.is_some_and(|p| p != row.update.band) {
                summary.band_transitions += 1;
            }
            previous = Some(row.update.band);
            summary.last_band = previous;
            summary.last_smoothed = Some(row.update.smoothed);
        }
        summary
    }

    /// Share of valid updates spent in `band`.
    pub fn band_share(&self, band: Band) -> f64 {
        let valid = self.emitted - self.invalid_updates;
        if valid == 0 {
            return 0.0;
        }
        let count = match band {
            Band::Bullish => self.bullish_bars,
            Band::Bearish => self.bearish_bars,
            Band::Neutral => self.neutral_bars,
        };
        count as f64 / valid as f64
    }
}

/// Persisted description of one symbol's run (`summary.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub symbol: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub ema_lengths: TierValues<usize>,
    pub ema_seed: EmaSeed,
    pub config: MarketStateConfig,
    pub summary: StateSummary,
    pub data_quality_warnings: Vec<String>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Complete result of a single symbol run.
#[derive(Debug, Clone)]
pub struct SymbolRun {
    pub manifest: RunManifest,
    pub rows: Vec<StateRow>,
}

/// Run every configured symbol, loading bars from the configured source.
pub fn run(config: &RunConfig) -> Result<Vec<SymbolRun>, RunError> {
    config.validate()?;
    let loaded = load_bars(&config.data)?;
    run_loaded(config, &loaded)
}

/// Run every configured symbol over pre-loaded bars, in parallel.
///
/// Results come back in `config.data.symbols` order.
pub fn run_loaded(config: &RunConfig, loaded: &LoadedData) -> Result<Vec<SymbolRun>, RunError> {
    let run_id = config.run_id()?;
    config
        .data
        .symbols
        .par_iter()
        .map(|symbol| {
            let bars = loaded
                .bars
                .get(symbol)
                .ok_or_else(|| RunError::SymbolNotFound(symbol.clone()))?;
            let rows = run_symbol(symbol, bars, &config.ema, &config.market_state)?;
            let summary = StateSummary::from_rows(bars.len(), &rows);
            info!(
                %symbol,
                bars = summary.bar_count,
                emitted = summary.emitted,
                transitions = summary.band_transitions,
                last_band = ?summary.last_band,
                "symbol run complete"
            );

            let prefix = format!("{symbol}: ");
            Ok(SymbolRun {
                manifest: RunManifest {
                    schema_version: SCHEMA_VERSION,
                    run_id: run_id.clone(),
                    symbol: symbol.clone(),
                    start_date: bars.first().map(|b| b.date),
                    end_date: bars.last().map(|b| b.date),
                    dataset_hash: loaded.dataset_hash.clone(),
                    has_synthetic: loaded.has_synthetic,
                    ema_lengths: config.ema.lengths,
                    ema_seed: config.ema.seed,
                    config: config.market_state.clone(),
                    summary,
                    data_quality_warnings: loaded
                        .data_quality_warnings
                        .iter()
                        .filter(|w| w.starts_with(&prefix))
                        .cloned()
                        .collect(),
                },
                rows,
            })
        })
        .collect()
}

/// Run a single symbol's bars through a fresh stream. No I/O.
pub fn run_symbol(
    symbol: &str,
    bars: &[Bar],
    ema: &EmaConfig,
    config: &MarketStateConfig,
) -> Result<Vec<StateRow>, RunError> {
    let mut stream = MarketStateStream::new(symbol, ema, config.clone())?;
    let rows = bars
        .iter()
        .enumerate()
        .filter_map(|(bar_index, bar)| {
            stream.on_bar(bar).map(|update| StateRow {
                bar_index,
                date: bar.date,
                close: bar.close,
                update,
            })
        })
        .collect();
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketstate_core::{BandValues, ChannelOutput};
    use marketstate_core::state::ThresholdSet;

    fn row(bar_index: usize, smoothed: f64, valid: bool) -> StateRow {
        let t = ThresholdSet::new(0.1, None);
        StateRow {
            bar_index,
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            close: 1.0,
            update: MarketStateUpdate {
                slopes: TierValues::new(0.0, 0.0, 0.0),
                thresholds: TierValues::new(t, t, t),
                scores: valid.then_some(TierValues::new(0, 0, 0)),
                raw: valid.then_some(0),
                smoothed,
                band: Band::classify(smoothed),
                output: ChannelOutput::ThreeChannel(BandValues::from_smoothed(smoothed)),
            },
        }
    }

    #[test]
    fn summary_counts_bands_and_transitions() {
        let rows = vec![
            row(5, 0.0, true),
            row(6, 2.5, true),
            row(7, 2.1, true),
            row(8, f64::NAN, false),
            row(9, -3.0, true),
            row(10, 0.5, true),
        ];
        let s = StateSummary::from_rows(11, &rows);
        assert_eq!(s.bar_count, 11);
        assert_eq!(s.warmup_bars, 5);
        assert_eq!(s.emitted, 6);
        assert_eq!(s.invalid_updates, 1);
        assert_eq!(s.bullish_bars, 2);
        assert_eq!(s.bearish_bars, 1);
        assert_eq!(s.neutral_bars, 2);
        // neutral → bullish → bearish → neutral
        assert_eq!(s.band_transitions, 3);
        assert_eq!(s.last_band, Some(Band::Neutral));
        assert_eq!(s.last_smoothed, Some(0.5));
        assert!((s.band_share(Band::Bullish) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn summary_of_no_rows_is_all_warmup() {
        let s = StateSummary::from_rows(7, &[]);
        assert_eq!(s.warmup_bars, 7);
        assert_eq!(s.emitted, 0);
        assert_eq!(s.last_band, None);
        assert_eq!(s.band_share(Band::Neutral), 0.0);
    }

    #[test]
    fn run_symbol_records_bar_indices() {
        let bars: Vec<Bar> = (0..40)
            .map(|i| Bar {
                symbol: "ES".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i),
                open: 10.0,
                high: 10.0,
                low: 10.0,
                close: 10.0,
                volume: 0,
            })
            .collect();
        let config = MarketStateConfig::with_periods(2, 3, 5);
        let rows = run_symbol("ES", &bars, &EmaConfig::default(), &config).unwrap();
        assert_eq!(rows.len(), 35);
        assert_eq!(rows[0].bar_index, 5);
        assert_eq!(rows[0].date, bars[5].date);
        assert!(rows.iter().all(|r| r.update.band == Band::Neutral));
    }

    #[test]
    fn missing_symbol_is_reported() {
        let mut config = RunConfig::default();
        config.data.symbols = vec!["ES".into()];
        let loaded = LoadedData {
            bars: Default::default(),
            dataset_hash: String::new(),
            has_synthetic: false,
            data_quality_warnings: vec![],
        };
        let err = run_loaded(&config, &loaded).unwrap_err();
        assert!(matches!(err, RunError::SymbolNotFound(s) if s == "ES"));
    }
}
