//! Bar loading for the runner.
//!
//! Two sources:
//! 1. CSV file → rows grouped by the optional `symbol` column
//! 2. Synthetic → deterministic random walk per symbol (tagged)
//!
//! Bars are sorted by date and duplicate dates are dropped (first wins).
//! Void bars (NaN prices) are dropped before that and counted in a data
//! quality warning; a single NaN close would otherwise poison the EMAs for
//! the rest of the series. Other OHLC inconsistencies are kept but reported.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use marketstate_core::domain::Bar;

use crate::config::{DataConfig, DataSource, SyntheticConfig};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("no bars for '{symbol}' in {path}")]
    NoBars { symbol: String, path: PathBuf },
}

/// Loaded bars plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    /// Date-sorted bars per requested symbol.
    pub bars: BTreeMap<String, Vec<Bar>>,
    /// BLAKE3 over all bar data, in symbol order.
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub data_quality_warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    symbol: Option<String>,
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: u64,
}

/// Load bars for every configured symbol.
pub fn load_bars(data: &DataConfig) -> Result<LoadedData, LoadError> {
    let (raw, has_synthetic) = match &data.source {
        DataSource::Csv { path } => (load_csv(path, &data.symbols)?, false),
        DataSource::Synthetic(synthetic) => {
            let raw = data
                .symbols
                .iter()
                .map(|symbol| {
                    warn!(%symbol, "generating synthetic bars, results are tagged synthetic");
                    (symbol.clone(), generate_synthetic_bars(symbol, synthetic))
                })
                .collect();
            (raw, true)
        }
    };

    let mut bars = BTreeMap::new();
    let mut data_quality_warnings = Vec::new();
    for (symbol, series) in raw {
        let (series, dropped) = normalize(series);
        data_quality_warnings.extend(quality_warnings(&symbol, &series, dropped));
        bars.insert(symbol, series);
    }
    for warning in &data_quality_warnings {
        warn!("{warning}");
    }

    let dataset_hash = compute_dataset_hash(&bars);
    Ok(LoadedData {
        bars,
        dataset_hash,
        has_synthetic,
        data_quality_warnings,
    })
}

/// Read a CSV file and keep rows for the requested symbols.
///
/// Rows without a symbol belong to `symbols[0]`.
pub fn load_csv(path: &Path, symbols: &[String]) -> Result<HashMap<String, Vec<Bar>>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let default_symbol = symbols.first().cloned().unwrap_or_default();
    let mut out: HashMap<String, Vec<Bar>> =
        symbols.iter().map(|s| (s.clone(), Vec::new())).collect();

    for row in reader.deserialize::<CsvRow>() {
        let row = row.map_err(csv_err)?;
        let symbol = row
            .symbol
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default_symbol.clone());
        if let Some(series) = out.get_mut(&symbol) {
            series.push(Bar {
                symbol,
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }
    }

    if let Some((symbol, _)) = out.iter().find(|(_, bars)| bars.is_empty()) {
        return Err(LoadError::NoBars {
            symbol: symbol.clone(),
            path: path.to_path_buf(),
        });
    }
    Ok(out)
}

/// Drop void bars, sort by date and drop repeated dates.
///
/// Returns the cleaned bars and the number of void bars removed.
fn normalize(mut bars: Vec<Bar>) -> (Vec<Bar>, usize) {
    let before = bars.len();
    bars.retain(|b| !b.is_void());
    let dropped = before - bars.len();
    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    (bars, dropped)
}

fn quality_warnings(symbol: &str, bars: &[Bar], dropped_void: usize) -> Vec<String> {
    let mut warnings = Vec::new();
    if dropped_void > 0 {
        warnings.push(format!(
            "{symbol}: dropped {dropped_void} void bar(s) with NaN prices"
        ));
    }
    let insane = bars.iter().filter(|b| !b.is_sane()).count();
    if insane > 0 {
        warnings.push(format!("{symbol}: {insane} bar(s) with inconsistent OHLC"));
    }
    warnings
}

/// Compute a deterministic BLAKE3 hash over all bar data.
fn compute_dataset_hash(bars: &BTreeMap<String, Vec<Bar>>) -> String {
    let mut hasher = blake3::Hasher::new();
    for (symbol, series) in bars {
        hasher.update(symbol.as_bytes());
        for bar in series {
            hasher.update(bar.date.to_string().as_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Generate synthetic bars for testing/development.
///
/// Random walk whose drift alternates sign every `regime_length` bars, so
/// long runs pass through bullish, bearish and neutral stretches. The path
/// depends only on the symbol and `config`.
pub fn generate_synthetic_bars(symbol: &str, config: &SyntheticConfig) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    hasher.update(&config.seed.to_le_bytes());
    let seed: [u8; 32] = *hasher.finalize().as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::with_capacity(config.bars);
    let mut price = config.start_price;
    let mut current = config.start_date;

    while bars.len() < config.bars {
        // Skip weekends (simple heuristic)
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let regime = bars.len() / config.regime_length;
        let drift = if regime % 2 == 0 {
            config.drift
        } else {
            -config.drift
        };
        let noise = if config.volatility > 0.0 {
            rng.gen_range(-config.volatility..config.volatility)
        } else {
            0.0
        };
        let open = price;
        let close = price * (1.0 + drift + noise);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.005));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.005));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(Bar {
            symbol: symbol.to_string(),
            date: current,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}
