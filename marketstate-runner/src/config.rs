//! Serializable run configuration, loaded from TOML.
//!
//! ```toml
//! [data]
//! symbols = ["ES", "NQ"]
//! source = "synthetic"
//! seed = 42
//! bars = 3000
//!
//! [ema]
//! lengths = { mini = 8, fast = 50, slow = 200 }
//!
//! [market_state]
//! periods = { mini = 8, fast = 20, slow = 100 }
//! smoothing_period = 5
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use marketstate_core::indicators::EmaSeed;
use marketstate_core::{MarketStateConfig, MarketStateError, TierValues};

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(String),
    #[error("invalid market state config: {0}")]
    MarketState(#[from] MarketStateError),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Top-level config for one `marketstate run`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub data: DataConfig,
    pub ema: EmaConfig,
    pub market_state: MarketStateConfig,
}

impl RunConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.data.validate()?;
        self.ema.validate()?;
        self.market_state.validate()?;
        Ok(())
    }

    /// Deterministic hash of the full config.
    ///
    /// Two runs with identical configs share a `RunId`.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json =
            serde_json::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

/// Where bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DataSource {
    /// CSV with a `date,open,high,low,close,volume` header and an optional
    /// `symbol` column. Without the column every row belongs to the first
    /// configured symbol.
    Csv { path: PathBuf },
    /// Deterministic random walk, one independent path per symbol.
    Synthetic(SyntheticConfig),
}

impl Default for DataSource {
    fn default() -> Self {
        DataSource::Synthetic(SyntheticConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Mixed with the symbol name to seed each path.
    pub seed: u64,
    pub bars: usize,
    pub start_date: NaiveDate,
    pub start_price: f64,
    /// Peak per-bar drift; the sign flips every `regime_length` bars.
    pub drift: f64,
    /// Half-width of the uniform per-bar return noise.
    pub volatility: f64,
    pub regime_length: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            bars: 3000,
            start_date: NaiveDate::from_ymd_opt(2014, 1, 2).unwrap_or(NaiveDate::MIN),
            start_price: 100.0,
            drift: 0.002,
            volatility: 0.01,
            regime_length: 400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Symbols to run. A `[data]` table must also name its `source`.
    pub symbols: Vec<String>,
    #[serde(flatten)]
    pub source: DataSource,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["SYNTH".to_string()],
            source: DataSource::default(),
        }
    }
}

impl DataConfig {
    pub fn is_synthetic(&self) -> bool {
        matches!(self.source, DataSource::Synthetic(_))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid {
                field: "data.symbols",
                reason: "at least one symbol is required".into(),
            });
        }
        if let Some(blank) = self.symbols.iter().find(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "data.symbols",
                reason: format!("blank symbol {blank:?}"),
            });
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.symbols.iter().find(|&s| !seen.insert(s)) {
            return Err(ConfigError::Invalid {
                field: "data.symbols",
                reason: format!("duplicate symbol {dup:?}"),
            });
        }
        if let DataSource::Synthetic(synthetic) = &self.source {
            if synthetic.bars == 0 {
                return Err(ConfigError::Invalid {
                    field: "data.bars",
                    reason: "must be >= 1".into(),
                });
            }
            if !(synthetic.start_price.is_finite() && synthetic.start_price > 0.0) {
                return Err(ConfigError::Invalid {
                    field: "data.start_price",
                    reason: format!("must be positive, got {}", synthetic.start_price),
                });
            }
            if !(synthetic.volatility.is_finite() && (0.0..1.0).contains(&synthetic.volatility)) {
                return Err(ConfigError::Invalid {
                    field: "data.volatility",
                    reason: format!("must be in [0, 1), got {}", synthetic.volatility),
                });
            }
            if !synthetic.drift.is_finite() || synthetic.drift.abs() >= 1.0 {
                return Err(ConfigError::Invalid {
                    field: "data.drift",
                    reason: format!("must be in (-1, 1), got {}", synthetic.drift),
                });
            }
            if synthetic.regime_length == 0 {
                return Err(ConfigError::Invalid {
                    field: "data.regime_length",
                    reason: "must be >= 1".into(),
                });
            }
        }
        Ok(())
    }
}

/// EMA value providers feeding the three tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaConfig {
    pub lengths: TierValues<usize>,
    pub seed: EmaSeed,
}

impl Default for EmaConfig {
    fn default() -> Self {
        Self {
            lengths: TierValues::new(8, 50, 200),
            seed: EmaSeed::FirstValue,
        }
    }
}

impl EmaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (tier, &length) in self.lengths.iter() {
            if length == 0 {
                return Err(ConfigError::Invalid {
                    field: "ema.lengths",
                    reason: format!("{} length must be >= 1", tier.as_str()),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketstate_core::{RangeMethod, ThresholdMode};

    #[test]
    fn run_id_deterministic() {
        let config = RunConfig::default();
        let id1 = config.run_id().unwrap();
        let id2 = config.run_id().unwrap();
        assert_eq!(id1, id2, "RunId should be deterministic");
        assert_eq!(id1.len(), 64);
    }

    #[test]
    fn run_id_changes_with_params() {
        let config1 = RunConfig::default();
        let mut config2 = config1.clone();
        config2.market_state.smoothing_period = 3;
        assert_ne!(config1.run_id().unwrap(), config2.run_id().unwrap());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = RunConfig::from_toml("").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.ema.lengths, TierValues::new(8, 50, 200));
        assert_eq!(config.market_state.periods, TierValues::new(8, 20, 100));
        assert!(config.data.is_synthetic());
    }

    #[test]
    fn parses_csv_source_and_overrides() {
        let toml_str = r#"
            [data]
            symbols = ["ES"]
            source = "csv"
            path = "bars/es.csv"

            [ema]
            lengths = { mini = 5, fast = 21, slow = 89 }
            seed = "sma"

            [market_state]
            smoothing_period = 3
            mini_double_band = false

            [market_state.thresholds]
            type = "adaptive"
            lookback = 500
            neutral_ratio = 0.1
            double_ratio = 0.4
            method = "rolling"
        "#;
        let config = RunConfig::from_toml(toml_str).unwrap();
        assert_eq!(
            config.data.source,
            DataSource::Csv {
                path: PathBuf::from("bars/es.csv")
            }
        );
        assert_eq!(config.ema.lengths, TierValues::new(5, 21, 89));
        assert_eq!(config.ema.seed, EmaSeed::Sma);
        assert_eq!(config.market_state.smoothing_period, 3);
        assert!(!config.market_state.mini_double_band);
        assert_eq!(
            config.market_state.thresholds,
            ThresholdMode::Adaptive {
                lookback: 500,
                neutral_ratio: 0.1,
                double_ratio: 0.4,
                method: RangeMethod::Rolling,
            }
        );
    }

    #[test]
    fn parses_fixed_thresholds() {
        let toml_str = r#"
            [market_state.thresholds]
            type = "fixed"
            neutral = 0.05
            double = 0.3
        "#;
        let config = RunConfig::from_toml(toml_str).unwrap();
        assert_eq!(
            config.market_state.thresholds,
            ThresholdMode::Fixed {
                neutral: 0.05,
                double: 0.3
            }
        );
    }

    #[test]
    fn default_config_survives_toml_roundtrip() {
        let config = RunConfig::default();
        let toml_str = config.to_toml().unwrap();
        assert_eq!(RunConfig::from_toml(&toml_str).unwrap(), config);
    }

    #[test]
    fn rejects_zero_ema_length() {
        let err = RunConfig::from_toml("[ema]\nlengths = { mini = 0, fast = 50, slow = 200 }")
            .unwrap_err();
        assert!(err.to_string().contains("mini length must be >= 1"), "{err}");
    }

    #[test]
    fn rejects_invalid_core_config() {
        let err = RunConfig::from_toml("[market_state]\nsmoothing_period = 0").unwrap_err();
        assert!(matches!(err, ConfigError::MarketState(_)), "{err}");
    }

    #[test]
    fn rejects_empty_symbols() {
        let err = RunConfig::from_toml("[data]\nsymbols = []\nsource = \"synthetic\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "data.symbols", .. }));
    }

    #[test]
    fn rejects_duplicate_symbols() {
        let err = RunConfig::from_toml(
            "[data]\nsymbols = [\"ES\", \"NQ\", \"ES\"]\nsource = \"synthetic\"",
        )
        .unwrap_err();
        match err {
            ConfigError::Invalid { field, reason } => {
                assert_eq!(field, "data.symbols");
                assert!(reason.contains("duplicate symbol \"ES\""), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_unparseable_toml() {
        assert!(matches!(
            RunConfig::from_toml("[data\n").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }
}
