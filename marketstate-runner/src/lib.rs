//! Market State Runner: hosting, data loading, multi-symbol runs, export.
//!
//! This crate builds on `marketstate-core` to provide:
//! - TOML run configuration
//! - Bar loading from CSV or a deterministic synthetic generator
//! - `MarketStateStream`, the per-symbol host owning EMAs, buffers and a calculator
//! - Parallel per-symbol runs with band summaries
//! - CSV/JSON artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod stream;

pub use config::{ConfigError, DataConfig, DataSource, EmaConfig, RunConfig, RunId, SyntheticConfig};
pub use data_loader::{generate_synthetic_bars, load_bars, LoadError, LoadedData};
pub use export::{export_json, export_states_csv, import_json, load_artifacts, save_artifacts};
pub use runner::{
    run, run_loaded, run_symbol, RunError, RunManifest, StateRow, StateSummary, SymbolRun,
    SCHEMA_VERSION,
};
pub use stream::MarketStateStream;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn stream_is_send() {
        assert_send::<MarketStateStream>();
    }

    #[test]
    fn results_are_send_sync() {
        assert_send::<SymbolRun>();
        assert_sync::<SymbolRun>();
        assert_send::<StateSummary>();
        assert_sync::<StateSummary>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
        assert_send::<LoadedData>();
        assert_sync::<LoadedData>();
    }
}
