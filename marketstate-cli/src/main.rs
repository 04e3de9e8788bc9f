//! Market State CLI: run the calculator over bar data and inspect bands.
//!
//! Commands:
//! - `run`: run every configured symbol from a TOML config (or defaults),
//!   print a summary per symbol and save `states.csv` / `summary.json`
//! - `default-config`: print the default TOML config
//! - `classify`: print the band and channel values for a smoothed value

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use marketstate_core::{Band, BandValues};
use marketstate_runner::{run, save_artifacts, DataSource, RunConfig, SymbolRun, SyntheticConfig};

#[derive(Parser)]
#[command(
    name = "marketstate",
    about = "Market state: EMA-slope trend scoring over daily bars"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the market state calculator from a TOML config file.
    Run {
        /// Path to a TOML config file. Defaults to the built-in config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// CSV file with date,open,high,low,close[,volume][,symbol] columns.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Symbols to run (repeatable). Overrides the config.
        #[arg(long)]
        symbol: Vec<String>,

        /// Use synthetic bars instead of the configured source.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary without writing artifacts.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Print the default TOML config.
    DefaultConfig,
    /// Classify a smoothed market state value into its band.
    Classify {
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            input,
            symbol,
            synthetic,
            output_dir,
            no_save,
        } => run_cmd(config, input, symbol, synthetic, output_dir, no_save),
        Commands::DefaultConfig => {
            print!("{}", RunConfig::default().to_toml()?);
            Ok(())
        }
        Commands::Classify { value } => classify_cmd(value),
    }
}

/// Initialise a `Subscriber` for `tracing` logs, INFO unless `RUST_LOG` says otherwise.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .init()
}

fn run_cmd(
    config_path: Option<PathBuf>,
    input: Option<PathBuf>,
    symbols: Vec<String>,
    synthetic: bool,
    output_dir: PathBuf,
    no_save: bool,
) -> Result<()> {
    if input.is_some() && synthetic {
        bail!("--input and --synthetic are mutually exclusive");
    }

    let mut config = match &config_path {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };
    if !symbols.is_empty() {
        config.data.symbols = symbols;
    }
    if let Some(path) = input {
        config.data.source = DataSource::Csv { path };
    } else if synthetic && !config.data.is_synthetic() {
        config.data.source = DataSource::Synthetic(SyntheticConfig::default());
    }
    config.validate()?;

    info!(
        symbols = ?config.data.symbols,
        synthetic = config.data.is_synthetic(),
        "starting run"
    );
    let results = run(&config)?;

    for result in &results {
        print_summary(result);
        if !no_save {
            let run_dir = save_artifacts(result, &output_dir)?;
            println!("Artifacts saved to: {}", run_dir.display());
        }
    }

    Ok(())
}

fn classify_cmd(value: f64) -> Result<()> {
    if value.is_nan() {
        bail!("value must be a number, got NaN");
    }
    let band = Band::classify(value);
    let channels = BandValues::from_smoothed(value);
    println!("{band}");
    println!("{}", serde_json::to_string(&channels)?);
    Ok(())
}

fn print_summary(result: &SymbolRun) {
    let m = &result.manifest;
    let s = &m.summary;
    let fmt_date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();

    println!();
    println!("=== Market State ===");
    println!("Symbol:         {}", m.symbol);
    println!(
        "Period:         {} to {}",
        fmt_date(m.start_date),
        fmt_date(m.end_date)
    );
    println!("Bars:           {} ({} warmup)", s.bar_count, s.warmup_bars);
    println!("Updates:        {} ({} invalid)", s.emitted, s.invalid_updates);
    println!("Run ID:         {}", &m.run_id[..12.min(m.run_id.len())]);
    println!();
    println!("--- Bands ---");
    for (band, count) in [
        (Band::Bullish, s.bullish_bars),
        (Band::Neutral, s.neutral_bars),
        (Band::Bearish, s.bearish_bars),
    ] {
        println!(
            "{:<15} {:>6} ({:.1}%)",
            format!("{}:", band.as_str()),
            count,
            s.band_share(band) * 100.0
        );
    }
    println!("Transitions:    {}", s.band_transitions);
    match (s.last_band, s.last_smoothed) {
        (Some(band), Some(value)) => println!("Last:           {band} ({value:.3})"),
        _ => println!("Last:           (no valid update)"),
    }
    if m.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    for warn in &m.data_quality_warnings {
        println!("WARNING: {warn}");
    }
    println!();
}
