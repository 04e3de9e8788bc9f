//! Artifact export: per-bar state CSV and run manifest JSON.
//!
//! The manifest carries a `schema_version` field. Newer versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::runner::{RunManifest, StateRow, SymbolRun, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `RunManifest` to pretty JSON.
pub fn export_json(manifest: &RunManifest) -> Result<String> {
    serde_json::to_string_pretty(manifest).context("failed to serialize RunManifest to JSON")
}

/// Deserialize a `RunManifest` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunManifest> {
    let manifest: RunManifest =
        serde_json::from_str(json).context("failed to deserialize RunManifest from JSON")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export emitted rows as CSV.
///
/// Columns: bar_index, date, close, slope_{tier}, neutral_{tier},
/// double_mini, score_{tier}, raw, smoothed, band, bullish, bearish, neutral.
/// Missing values are written as empty cells; the three channel columns are
/// empty in single-channel mode.
pub fn export_states_csv(rows: &[StateRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "bar_index",
        "date",
        "close",
        "slope_mini",
        "slope_fast",
        "slope_slow",
        "neutral_mini",
        "neutral_fast",
        "neutral_slow",
        "double_mini",
        "score_mini",
        "score_fast",
        "score_slow",
        "raw",
        "smoothed",
        "band",
        "bullish",
        "bearish",
        "neutral",
    ])?;

    fn num(v: f64) -> String {
        format!("{v:.8}")
    }
    fn opt<T: ToString>(v: Option<T>) -> String {
        v.map(|v| v.to_string()).unwrap_or_default()
    }

    for row in rows {
        let u = &row.update;
        let channels = u.output.band_values().copied().unwrap_or_default();
        wtr.write_record([
            row.bar_index.to_string(),
            row.date.to_string(),
            format!("{:.6}", row.close),
            num(u.slopes.mini),
            num(u.slopes.fast),
            num(u.slopes.slow),
            num(u.thresholds.mini.neutral),
            num(u.thresholds.fast.neutral),
            num(u.thresholds.slow.neutral),
            u.thresholds.mini.double.map(num).unwrap_or_default(),
            opt(u.scores.map(|s| s.mini)),
            opt(u.scores.map(|s| s.fast)),
            opt(u.scores.map(|s| s.slow)),
            opt(u.raw),
            num(u.smoothed),
            u.band.to_string(),
            channels.bullish.map(num).unwrap_or_default(),
            channels.bearish.map(num).unwrap_or_default(),
            channels.neutral.map(num).unwrap_or_default(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for one symbol.
///
/// Writes into `{output_dir}/{symbol}/`:
/// - `summary.json`: the `RunManifest`
/// - `states.csv`: one row per emitted update
///
/// Returns the path to the symbol directory.
pub fn save_artifacts(run: &SymbolRun, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(&run.manifest.symbol);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(&run.manifest)?;
    std::fs::write(run_dir.join("summary.json"), &json)
        .with_context(|| format!("failed to write summary.json in {}", run_dir.display()))?;

    let states_csv = export_states_csv(&run.rows)?;
    std::fs::write(run_dir.join("states.csv"), &states_csv)
        .with_context(|| format!("failed to write states.csv in {}", run_dir.display()))?;

    Ok(run_dir)
}

/// Load a `RunManifest` from an artifact directory's summary.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<RunManifest> {
    let path = dir.join("summary.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
