//! Result export: pretty JSON for the whole run, CSV for the leaderboard.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::optimizer::OptimizationResult;

pub const RESULT_JSON: &str = "result.json";
pub const TOP_RESULTS_CSV: &str = "top_results.csv";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer error: {0}")]
    Buffer(String),
}

// ─── JSON ────────────────────────────────────────────────────────────

pub fn result_json(result: &OptimizationResult) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Write `result.json` into `dir`, creating it if needed.
pub fn write_result_json(dir: &Path, result: &OptimizationResult) -> Result<PathBuf, ExportError> {
    write_file(dir, RESULT_JSON, &result_json(result)?)
}

// ─── CSV ─────────────────────────────────────────────────────────────

/// Leaderboard as CSV.
///
/// Columns: rank, index, score, params, total_return, sharpe_ratio,
/// max_drawdown, win_rate, profit_factor, trade_count
pub fn top_results_csv(result: &OptimizationResult) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "index",
        "score",
        "params",
        "total_return",
        "sharpe_ratio",
        "max_drawdown",
        "win_rate",
        "profit_factor",
        "trade_count",
    ])?;

    for r in &result.top_results {
        let m = &r.metrics;
        wtr.write_record([
            r.rank.to_string(),
            r.index.to_string(),
            format!("{:.6}", r.score),
            r.params.to_string(),
            format!("{:.6}", m.total_return),
            format!("{:.6}", m.sharpe_ratio),
            format!("{:.6}", m.max_drawdown),
            format!("{:.6}", m.win_rate),
            format!("{:.6}", m.profit_factor),
            m.trade_count.to_string(),
        ])?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Buffer(e.to_string()))
}

/// Write `top_results.csv` into `dir`, creating it if needed.
pub fn write_top_results_csv(
    dir: &Path,
    result: &OptimizationResult,
) -> Result<PathBuf, ExportError> {
    write_file(dir, TOP_RESULTS_CSV, &top_results_csv(result)?)
}

fn write_file(dir: &Path, name: &str, contents: &str) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(name);
    fs::write(&path, contents).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
