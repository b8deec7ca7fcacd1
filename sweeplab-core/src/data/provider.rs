//! Dataset provider trait and structured error types.
//!
//! The DatasetProvider trait abstracts over data sources (CSV files, synthetic
//! generators, in-memory fixtures) so the optimizer can swap implementations
//! and tests can mock them. Providers always return a normalized, validated
//! [`PriceSeries`].

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{PriceSeries, SeriesError};

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no bars for '{symbol}' between {start} and {end}")]
    NoData {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid series: {0}")]
    Series(#[from] SeriesError),

    #[error("data error: {0}")]
    Other(String),
}

/// Trait for dataset providers.
pub trait DatasetProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily bars for a symbol over `[start, end]` (inclusive).
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<PriceSeries, DataError>;
}

pub(crate) fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), DataError> {
    if start > end {
        return Err(DataError::InvalidRange { start, end });
    }
    Ok(())
}

/// Serves one pre-built series, filtered to the requested dates.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    series: PriceSeries,
}

impl StaticProvider {
    pub fn new(series: PriceSeries) -> Self {
        Self { series }
    }
}

impl DatasetProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        check_range(start, end)?;
        if symbol != self.series.symbol() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        self.series
            .slice_dates(start, end)
            .map_err(|_| DataError::NoData {
                symbol: symbol.to_string(),
                start,
                end,
            })
    }
}
