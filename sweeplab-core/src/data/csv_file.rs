//! CSV import.
//!
//! Expected columns (header row, case as below or capitalized, extra columns
//! ignored): `date, open, high, low, close, volume`. Dates are `YYYY-MM-DD`.
//! Empty price cells load as NaN and are dropped by normalization.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use super::canonicalize::build_series;
use super::provider::{check_range, DataError, DatasetProvider};
use crate::domain::{PriceBar, PriceSeries};

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "Open")]
    open: Option<f64>,
    #[serde(alias = "High")]
    high: Option<f64>,
    #[serde(alias = "Low")]
    low: Option<f64>,
    #[serde(alias = "Close")]
    close: Option<f64>,
    #[serde(alias = "Volume", default)]
    volume: Option<f64>,
}

impl CsvRow {
    fn into_bar(self) -> PriceBar {
        let close = self.close.unwrap_or(f64::NAN);
        PriceBar {
            date: self.date,
            open: self.open.unwrap_or(close),
            high: self.high.unwrap_or(close),
            low: self.low.unwrap_or(close),
            close,
            volume: self.volume.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0) as u64,
        }
    }
}

/// Reads bars from a CSV file, or from `<dir>/<SYMBOL>.csv` when given a directory.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    path: PathBuf,
}

impl CsvProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn resolve(&self, symbol: &str) -> PathBuf {
        if self.path.is_dir() {
            self.path.join(format!("{symbol}.csv"))
        } else {
            self.path.clone()
        }
    }
}

/// Parse every row of a CSV file into raw (unnormalized) bars.
pub fn read_bars(path: &Path) -> Result<Vec<PriceBar>, DataError> {
    let file = std::fs::File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut bars = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        bars.push(row?.into_bar());
    }
    Ok(bars)
}

impl DatasetProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        check_range(start, end)?;
        let path = self.resolve(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let raw = read_bars(&path)?;
        let series = build_series(symbol, raw, start, end)?;
        info!(
            symbol,
            path = %path.display(),
            bars = series.len(),
            "loaded CSV dataset"
        );
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn write_csv(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_unsorted_rows_with_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "spy.csv",
            "date,open,high,low,close,volume\n\
             2024-01-03,11,12,10,11.5,1000\n\
             2024-01-02,10,11,9,10.5,900\n\
             2024-01-03,50,50,50,50,1\n\
             2024-01-04,12,13,11,,800\n\
             2024-01-05,12,13,11,12.5,700\n",
        );
        let series = CsvProvider::new(path).fetch("SPY", day(1), day(31)).unwrap();
        assert_eq!(series.closes(), vec![10.5, 11.5, 12.5]);
        assert_eq!(series.bars()[0].volume, 900);
    }

    #[test]
    fn capitalized_headers_and_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "x.csv",
            "Date,Open,High,Low,Close,Adj Close,Volume\n2024-01-02,1,2,0.5,1.5,1.4,10\n",
        );
        let series = CsvProvider::new(path).fetch("X", day(1), day(31)).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.last_close(), 1.5);
    }

    #[test]
    fn directory_resolves_symbol_file() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(
            dir.path(),
            "QQQ.csv",
            "date,open,high,low,close,volume\n2024-01-02,1,1,1,1,1\n",
        );
        let provider = CsvProvider::new(dir.path());
        assert!(provider.fetch("QQQ", day(1), day(31)).is_ok());
        assert!(matches!(
            provider.fetch("SPY", day(1), day(31)),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn malformed_date_is_csv_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "bad.csv",
            "date,open,high,low,close,volume\nnot-a-date,1,1,1,1,1\n",
        );
        let err = CsvProvider::new(path).fetch("X", day(1), day(31)).unwrap_err();
        assert!(matches!(err, DataError::Csv(_)));
    }
}
