//! PriceSeries: validated, read-only bar history for one symbol.
//!
//! A series can only be built through [`PriceSeries::new`], which enforces:
//! - at least one bar
//! - strictly increasing dates (no duplicates)
//! - finite, positive close on every bar
//!
//! Upstream normalization (`data::canonicalize::normalize`) is expected to
//! sort, dedupe and drop bad rows before construction; the constructor only
//! verifies the contract.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::bar::PriceBar;

/// Violations of the PriceSeries contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("price series for '{symbol}' is empty")]
    Empty { symbol: String },

    #[error("dates not strictly increasing at bar {index}: {previous} then {current}")]
    NotIncreasing {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("invalid close {close} at bar {index} ({date})")]
    InvalidClose {
        index: usize,
        date: NaiveDate,
        close: f64,
    },
}

/// Ordered bars for a single symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        if bars.is_empty() {
            return Err(SeriesError::Empty { symbol });
        }
        for (index, bar) in bars.iter().enumerate() {
            if !bar.close.is_finite() || bar.close <= 0.0 {
                return Err(SeriesError::InvalidClose {
                    index,
                    date: bar.date,
                    close: bar.close,
                });
            }
            if index > 0 && bar.date <= bars[index - 1].date {
                return Err(SeriesError::NotIncreasing {
                    index,
                    previous: bars[index - 1].date,
                    current: bar.date,
                });
            }
        }
        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false for a constructed series; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }

    pub fn last_close(&self) -> f64 {
        self.bars[self.bars.len() - 1].close
    }

    /// Keep only bars within `[start, end]` (inclusive).
    pub fn slice_dates(&self, start: NaiveDate, end: NaiveDate) -> Result<Self, SeriesError> {
        let bars = self
            .bars
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .copied()
            .collect();
        Self::new(self.symbol.clone(), bars)
    }

    /// Content hash of the series (BLAKE3, hex) for provenance.
    ///
    /// Identical symbol and bar data always hash identically.
    pub fn dataset_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.symbol.as_bytes());
        for bar in &self.bars {
            hasher.update(bar.date.to_string().as_bytes());
            for v in [bar.open, bar.high, bar.low, bar.close] {
                hasher.update(&v.to_le_bytes());
            }
            hasher.update(&bar.volume.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}
