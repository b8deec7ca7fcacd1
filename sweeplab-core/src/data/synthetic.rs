//! Seeded synthetic price data.
//!
//! Generates one bar per weekday in the requested window as a multiplicative
//! random walk. The same seed, symbol and window always produce the same
//! series. With zero volatility and zero drift the series is flat, which is
//! useful for exercising the no-trade path.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::Rng;

use super::canonicalize::build_series;
use super::provider::{check_range, DataError, DatasetProvider};
use crate::domain::{PriceBar, PriceSeries};
use crate::rng::RngHierarchy;

/// Random-walk data source.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    rng: RngHierarchy,
    start_price: f64,
    /// Mean per-bar return.
    drift: f64,
    /// Per-bar return standard deviation.
    volatility: f64,
}

impl SyntheticProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: RngHierarchy::new(seed),
            start_price: 100.0,
            drift: 0.0003,
            volatility: 0.015,
        }
    }

    /// Constant price, no noise.
    pub fn flat(price: f64) -> Self {
        Self {
            rng: RngHierarchy::new(0),
            start_price: price,
            drift: 0.0,
            volatility: 0.0,
        }
    }

    pub fn with_start_price(mut self, price: f64) -> Self {
        self.start_price = price;
        self
    }

    pub fn with_drift(mut self, drift: f64) -> Self {
        self.drift = drift;
        self
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    /// Raw bars for every weekday in `[start, end]`.
    pub fn generate(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<PriceBar> {
        let mut rng = self.rng.rng_for(symbol, 0);
        // Uniform(-1, 1) scaled to unit variance.
        let scale = 3f64.sqrt();
        let mut close = self.start_price;
        let mut bars = Vec::new();

        for date in start.iter_days().take_while(|d| *d <= end) {
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }
            let open = close;
            if self.volatility > 0.0 || self.drift != 0.0 {
                let shock: f64 = rng.gen_range(-1.0..1.0) * scale;
                close = (open * (1.0 + self.drift + self.volatility * shock)).max(0.01);
            }
            let spread = (open - close).abs() * 0.25 + open * self.volatility * 0.5;
            bars.push(PriceBar {
                date,
                open,
                high: open.max(close) + spread,
                low: (open.min(close) - spread).max(0.005),
                close,
                volume: 1_000_000,
            });
        }
        bars
    }
}

impl DatasetProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        check_range(start, end)?;
        build_series(symbol, self.generate(symbol, start, end), start, end)
    }
}
