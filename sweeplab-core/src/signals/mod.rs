//! Signal generation: turns bar history into one [`Signal`] per bar.
//!
//! Generators never see portfolio state. The value at bar t may only depend
//! on bars `0..=t`. Bars before `warmup_bars()` are always `Hold`.

pub mod factory;
pub mod ma_cross;
pub mod momentum;

pub use factory::{create_signal, known_signals};
pub use ma_cross::MaCrossover;
pub use momentum::Momentum;

use crate::domain::{PriceSeries, Signal};
use crate::strategy::StrategyError;

/// Trait for signal generators.
pub trait SignalGenerator: Send + Sync {
    /// Human-readable name (e.g., "ma_crossover").
    fn name(&self) -> &str;

    /// Number of bars needed before this generator can produce output.
    fn warmup_bars(&self) -> usize;

    /// Signals for every bar of `series`; the result has `series.len()` entries.
    fn generate(&self, series: &PriceSeries) -> Result<Vec<Signal>, StrategyError>;
}

#[cfg(test)]
pub(crate) fn make_series(closes: &[f64]) -> PriceSeries {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            crate::domain::PriceBar::flat(base + chrono::Duration::days(i as i64), c)
        })
        .collect();
    PriceSeries::new("TEST", bars).unwrap()
}
