//! Rate-of-change momentum.
//!
//! EnterLong when ROC over `lookback` bars exceeds `threshold`, ExitLong when
//! it falls below `-threshold`. A zero-volatility series never trades.

use super::SignalGenerator;
use crate::domain::{PriceSeries, Signal};
use crate::indicators::{Indicator, Roc};
use crate::strategy::StrategyError;

#[derive(Debug, Clone)]
pub struct Momentum {
    roc: Roc,
    threshold: f64,
}

impl Momentum {
    pub fn new(lookback: usize, threshold: f64) -> Result<Self, StrategyError> {
        if lookback == 0 {
            return Err(StrategyError::invalid("lookback", "must be >= 1"));
        }
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(StrategyError::invalid(
                "threshold",
                format!("must be finite and >= 0, got {threshold}"),
            ));
        }
        Ok(Self {
            roc: Roc::new(lookback),
            threshold,
        })
    }

    pub fn lookback(&self) -> usize {
        self.roc.period()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl SignalGenerator for Momentum {
    fn name(&self) -> &str {
        "momentum"
    }

    fn warmup_bars(&self) -> usize {
        self.roc.warmup() + 1
    }

    fn generate(&self, series: &PriceSeries) -> Result<Vec<Signal>, StrategyError> {
        let roc = self.roc.compute(&series.closes());
        Ok(roc
            .into_iter()
            .map(|r| {
                if r.is_nan() {
                    Signal::Hold
                } else if r > self.threshold {
                    Signal::EnterLong
                } else if r < -self.threshold {
                    Signal::ExitLong
                } else {
                    Signal::Hold
                }
            })
            .collect())
    }
}
