//! Moving average crossover: enter on the golden cross, exit on the death cross.

use super::SignalGenerator;
use crate::domain::{PriceSeries, Signal};
use crate::indicators::{Indicator, Sma};
use crate::strategy::StrategyError;

/// Fast/slow SMA crossover.
///
/// EnterLong when fast crosses above slow (current fast > slow, previous
/// fast <= slow). ExitLong on the opposite cross.
#[derive(Debug, Clone)]
pub struct MaCrossover {
    fast: Sma,
    slow: Sma,
}

impl MaCrossover {
    pub fn new(fast_period: usize, slow_period: usize) -> Result<Self, StrategyError> {
        if fast_period == 0 {
            return Err(StrategyError::invalid("fast_period", "must be >= 1"));
        }
        if slow_period <= fast_period {
            return Err(StrategyError::invalid(
                "slow_period",
                format!("must be > fast_period ({fast_period}), got {slow_period}"),
            ));
        }
        Ok(Self {
            fast: Sma::new(fast_period),
            slow: Sma::new(slow_period),
        })
    }

    pub fn fast_period(&self) -> usize {
        self.fast.period()
    }

    pub fn slow_period(&self) -> usize {
        self.slow.period()
    }
}

impl SignalGenerator for MaCrossover {
    fn name(&self) -> &str {
        "ma_crossover"
    }

    /// Slow SMA warmup, its first value, and one prior value to detect a cross.
    fn warmup_bars(&self) -> usize {
        self.slow.warmup() + 2
    }

    fn generate(&self, series: &PriceSeries) -> Result<Vec<Signal>, StrategyError> {
        let closes = series.closes();
        let fast = self.fast.compute(&closes);
        let slow = self.slow.compute(&closes);

        let mut signals = vec![Signal::Hold; closes.len()];
        for i in 1..closes.len() {
            let (fc, sc, fp, sp) = (fast[i], slow[i], fast[i - 1], slow[i - 1]);
            if fc.is_nan() || sc.is_nan() || fp.is_nan() || sp.is_nan() {
                continue;
            }
            if fc > sc && fp <= sp {
                signals[i] = Signal::EnterLong;
            } else if fc < sc && fp >= sp {
                signals[i] = Signal::ExitLong;
            }
        }
        Ok(signals)
    }
}
