//! Fractional change over `period` bars: `close[t] / close[t - period] - 1`.

use super::Indicator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roc {
    period: usize,
}

impl Roc {
    /// A zero period is clamped to 1.
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Roc {
    fn warmup(&self) -> usize {
        self.period
    }

    fn compute(&self, closes: &[f64]) -> Vec<f64> {
        (0..closes.len())
            .map(|t| match t.checked_sub(self.period).map(|s| closes[s]) {
                Some(base) if base > 0.0 => closes[t] / base - 1.0,
                _ => f64::NAN,
            })
            .collect()
    }
}
