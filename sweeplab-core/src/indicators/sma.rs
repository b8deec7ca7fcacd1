//! Trailing arithmetic mean of closes.

use super::Indicator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sma {
    period: usize,
}

impl Sma {
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

impl Indicator for Sma {
    fn warmup(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, closes: &[f64]) -> Vec<f64> {
        let width = self.period as f64;
        let mut out = Vec::with_capacity(closes.len());
        let mut running = 0.0;
        for (t, &close) in closes.iter().enumerate() {
            running += close;
            if t >= self.period {
                running -= closes[t - self.period];
            }
            out.push(if t + 1 >= self.period {
                running / width
            } else {
                f64::NAN
            });
        }
        out
    }
}
