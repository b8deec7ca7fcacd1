//! Close-price indicators behind the shipped signal generators.
//!
//! Output has the input's length. Positions before `warmup()` are NaN, and
//! the value at `t` only reads closes up to and including `t`.

pub mod roc;
pub mod sma;

pub use roc::Roc;
pub use sma::Sma;

pub trait Indicator: Send + Sync {
    /// Leading NaN count in the output.
    fn warmup(&self) -> usize;

    fn compute(&self, closes: &[f64]) -> Vec<f64>;
}
