//! Build signal generators by name from a [`ParameterSet`].
//!
//! Missing parameters fall back to defaults; present parameters of the wrong
//! type are rejected.

use super::{MaCrossover, Momentum, SignalGenerator};
use crate::params::ParameterSet;
use crate::strategy::StrategyError;

/// Names accepted by [`create_signal`].
pub fn known_signals() -> &'static [&'static str] {
    &["ma_crossover", "momentum"]
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn param_usize(params: &ParameterSet, name: &str, default: usize) -> Result<usize, StrategyError> {
    match params.get(name) {
        None => Ok(default),
        Some(value) => params
            .get_usize(name)
            .ok_or_else(|| StrategyError::invalid(name, format!("expected a non-negative integer, got {value}"))),
    }
}

fn param_f64(params: &ParameterSet, name: &str, default: f64) -> Result<f64, StrategyError> {
    match params.get(name) {
        None => Ok(default),
        Some(value) => params
            .get_float(name)
            .ok_or_else(|| StrategyError::invalid(name, format!("expected a number, got {value}"))),
    }
}

// ─── Signal factory ──────────────────────────────────────────────────

/// Create a signal generator by name.
pub fn create_signal(
    name: &str,
    params: &ParameterSet,
) -> Result<Box<dyn SignalGenerator>, StrategyError> {
    match name {
        "ma_crossover" => {
            let fast = param_usize(params, "fast_period", 10)?;
            let slow = param_usize(params, "slow_period", 50)?;
            Ok(Box::new(MaCrossover::new(fast, slow)?))
        }
        "momentum" => {
            let lookback = param_usize(params, "lookback", 20)?;
            let threshold = param_f64(params, "threshold", 0.0)?;
            Ok(Box::new(Momentum::new(lookback, threshold)?))
        }
        other => Err(StrategyError::UnknownStrategy(other.to_string())),
    }
}
