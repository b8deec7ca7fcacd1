//! Backtest simulator: long-only bar loop and supporting infrastructure.
//!
//! The simulator consumes a validated [`PriceSeries`](crate::domain::PriceSeries)
//! and one [`Signal`](crate::domain::Signal) per bar, and produces trades, an
//! equity curve (one point per bar) and a final value.

pub mod cost_model;
pub mod simulator;
pub mod state;

pub use cost_model::{CostModel, OrderSide};
pub use simulator::{simulate, simulate_with_sizer, SimulationResult};
pub use state::{Ledger, PositionState, SimulatorConfig};

use thiserror::Error;

use crate::domain::Signal;

/// Errors that stop a single simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("insufficient history: {required} bars required, {available} available")]
    InsufficientHistory { required: usize, available: usize },

    #[error("signal length {actual} does not match price series length {expected}")]
    SignalLengthMismatch { expected: usize, actual: usize },

    #[error("invalid signal {signal:?} at bar {index}")]
    InvalidTarget { index: usize, signal: Signal },

    #[error("invalid simulator config: {0}")]
    InvalidConfig(String),
}

impl SimError {
    /// True for errors caused by a malformed signal sequence.
    pub fn is_invalid_signal(&self) -> bool {
        matches!(
            self,
            Self::SignalLengthMismatch { .. } | Self::InvalidTarget { .. }
        )
    }
}
