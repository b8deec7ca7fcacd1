//! Per-bar trading decision consumed by the simulator.

use serde::{Deserialize, Serialize};

/// One decision per bar.
///
/// The discrete variants drive the Flat/Long state machine directly.
/// `Target(w)` is a continuous weight in `[-1, 1]`: while flat, `w > 0`
/// enters long with exposure scaled by `w`; while long, `w <= 0` exits.
/// The simulator is long-only, so negative weights only ever mean "be flat".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    #[default]
    Hold,
    EnterLong,
    ExitLong,
    Target(f64),
}

impl Signal {
    /// Whether this signal is well-formed (targets finite and within `[-1, 1]`).
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Target(w) => w.is_finite() && (-1.0..=1.0).contains(w),
            _ => true,
        }
    }

    /// Exposure scale for an entry, or None if this signal does not enter.
    pub fn entry_weight(&self) -> Option<f64> {
        match *self {
            Self::EnterLong => Some(1.0),
            Self::Target(w) if w > 0.0 => Some(w),
            _ => None,
        }
    }

    /// Whether this signal closes an open long position.
    pub fn is_exit(&self) -> bool {
        match *self {
            Self::ExitLong => true,
            Self::Target(w) => w <= 0.0,
            _ => false,
        }
    }
}
