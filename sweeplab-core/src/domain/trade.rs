//! Completed long round trips.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One closed long position, from entry fill to exit fill.
///
/// Prices are raw closes; `commission` and slippage are already folded into
/// `pnl`, which is the change in cash across the round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_bar: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub quantity: f64,
    /// Entry plus exit commission.
    pub commission: f64,
    pub pnl: f64,
    pub bars_held: usize,
    /// Closed by end of data, not by a signal.
    pub forced_exit: bool,
}

impl TradeRecord {
    /// Entry value at the raw entry price.
    pub fn notional(&self) -> f64 {
        self.entry_price * self.quantity
    }

    /// `pnl` as a fraction of entry notional; 0.0 for an empty position.
    pub fn return_pct(&self) -> f64 {
        let notional = self.notional();
        if notional == 0.0 {
            0.0
        } else {
            self.pnl / notional
        }
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
