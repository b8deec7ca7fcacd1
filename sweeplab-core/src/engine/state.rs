//! Simulator configuration and mutable per-run state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::TradeRecord;
use crate::engine::cost_model::{CostModel, OrderSide};
use crate::engine::SimError;
use crate::sizers::SizingConfig;

/// Configuration for a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub initial_capital: f64,
    /// Entries are only attempted while cash exceeds this amount.
    #[serde(default)]
    pub min_trade_value: f64,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub costs: CostModel,
}

impl SimulatorConfig {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            min_trade_value: 0.0,
            sizing: SizingConfig::default(),
            costs: CostModel::frictionless(),
        }
    }

    pub fn with_sizing(mut self, sizing: SizingConfig) -> Self {
        self.sizing = sizing;
        self
    }

    pub fn with_costs(mut self, costs: CostModel) -> Self {
        self.costs = costs;
        self
    }

    pub fn with_min_trade_value(mut self, min_trade_value: f64) -> Self {
        self.min_trade_value = min_trade_value;
        self
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "initial_capital must be positive, got {}",
                self.initial_capital
            )));
        }
        let exposure = self.sizing.exposure_fraction;
        if !(exposure > 0.0 && exposure <= 1.0) {
            return Err(SimError::InvalidConfig(format!(
                "exposure_fraction must be in (0, 1], got {exposure}"
            )));
        }
        if self.min_trade_value < 0.0 || !self.min_trade_value.is_finite() {
            return Err(SimError::InvalidConfig(format!(
                "min_trade_value must be non-negative, got {}",
                self.min_trade_value
            )));
        }
        if self.costs.slippage_bps < 0.0 || self.costs.commission_bps < 0.0 {
            return Err(SimError::InvalidConfig(
                "slippage_bps and commission_bps must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::new(100_000.0)
    }
}

/// Position state of the long-only machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    Flat,
    Long,
}

#[derive(Debug, Clone)]
struct OpenTrade {
    entry_bar: usize,
    entry_date: NaiveDate,
    entry_price: f64,
    quantity: f64,
    entry_commission: f64,
}

/// Cash, shares and the open trade, mutated bar by bar.
#[derive(Debug, Clone)]
pub struct Ledger {
    pub cash: f64,
    pub shares: f64,
    open: Option<OpenTrade>,
    costs: CostModel,
}

impl Ledger {
    pub fn new(initial_capital: f64, costs: CostModel) -> Self {
        Self {
            cash: initial_capital,
            shares: 0.0,
            open: None,
            costs,
        }
    }

    pub fn state(&self) -> PositionState {
        if self.open.is_some() {
            PositionState::Long
        } else {
            PositionState::Flat
        }
    }

    /// Mark-to-market value at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.shares * price
    }

    /// Buy `quantity` at `raw_price` (before slippage) and open a trade.
    pub fn open_long(&mut self, bar: usize, date: NaiveDate, raw_price: f64, quantity: f64) {
        let fill = self.costs.fill_price(raw_price, OrderSide::Buy);
        let commission = self.costs.commission(fill, quantity);
        self.cash -= quantity * fill + commission;
        self.shares = quantity;
        self.open = Some(OpenTrade {
            entry_bar: bar,
            entry_date: date,
            entry_price: fill,
            quantity,
            entry_commission: commission,
        });
    }

    /// Sell the whole position at `raw_price` and return the closed trade.
    ///
    /// Returns None when flat.
    pub fn close_long(
        &mut self,
        bar: usize,
        date: NaiveDate,
        raw_price: f64,
        forced_exit: bool,
    ) -> Option<TradeRecord> {
        let open = self.open.take()?;
        let fill = self.costs.fill_price(raw_price, OrderSide::Sell);
        let exit_commission = self.costs.commission(fill, open.quantity);
        let proceeds = open.quantity * fill - exit_commission;
        let entry_cost = open.quantity * open.entry_price + open.entry_commission;
        self.cash += proceeds;
        self.shares = 0.0;

        Some(TradeRecord {
            entry_bar: open.entry_bar,
            entry_date: open.entry_date,
            entry_price: open.entry_price,
            exit_bar: bar,
            exit_date: date,
            exit_price: fill,
            quantity: open.quantity,
            commission: open.entry_commission + exit_commission,
            pnl: proceeds - entry_cost,
            bars_held: bar - open.entry_bar,
            forced_exit,
        })
    }
}
