//! Execution friction in basis points: directional slippage on the fill
//! price and a per-side commission on fill notional.

use serde::{Deserialize, Serialize};

const BPS: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// +1 for buys (pay up), -1 for sells (give up).
    fn sign(self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostModel {
    #[serde(default)]
    pub slippage_bps: f64,
    /// Charged on each side of a round trip.
    #[serde(default)]
    pub commission_bps: f64,
}

impl CostModel {
    pub fn new(slippage_bps: f64, commission_bps: f64) -> Self {
        Self {
            slippage_bps,
            commission_bps,
        }
    }

    pub fn frictionless() -> Self {
        Self::default()
    }

    /// Close adjusted against the trader by the slippage.
    pub fn fill_price(&self, close: f64, side: OrderSide) -> f64 {
        close * (1.0 + side.sign() * self.slippage_bps / BPS)
    }

    pub fn commission(&self, fill_price: f64, quantity: f64) -> f64 {
        fill_price * quantity * self.commission_bps / BPS
    }

    /// Cash debited per share bought at `fill_price`, commission included.
    pub fn all_in_buy_price(&self, fill_price: f64) -> f64 {
        fill_price + self.commission(fill_price, 1.0)
    }
}
