//! Bar loop: turns a price series and a per-bar signal series into trades,
//! an equity curve and a final value.
//!
//! Per bar, in order:
//! 1. Flat + entry signal + cash above the minimum trade value: size, buy, go Long.
//! 2. Long + exit signal: sell everything, close the trade, go Flat.
//! 3. Otherwise nothing changes.
//! 4. Mark equity at the close, whether or not anything happened.
//!
//! A position still open after the last bar is closed at the last close
//! (`forced_exit = true`) and the last equity point is re-marked to the
//! resulting cash. The loop holds no randomness.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::domain::{EquityPoint, PriceSeries, Signal, TradeRecord};
use crate::engine::state::{Ledger, PositionState, SimulatorConfig};
use crate::engine::{OrderSide, SimError};
use crate::sizers::{ExposureSizer, Sizer};

/// Output of one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    pub final_value: f64,
    /// Cash after the end-of-data exit.
    pub cash: f64,
    /// Always 0 after the end-of-data exit.
    pub shares: f64,
    /// Bars on which a position was held at the close.
    pub bars_in_market: usize,
}

/// Simulate with the default exposure sizer from `config.sizing`.
pub fn simulate(
    series: &PriceSeries,
    signals: &[Signal],
    config: &SimulatorConfig,
    warmup_required: usize,
) -> Result<SimulationResult, SimError> {
    let sizer = ExposureSizer::from_config(&config.sizing);
    simulate_with_sizer(series, signals, config, warmup_required, &sizer)
}

/// Simulate with an explicit sizing policy.
pub fn simulate_with_sizer(
    series: &PriceSeries,
    signals: &[Signal],
    config: &SimulatorConfig,
    warmup_required: usize,
    sizer: &dyn Sizer,
) -> Result<SimulationResult, SimError> {
    config.validate()?;

    if series.len() < warmup_required {
        return Err(SimError::InsufficientHistory {
            required: warmup_required,
            available: series.len(),
        });
    }
    if signals.len() != series.len() {
        return Err(SimError::SignalLengthMismatch {
            expected: series.len(),
            actual: signals.len(),
        });
    }
    if let Some(index) = signals.iter().position(|s| !s.is_valid()) {
        return Err(SimError::InvalidTarget {
            index,
            signal: signals[index],
        });
    }

    let bars = series.bars();
    let mut ledger = Ledger::new(config.initial_capital, config.costs);
    let mut trades = Vec::new();
    let mut equity_curve = Vec::with_capacity(bars.len());
    let mut bars_in_market = 0;

    for (i, (bar, signal)) in bars.iter().zip(signals).enumerate() {
        match ledger.state() {
            PositionState::Flat => {
                if let Some(weight) = signal.entry_weight() {
                    if ledger.cash > config.min_trade_value {
                        let fill = config.costs.fill_price(bar.close, OrderSide::Buy);
                        let price = config.costs.all_in_buy_price(fill);
                        let quantity = sizer.size(ledger.cash * weight, price);
                        if quantity > 0.0 {
                            ledger.open_long(i, bar.date, bar.close, quantity);
                            trace!(bar = i, quantity, price = bar.close, "enter long");
                        }
                    }
                }
            }
            PositionState::Long => {
                if signal.is_exit() {
                    if let Some(trade) = ledger.close_long(i, bar.date, bar.close, false) {
                        trace!(bar = i, pnl = trade.pnl, "exit long");
                        trades.push(trade);
                    }
                }
            }
        }

        if ledger.state() == PositionState::Long {
            bars_in_market += 1;
        }
        equity_curve.push(EquityPoint::new(bar.date, ledger.equity(bar.close)));
    }

    let last_index = bars.len() - 1;
    let last = bars[last_index];
    if let Some(trade) = ledger.close_long(last_index, last.date, last.close, true) {
        trace!(bar = last_index, pnl = trade.pnl, "forced exit at end of data");
        trades.push(trade);
        if let Some(point) = equity_curve.last_mut() {
            point.value = ledger.cash;
        }
    }

    let final_value = ledger.equity(last.close);

    Ok(SimulationResult {
        trades,
        equity_curve,
        final_value,
        cash: ledger.cash,
        shares: ledger.shares,
        bars_in_market,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceBar;
    use crate::engine::CostModel;
    use chrono::NaiveDate;

    fn series(closes: &[f64]) -> PriceSeries {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::flat(base + chrono::Duration::days(i as i64), c))
            .collect();
        PriceSeries::new("TEST", bars).unwrap()
    }

    #[test]
    fn all_hold_produces_flat_curve() {
        let s = series(&[10.0, 11.0, 12.0]);
        let signals = vec![Signal::Hold; 3];
        let result = simulate(&s, &signals, &SimulatorConfig::new(1_000.0), 0).unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.equity_curve.len(), 3);
        assert!(result.equity_curve.iter().all(|p| p.value == 1_000.0));
        assert_eq!(result.final_value, 1_000.0);
    }

    #[test]
    fn enter_and_exit_records_trade() {
        let s = series(&[10.0, 12.0, 15.0, 14.0]);
        let signals = vec![Signal::EnterLong, Signal::Hold, Signal::ExitLong, Signal::Hold];
        let result = simulate(&s, &signals, &SimulatorConfig::new(1_000.0), 0).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.quantity, 100.0);
        assert_eq!(trade.entry_price, 10.0);
        assert_eq!(trade.exit_price, 15.0);
        assert_eq!(trade.pnl, 500.0);
        assert!(!trade.forced_exit);

        let values: Vec<f64> = result.equity_curve.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1_000.0, 1_200.0, 1_500.0, 1_500.0]);
        assert_eq!(result.final_value, 1_500.0);
        assert_eq!(result.bars_in_market, 2);
    }

    #[test]
    fn open_position_is_closed_at_last_bar() {
        let s = series(&[10.0, 11.0, 13.0]);
        let signals = vec![Signal::EnterLong, Signal::Hold, Signal::Hold];
        let result = simulate(&s, &signals, &SimulatorConfig::new(1_000.0), 0).unwrap();

        assert_eq!(result.trades.len(), 1);
        assert!(result.trades[0].forced_exit);
        assert_eq!(result.trades[0].exit_bar, 2);
        assert_eq!(result.shares, 0.0);
        assert_eq!(result.final_value, 1_300.0);
        assert_eq!(result.equity_curve.last().unwrap().value, result.final_value);
    }

    #[test]
    fn exit_while_flat_is_ignored() {
        let s = series(&[10.0, 11.0]);
        let signals = vec![Signal::ExitLong, Signal::ExitLong];
        let result = simulate(&s, &signals, &SimulatorConfig::new(1_000.0), 0).unwrap();
        assert!(result.trades.is_empty());
    }

    #[test]
    fn repeated_entry_while_long_is_ignored() {
        let s = series(&[10.0, 20.0, 30.0]);
        let signals = vec![Signal::EnterLong, Signal::EnterLong, Signal::ExitLong];
        let result = simulate(&s, &signals, &SimulatorConfig::new(1_000.0), 0).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].quantity, 100.0);
    }

    #[test]
    fn insufficient_history() {
        let s = series(&[10.0, 11.0]);
        let err = simulate(&s, &[Signal::Hold; 2], &SimulatorConfig::default(), 5).unwrap_err();
        assert_eq!(
            err,
            SimError::InsufficientHistory {
                required: 5,
                available: 2
            }
        );
    }

    #[test]
    fn signal_length_mismatch() {
        let s = series(&[10.0, 11.0, 12.0]);
        let err = simulate(&s, &[Signal::Hold; 2], &SimulatorConfig::default(), 0).unwrap_err();
        assert!(matches!(
            err,
            SimError::SignalLengthMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn out_of_range_target_rejected() {
        let s = series(&[10.0, 11.0]);
        let err = simulate(
            &s,
            &[Signal::Hold, Signal::Target(2.0)],
            &SimulatorConfig::default(),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, SimError::InvalidTarget { index: 1, .. }));
    }

    #[test]
    fn target_weight_scales_entry() {
        let s = series(&[10.0, 10.0, 10.0]);
        let signals = vec![Signal::Target(0.5), Signal::Target(0.5), Signal::Target(0.0)];
        let result = simulate(&s, &signals, &SimulatorConfig::new(1_000.0), 0).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].quantity, 50.0);
        assert_eq!(result.trades[0].exit_bar, 2);
    }

    #[test]
    fn min_trade_value_blocks_entry() {
        let s = series(&[10.0, 11.0]);
        let mut config = SimulatorConfig::new(1_000.0);
        config.min_trade_value = 1_000.0;
        let result = simulate(&s, &[Signal::EnterLong, Signal::ExitLong], &config, 0).unwrap();
        assert!(result.trades.is_empty());
    }

    #[test]
    fn price_above_cash_opens_nothing_with_whole_shares() {
        let s = series(&[2_000.0, 2_100.0]);
        let result = simulate(
            &s,
            &[Signal::EnterLong, Signal::ExitLong],
            &SimulatorConfig::new(1_000.0),
            0,
        )
        .unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.final_value, 1_000.0);
    }

    #[test]
    fn costs_keep_cash_non_negative() {
        let s = series(&[10.0, 10.0]);
        let config =
            SimulatorConfig::new(1_000.0).with_costs(CostModel::new(10.0, 10.0));
        let result = simulate(&s, &[Signal::EnterLong, Signal::Hold], &config, 0).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert!(result.trades[0].pnl < 0.0);
        assert!(result.cash > 0.0 && result.cash < 1_000.0);
    }
}
