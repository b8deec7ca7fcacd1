//! Performance metrics: pure functions over an equity curve and trade list.
//!
//! All ratios use a zero risk-free rate and 252 periods per year. Degenerate
//! inputs (too few points, zero variance, no trades) yield 0.0 rather than
//! NaN so a metric is only non-finite when the inputs themselves are.

use serde::{Deserialize, Serialize};
use sweeplab_core::domain::TradeRecord;

/// Periods per year used for annualization.
pub const PERIODS_PER_YEAR: f64 = 252.0;

/// Upper bound reported for profit factor.
pub const PROFIT_FACTOR_CAP: f64 = 100.0;

/// Metrics for one backtest. Field names double as registry names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub cagr: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub avg_trade_return: f64,
    /// Fraction of bars with an open position.
    pub exposure: f64,
    pub trade_count: usize,
}

impl PerformanceMetrics {
    /// Compute every metric.
    ///
    /// `equity` holds one value per bar; `bars_in_market` counts bars closed
    /// while long.
    pub fn compute(
        equity: &[f64],
        trades: &[TradeRecord],
        initial_capital: f64,
        final_value: f64,
        bars_in_market: usize,
    ) -> Self {
        let periods = equity.len();
        let max_dd = max_drawdown(equity);
        let growth = cagr(initial_capital, final_value, periods);
        Self {
            total_return: total_return(initial_capital, final_value),
            sharpe_ratio: sharpe_ratio(equity),
            max_drawdown: max_dd,
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            cagr: growth,
            sortino_ratio: sortino_ratio(equity),
            calmar_ratio: calmar(growth, max_dd),
            avg_trade_return: avg_trade_return(trades),
            exposure: if periods == 0 {
                0.0
            } else {
                bars_in_market as f64 / periods as f64
            },
            trade_count: trades.len(),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// `final / initial - 1`.
pub fn total_return(initial_capital: f64, final_value: f64) -> f64 {
    if initial_capital <= 0.0 {
        return 0.0;
    }
    final_value / initial_capital - 1.0
}

/// Compound annual growth over `periods` bars.
pub fn cagr(initial_capital: f64, final_value: f64, periods: usize) -> f64 {
    if periods < 2 || initial_capital <= 0.0 || final_value <= 0.0 {
        return 0.0;
    }
    let years = periods as f64 / PERIODS_PER_YEAR;
    (final_value / initial_capital).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe ratio: mean / sample stdev of period returns × √252.
///
/// 0.0 with fewer than two returns or zero variance.
pub fn sharpe_ratio(equity: &[f64]) -> f64 {
    let returns = period_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let sd = sample_std(&returns);
    if sd < 1e-15 {
        return 0.0;
    }
    mean(&returns) / sd * PERIODS_PER_YEAR.sqrt()
}

/// Annualized Sortino ratio: mean / downside deviation × √252.
///
/// Downside deviation is the root mean square of negative returns over all
/// periods. 0.0 when there is no downside.
pub fn sortino_ratio(equity: &[f64]) -> f64 {
    let returns = period_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let downside: f64 = returns.iter().filter(|r| **r < 0.0).map(|r| r * r).sum();
    let dd = (downside / returns.len() as f64).sqrt();
    if dd < 1e-15 {
        return 0.0;
    }
    mean(&returns) / dd * PERIODS_PER_YEAR.sqrt()
}

/// Deepest peak-to-trough decline, as a fraction ≤ 0.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for &value in equity {
        peak = peak.max(value);
        if peak > 0.0 {
            worst = worst.min((value - peak) / peak);
        }
    }
    worst
}

/// CAGR over |max drawdown|; 0.0 without a drawdown or without growth.
pub fn calmar(cagr: f64, max_drawdown: f64) -> f64 {
    if max_drawdown >= 0.0 || cagr <= 0.0 {
        return 0.0;
    }
    cagr / max_drawdown.abs()
}

/// Winning trades / all trades.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Gross profit / gross loss, capped at [`PROFIT_FACTOR_CAP`].
///
/// 0.0 with no trades or no profit; the cap when there are profits but no losses.
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    let (profit, loss) = trades.iter().fold((0.0, 0.0), |(p, l), t| {
        if t.pnl > 0.0 {
            (p + t.pnl, l)
        } else {
            (p, l - t.pnl.min(0.0))
        }
    });
    if loss < 1e-10 {
        return if profit > 0.0 { PROFIT_FACTOR_CAP } else { 0.0 };
    }
    (profit / loss).min(PROFIT_FACTOR_CAP)
}

/// Mean per-trade return as a fraction of entry notional.
pub fn avg_trade_return(trades: &[TradeRecord]) -> f64 {
    let returns: Vec<f64> = trades.iter().map(TradeRecord::return_pct).collect();
    mean(&returns)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive equity points.
pub fn period_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}
