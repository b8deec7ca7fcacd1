//! Metric registry: named score selectors over [`PerformanceMetrics`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::metrics::PerformanceMetrics;

/// Which metric the optimizer maximizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMetric {
    #[default]
    SharpeRatio,
    TotalReturn,
    MaxDrawdown,
    WinRate,
    ProfitFactor,
    SortinoRatio,
    Cagr,
    CalmarRatio,
}

impl ScoreMetric {
    pub const ALL: [ScoreMetric; 8] = [
        Self::SharpeRatio,
        Self::TotalReturn,
        Self::MaxDrawdown,
        Self::WinRate,
        Self::ProfitFactor,
        Self::SortinoRatio,
        Self::Cagr,
        Self::CalmarRatio,
    ];

    /// Registry name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SharpeRatio => "sharpe_ratio",
            Self::TotalReturn => "total_return",
            Self::MaxDrawdown => "max_drawdown",
            Self::WinRate => "win_rate",
            Self::ProfitFactor => "profit_factor",
            Self::SortinoRatio => "sortino_ratio",
            Self::Cagr => "cagr",
            Self::CalmarRatio => "calmar_ratio",
        }
    }

    /// Extract the score from a metrics record.
    ///
    /// Higher is always better: max drawdown is ≤ 0, so a shallower
    /// drawdown scores higher.
    pub fn extract(&self, metrics: &PerformanceMetrics) -> f64 {
        match self {
            Self::SharpeRatio => metrics.sharpe_ratio,
            Self::TotalReturn => metrics.total_return,
            Self::MaxDrawdown => metrics.max_drawdown,
            Self::WinRate => metrics.win_rate,
            Self::ProfitFactor => metrics.profit_factor,
            Self::SortinoRatio => metrics.sortino_ratio,
            Self::Cagr => metrics.cagr,
            Self::CalmarRatio => metrics.calmar_ratio,
        }
    }

    /// Returns true if `a` is strictly better than `b`.
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        a > b
    }
}

impl fmt::Display for ScoreMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScoreMetric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| ConfigError::UnknownMetric(s.to_string()))
    }
}
