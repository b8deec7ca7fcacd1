//! Strategy contract: the only interface the optimizer consumes from
//! strategy-specific code.
//!
//! A [`Strategy`] is a black box: given a price series it produces trades,
//! an equity curve and a final value. A [`StrategyFactory`] builds one per
//! parameter combination. [`SignalStrategy`] is the stock implementation:
//! a [`SignalGenerator`] feeding the simulator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{EquityPoint, PriceSeries, TradeRecord};
use crate::engine::{simulate, SimError, SimulatorConfig};
use crate::params::ParameterSet;
use crate::signals::{create_signal, known_signals, SignalGenerator};

// ─── Error type ──────────────────────────────────────────────────────

/// Errors raised while building or running a strategy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error(transparent)]
    Simulation(#[from] SimError),

    /// The strategy produced output that breaks the signal contract.
    #[error("signal contract violated: {0}")]
    SignalContract(String),

    #[error("strategy failed: {0}")]
    Failed(String),
}

impl StrategyError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

// ─── Outcome ─────────────────────────────────────────────────────────

/// What a backtest hands back to the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutcome {
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    pub final_value: f64,
    pub bars_in_market: usize,
}

// ─── Traits ──────────────────────────────────────────────────────────

/// A fully-parameterized strategy ready to run against a series.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Bars required before the strategy can act.
    fn warmup_bars(&self) -> usize;

    fn backtest(&self, series: &PriceSeries) -> Result<BacktestOutcome, StrategyError>;
}

/// Builds a [`Strategy`] for one parameter combination.
pub trait StrategyFactory: Send + Sync {
    fn build(
        &self,
        params: &ParameterSet,
        symbol: &str,
        initial_capital: f64,
    ) -> Result<Box<dyn Strategy>, StrategyError>;
}

impl<F> StrategyFactory for F
where
    F: Fn(&ParameterSet, &str, f64) -> Result<Box<dyn Strategy>, StrategyError> + Send + Sync,
{
    fn build(
        &self,
        params: &ParameterSet,
        symbol: &str,
        initial_capital: f64,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        self(params, symbol, initial_capital)
    }
}

// ─── SignalStrategy ──────────────────────────────────────────────────

/// A signal generator run through the simulator.
pub struct SignalStrategy {
    generator: Box<dyn SignalGenerator>,
    config: SimulatorConfig,
}

impl SignalStrategy {
    pub fn new(generator: Box<dyn SignalGenerator>, config: SimulatorConfig) -> Self {
        Self { generator, config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }
}

impl Strategy for SignalStrategy {
    fn name(&self) -> &str {
        self.generator.name()
    }

    fn warmup_bars(&self) -> usize {
        self.generator.warmup_bars()
    }

    fn backtest(&self, series: &PriceSeries) -> Result<BacktestOutcome, StrategyError> {
        let warmup = self.generator.warmup_bars();
        if series.len() < warmup {
            return Err(SimError::InsufficientHistory {
                required: warmup,
                available: series.len(),
            }
            .into());
        }

        let signals = self.generator.generate(series)?;
        if signals.len() != series.len() {
            return Err(StrategyError::SignalContract(format!(
                "{} produced {} signals for {} bars",
                self.generator.name(),
                signals.len(),
                series.len()
            )));
        }

        let result = simulate(series, &signals, &self.config, warmup)?;
        Ok(BacktestOutcome {
            trades: result.trades,
            equity_curve: result.equity_curve,
            final_value: result.final_value,
            bars_in_market: result.bars_in_market,
        })
    }
}

/// Builds [`SignalStrategy`] instances for one of the shipped generators.
#[derive(Debug, Clone)]
pub struct SignalStrategyFactory {
    signal: String,
    base_config: SimulatorConfig,
}

impl SignalStrategyFactory {
    /// Fails if `signal` is not a known generator name.
    pub fn new(signal: impl Into<String>, base_config: SimulatorConfig) -> Result<Self, StrategyError> {
        let signal = signal.into();
        if !known_signals().contains(&signal.as_str()) {
            return Err(StrategyError::UnknownStrategy(signal));
        }
        Ok(Self {
            signal,
            base_config,
        })
    }

    pub fn signal(&self) -> &str {
        &self.signal
    }
}

impl StrategyFactory for SignalStrategyFactory {
    fn build(
        &self,
        params: &ParameterSet,
        _symbol: &str,
        initial_capital: f64,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        let generator = create_signal(&self.signal, params)?;
        let mut config = self.base_config.clone();
        config.initial_capital = initial_capital;
        Ok(Box::new(SignalStrategy::new(generator, config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PriceBar, Signal};
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

    struct ShortOutput;

    impl SignalGenerator for ShortOutput {
        fn name(&self) -> &str {
            "short_output"
        }
        fn warmup_bars(&self) -> usize {
            0
        }
        fn generate(&self, _series: &PriceSeries) -> Result<Vec<Signal>, StrategyError> {
            Ok(vec![Signal::Hold])
        }
    }

    #[test]
    fn factory_rejects_unknown_signal() {
        let err = SignalStrategyFactory::new("nope", SimulatorConfig::default()).unwrap_err();
        assert_eq!(err, StrategyError::UnknownStrategy("nope".into()));
    }

    #[test]
    fn factory_applies_initial_capital() {
        let factory = SignalStrategyFactory::new("momentum", SimulatorConfig::default()).unwrap();
        let params = ParameterSet::new().with("lookback", 2);
        let strategy = factory.build(&params, "TEST", 5_000.0).unwrap();
        let outcome = strategy.backtest(&series(&[10.0; 5])).unwrap();
        assert_eq!(outcome.final_value, 5_000.0);
        assert_eq!(outcome.equity_curve.len(), 5);
    }

    #[test]
    fn warmup_beyond_series_is_insufficient_history() {
        let factory = SignalStrategyFactory::new("momentum", SimulatorConfig::default()).unwrap();
        let params = ParameterSet::new().with("lookback", 20);
        let strategy = factory.build(&params, "TEST", 1_000.0).unwrap();
        let err = strategy.backtest(&series(&[10.0; 15])).unwrap_err();
        assert!(matches!(
            err,
            StrategyError::Simulation(SimError::InsufficientHistory { required: 21, available: 15 })
        ));
    }

    #[test]
    fn wrong_signal_count_is_contract_violation() {
        let strategy = SignalStrategy::new(Box::new(ShortOutput), SimulatorConfig::default());
        let err = strategy.backtest(&series(&[10.0, 11.0])).unwrap_err();
        assert!(matches!(err, StrategyError::SignalContract(_)));
    }

    #[test]
    fn closure_is_a_factory() {
        let factory = |params: &ParameterSet,
                       _symbol: &str,
                       capital: f64|
         -> Result<Box<dyn Strategy>, StrategyError> {
            let generator = create_signal("momentum", params)?;
            Ok(Box::new(SignalStrategy::new(
                generator,
                SimulatorConfig::new(capital),
            )))
        };
        let strategy = factory
            .build(&ParameterSet::new().with("lookback", 3), "TEST", 1_000.0)
            .unwrap();
        assert_eq!(strategy.name(), "momentum");
        assert_eq!(strategy.warmup_bars(), 4);
    }
}
