//! Evaluator: one parameter combination in, one classified result out.
//!
//! Builds a strategy from the factory, backtests it on the shared dataset,
//! computes metrics and extracts the score. Every error and every panic is
//! caught here and turned into a [`FailureCategory`]; nothing unwinds into
//! the optimizer loop.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sweeplab_core::domain::{equity::equity_values, PriceSeries};
use sweeplab_core::engine::SimError;
use sweeplab_core::strategy::{BacktestOutcome, StrategyError, StrategyFactory};
use sweeplab_core::ParameterSet;
use tracing::debug;

use crate::metric::ScoreMetric;
use crate::metrics::PerformanceMetrics;

/// Default pruning threshold on trade count.
pub const DEFAULT_MIN_TRADES: usize = 2;

/// Longest failure reason kept, in characters.
pub const MAX_REASON_CHARS: usize = 200;

// ─── Failure taxonomy ────────────────────────────────────────────────

/// Why a combination produced no usable score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    InsufficientHistory,
    DataContract,
    InvalidScore,
    StrategyException,
    Timeout,
    TooFewTrades,
}

impl FailureCategory {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InsufficientHistory => "insufficient_history",
            Self::DataContract => "data_contract",
            Self::InvalidScore => "invalid_score",
            Self::StrategyException => "strategy_exception",
            Self::Timeout => "timeout",
            Self::TooFewTrades => "too_few_trades",
        }
    }

    /// Map a strategy error onto the taxonomy.
    pub fn classify(err: &StrategyError) -> Self {
        match err {
            StrategyError::Simulation(SimError::InsufficientHistory { .. }) => {
                Self::InsufficientHistory
            }
            StrategyError::Simulation(e) if e.is_invalid_signal() => Self::DataContract,
            StrategyError::SignalContract(_) => Self::DataContract,
            _ => Self::StrategyException,
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Result ──────────────────────────────────────────────────────────

/// Outcome of evaluating one combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub params: ParameterSet,
    /// Finite on success; −∞ for `TooFewTrades`; None for other failures.
    pub score: Option<f64>,
    pub metrics: Option<PerformanceMetrics>,
    pub failure: Option<FailureCategory>,
    pub reason: Option<String>,
}

impl EvaluationResult {
    pub fn success(params: ParameterSet, score: f64, metrics: PerformanceMetrics) -> Self {
        Self {
            params,
            score: Some(score),
            metrics: Some(metrics),
            failure: None,
            reason: None,
        }
    }

    pub fn failure(params: ParameterSet, category: FailureCategory, reason: &str) -> Self {
        Self {
            params,
            score: None,
            metrics: None,
            failure: Some(category),
            reason: Some(truncate_reason(reason)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Cut `reason` to at most [`MAX_REASON_CHARS`] characters.
pub fn truncate_reason(reason: &str) -> String {
    if reason.chars().count() <= MAX_REASON_CHARS {
        return reason.to_string();
    }
    let mut out: String = reason.chars().take(MAX_REASON_CHARS - 3).collect();
    out.push_str("...");
    out
}

// ─── Evaluator ───────────────────────────────────────────────────────

/// Settings fixed for every evaluation in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorConfig {
    pub symbol: String,
    pub initial_capital: f64,
    pub min_trades: usize,
    /// Per-combination wall-clock limit.
    pub timeout: Option<Duration>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            symbol: "SPY".into(),
            initial_capital: 100_000.0,
            min_trades: DEFAULT_MIN_TRADES,
            timeout: None,
        }
    }
}

type Guarded = thread::Result<Result<BacktestOutcome, StrategyError>>;

/// Scores parameter combinations against a dataset.
pub struct Evaluator {
    factory: Arc<dyn StrategyFactory>,
    metric: ScoreMetric,
    config: EvaluatorConfig,
}

impl Evaluator {
    pub fn new(factory: Arc<dyn StrategyFactory>, metric: ScoreMetric, config: EvaluatorConfig) -> Self {
        Self {
            factory,
            metric,
            config,
        }
    }

    pub fn metric(&self) -> ScoreMetric {
        self.metric
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluate one combination. Never panics, never returns an error.
    pub fn evaluate(&self, params: &ParameterSet, dataset: &Arc<PriceSeries>) -> EvaluationResult {
        let guarded = match self.config.timeout {
            None => catch_unwind(AssertUnwindSafe(|| {
                run_backtest(self.factory.as_ref(), params, &self.config, dataset)
            })),
            Some(limit) => match self.run_with_timeout(params, dataset, limit) {
                Ok(guarded) => guarded,
                Err(result) => return result,
            },
        };
        let result = self.finish(params, guarded);
        if let (Some(category), Some(reason)) = (result.failure, result.reason.as_deref()) {
            debug!(params = %params, %category, reason, "combination failed");
        }
        result
    }

    /// Run on a worker thread; give up after `limit`. A late result is discarded.
    fn run_with_timeout(
        &self,
        params: &ParameterSet,
        dataset: &Arc<PriceSeries>,
        limit: Duration,
    ) -> Result<Guarded, EvaluationResult> {
        let (tx, rx) = mpsc::channel();
        let factory = Arc::clone(&self.factory);
        let dataset = Arc::clone(dataset);
        let config = self.config.clone();
        let owned = params.clone();

        let spawned = thread::Builder::new()
            .name("sweeplab-eval".into())
            .spawn(move || {
                let guarded = catch_unwind(AssertUnwindSafe(|| {
                    run_backtest(factory.as_ref(), &owned, &config, &dataset)
                }));
                // The receiver is gone after a timeout; nothing to report.
                let _ = tx.send(guarded);
            });
        if let Err(e) = spawned {
            return Err(EvaluationResult::failure(
                params.clone(),
                FailureCategory::StrategyException,
                &format!("failed to spawn evaluation thread: {e}"),
            ));
        }

        match rx.recv_timeout(limit) {
            Ok(guarded) => Ok(guarded),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(EvaluationResult::failure(
                params.clone(),
                FailureCategory::Timeout,
                &format!("evaluation exceeded {} ms", limit.as_millis()),
            )),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(EvaluationResult::failure(
                params.clone(),
                FailureCategory::StrategyException,
                "evaluation thread exited without a result",
            )),
        }
    }

    fn finish(&self, params: &ParameterSet, guarded: Guarded) -> EvaluationResult {
        let outcome = match guarded {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                return EvaluationResult::failure(
                    params.clone(),
                    FailureCategory::classify(&err),
                    &err.to_string(),
                )
            }
            Err(payload) => {
                return EvaluationResult::failure(
                    params.clone(),
                    FailureCategory::StrategyException,
                    &format!("panic: {}", panic_message(payload.as_ref())),
                )
            }
        };

        let metrics = PerformanceMetrics::compute(
            &equity_values(&outcome.equity_curve),
            &outcome.trades,
            self.config.initial_capital,
            outcome.final_value,
            outcome.bars_in_market,
        );

        if metrics.trade_count < self.config.min_trades {
            let reason = format!(
                "{} trades, minimum is {}",
                metrics.trade_count, self.config.min_trades
            );
            return EvaluationResult {
                params: params.clone(),
                score: Some(f64::NEG_INFINITY),
                metrics: Some(metrics),
                failure: Some(FailureCategory::TooFewTrades),
                reason: Some(reason),
            };
        }

        let score = self.metric.extract(&metrics);
        if !score.is_finite() {
            let reason = format!("{} is {score}", self.metric);
            return EvaluationResult {
                params: params.clone(),
                score: None,
                metrics: Some(metrics),
                failure: Some(FailureCategory::InvalidScore),
                reason: Some(reason),
            };
        }

        EvaluationResult::success(params.clone(), score, metrics)
    }
}

fn run_backtest(
    factory: &dyn StrategyFactory,
    params: &ParameterSet,
    config: &EvaluatorConfig,
    dataset: &PriceSeries,
) -> Result<BacktestOutcome, StrategyError> {
    let strategy = factory.build(params, &config.symbol, config.initial_capital)?;
    strategy.backtest(dataset)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
