//! Optimizer coordinator: fetch once, enumerate, evaluate, accumulate.
//!
//! The run loop:
//! 1. Fetch the dataset exactly once. A fetch failure ends the run with
//!    `success = false` and zero combinations tested.
//! 2. Build the enumerator for the configured mode.
//! 3. Walk combinations in enumeration order. Constraint rejections and
//!    random-mode duplicates are `skipped`; everything else goes through the
//!    [`Evaluator`] and lands in the accumulator.
//! 4. Rank valid results and assemble the [`OptimizationResult`].
//!
//! With `threads > 1` combinations are evaluated in chunks on a dedicated
//! rayon pool and merged back in enumeration order, so the result is
//! identical to a sequential run.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sweeplab_core::data::DatasetProvider;
use sweeplab_core::domain::PriceSeries;
use sweeplab_core::strategy::StrategyFactory;
use sweeplab_core::ParameterSet;
use tracing::{debug, info, warn};

use crate::config::ConfigError;
use crate::enumerator::{Enumerator, EnumeratorKind};
use crate::evaluator::{
    EvaluationResult, Evaluator, EvaluatorConfig, FailureCategory, DEFAULT_MIN_TRADES,
};
use crate::metric::ScoreMetric;
use crate::metrics::PerformanceMetrics;
use crate::space::{Constraint, ParamSpace};

/// How many failures are kept verbatim in a result.
pub const MAX_EXAMPLE_FAILURES: usize = 10;

/// How many ranked results are kept in a result.
pub const TOP_RESULTS: usize = 10;

// ─── Configuration ───────────────────────────────────────────────────

/// Which symbol and date window to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRequest {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DatasetRequest {
    pub fn new(symbol: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            start,
            end,
        }
    }
}

/// Search mode and its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SearchMode {
    /// Exhaustive when the grid has at most `cap` points, sampled otherwise.
    Grid { cap: usize },
    /// `n_iterations` independent draws.
    Random { n_iterations: usize },
}

impl Default for SearchMode {
    fn default() -> Self {
        Self::Grid { cap: 500 }
    }
}

/// Everything a run needs besides the space, provider and factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub dataset: DatasetRequest,
    /// Metric registry name.
    pub metric: String,
    pub mode: SearchMode,
    pub seed: u64,
    pub initial_capital: f64,
    pub min_trades: usize,
    /// Per-combination limit.
    pub timeout_ms: Option<u64>,
    /// Whole-run limit; the run stops cooperatively once exceeded.
    pub time_budget_ms: Option<u64>,
    pub threads: usize,
    /// Combinations per parallel batch.
    pub chunk_size: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetRequest {
                symbol: "SPY".into(),
                start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
                end: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or_default(),
            },
            metric: ScoreMetric::default().name().into(),
            mode: SearchMode::default(),
            seed: 42,
            initial_capital: 100_000.0,
            min_trades: DEFAULT_MIN_TRADES,
            timeout_ms: None,
            time_budget_ms: None,
            threads: 1,
            chunk_size: 64,
        }
    }
}

// ─── Result ──────────────────────────────────────────────────────────

/// A failure kept verbatim for inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureExample {
    /// 0-based enumeration index.
    pub index: usize,
    pub params: ParameterSet,
    pub category: FailureCategory,
    pub reason: String,
}

/// One entry of the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// 1-based rank.
    pub rank: usize,
    /// 0-based enumeration index.
    pub index: usize,
    pub params: ParameterSet,
    pub score: f64,
    pub metrics: PerformanceMetrics,
}

/// Outcome of a full optimization run.
///
/// Holds no wall-clock values: identical inputs give identical results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub success: bool,
    /// Empty when `success` is false.
    pub best_params: ParameterSet,
    pub best_score: Option<f64>,
    pub best_metrics: Option<PerformanceMetrics>,

    // ── Counters ──
    pub tested: usize,
    pub valid: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pruned: usize,

    // ── Diagnostics ──
    pub warnings: Vec<String>,
    pub failure_summary: BTreeMap<FailureCategory, usize>,
    pub example_failures: Vec<FailureExample>,
    pub top_results: Vec<RankedResult>,
    pub error: Option<String>,

    // ── Provenance ──
    pub search_kind: Option<EnumeratorKind>,
    pub space_size: Option<u128>,
    pub cancelled: bool,
    pub dataset_hash: Option<String>,
    pub seed: u64,
    pub metric: String,
    pub symbol: String,
}

impl OptimizationResult {
    fn aborted(header: RunHeader, error: String) -> Self {
        Accumulator::new(header.metric).finish(header, Vec::new(), false, Some(error))
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// `"category: count"` pairs, in category order.
    pub fn failure_breakdown(&self) -> String {
        format_breakdown(&self.failure_summary)
    }
}

fn format_breakdown(summary: &BTreeMap<FailureCategory, usize>) -> String {
    summary
        .iter()
        .map(|(category, count)| format!("{category}: {count}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Provenance fields filled in as the run progresses.
#[derive(Debug, Clone)]
struct RunHeader {
    symbol: String,
    metric: ScoreMetric,
    seed: u64,
    search_kind: Option<EnumeratorKind>,
    space_size: Option<u128>,
    dataset_hash: Option<String>,
}

// ─── Accumulator ─────────────────────────────────────────────────────

#[derive(Debug)]
struct Scored {
    index: usize,
    score: f64,
    result: EvaluationResult,
}

/// Folds evaluation results, in enumeration order, into counters.
#[derive(Debug)]
struct Accumulator {
    metric: ScoreMetric,
    tested: usize,
    valid: usize,
    failed: usize,
    skipped: usize,
    pruned: usize,
    failure_summary: BTreeMap<FailureCategory, usize>,
    example_failures: Vec<FailureExample>,
    results: Vec<Scored>,
    best: Option<usize>,
}

impl Accumulator {
    fn new(metric: ScoreMetric) -> Self {
        Self {
            metric,
            tested: 0,
            valid: 0,
            failed: 0,
            skipped: 0,
            pruned: 0,
            failure_summary: BTreeMap::new(),
            example_failures: Vec::new(),
            results: Vec::new(),
            best: None,
        }
    }

    fn record_skip(&mut self) {
        self.tested += 1;
        self.skipped += 1;
    }

    fn record(&mut self, index: usize, result: EvaluationResult) {
        self.tested += 1;
        match (result.failure, result.score) {
            (None, Some(score)) => {
                self.valid += 1;
                let improves = match self.best {
                    None => true,
                    Some(b) => self.metric.is_better(score, self.results[b].score),
                };
                if improves {
                    self.best = Some(self.results.len());
                }
                self.results.push(Scored {
                    index,
                    score,
                    result,
                });
            }
            (failure, _) => {
                let category = failure.unwrap_or(FailureCategory::InvalidScore);
                self.failed += 1;
                *self.failure_summary.entry(category).or_insert(0) += 1;
                if category == FailureCategory::TooFewTrades {
                    self.pruned += 1;
                }
                if self.example_failures.len() < MAX_EXAMPLE_FAILURES {
                    self.example_failures.push(FailureExample {
                        index,
                        params: result.params,
                        category,
                        reason: result.reason.unwrap_or_default(),
                    });
                }
            }
        }
    }

    fn no_valid_message(&self) -> String {
        if self.tested == 0 {
            return "no combinations were evaluated".to_string();
        }
        let breakdown = format_breakdown(&self.failure_summary);
        let mut msg = format!("no valid combinations: {} failed", self.failed);
        if !breakdown.is_empty() {
            msg.push_str(&format!(" ({breakdown})"));
        }
        if self.skipped > 0 {
            msg.push_str(&format!(", {} skipped", self.skipped));
        }
        msg
    }

    fn finish(
        self,
        header: RunHeader,
        warnings: Vec<String>,
        cancelled: bool,
        error: Option<String>,
    ) -> OptimizationResult {
        let success = error.is_none() && self.valid > 0 && self.best.is_some();
        let error = match error {
            Some(e) => Some(e),
            None if !success => Some(self.no_valid_message()),
            None => None,
        };

        let (best_params, best_score, best_metrics) = match self.best.filter(|_| success) {
            Some(b) => {
                let best = &self.results[b];
                (
                    best.result.params.clone(),
                    Some(best.score),
                    best.result.metrics.clone(),
                )
            }
            None => (ParameterSet::new(), None, None),
        };

        let mut ranked: Vec<&Scored> = self.results.iter().collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        let top_results = ranked
            .into_iter()
            .take(TOP_RESULTS)
            .enumerate()
            .filter_map(|(i, s)| {
                s.result.metrics.clone().map(|metrics| RankedResult {
                    rank: i + 1,
                    index: s.index,
                    params: s.result.params.clone(),
                    score: s.score,
                    metrics,
                })
            })
            .collect();

        OptimizationResult {
            success,
            best_params,
            best_score,
            best_metrics,
            tested: self.tested,
            valid: self.valid,
            failed: self.failed,
            skipped: self.skipped,
            pruned: self.pruned,
            warnings,
            failure_summary: self.failure_summary,
            example_failures: self.example_failures,
            top_results,
            error,
            search_kind: header.search_kind,
            space_size: header.space_size,
            cancelled,
            dataset_hash: header.dataset_hash,
            seed: header.seed,
            metric: header.metric.name().to_string(),
            symbol: header.symbol,
        }
    }
}

// ─── Admission ───────────────────────────────────────────────────────

/// Decides whether a combination is evaluated or skipped.
struct Gate<'a> {
    constraints: &'a [Constraint],
    seen: Option<HashSet<ParameterSet>>,
}

impl<'a> Gate<'a> {
    fn new(constraints: &'a [Constraint], dedupe: bool) -> Self {
        Self {
            constraints,
            seen: dedupe.then(HashSet::new),
        }
    }

    fn admit(&mut self, params: &ParameterSet) -> bool {
        if !self.constraints.iter().all(|c| c(params)) {
            return false;
        }
        match &mut self.seen {
            Some(seen) => seen.insert(params.clone()),
            None => true,
        }
    }
}

/// External flag plus optional deadline.
struct StopSignal<'a> {
    cancel: Option<&'a AtomicBool>,
    deadline: Option<Instant>,
}

impl StopSignal<'_> {
    fn should_stop(&self) -> bool {
        self.cancel.is_some_and(|c| c.load(Ordering::Relaxed))
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

// ─── Optimizer ───────────────────────────────────────────────────────

/// Searches a parameter space for the best-scoring combination.
pub struct Optimizer {
    space: ParamSpace,
    config: OptimizerConfig,
    metric: ScoreMetric,
    constraints: Vec<Constraint>,
}

impl Optimizer {
    /// Validate the metric, space and settings. Nothing is fetched here.
    pub fn new(space: impl Into<ParamSpace>, config: OptimizerConfig) -> Result<Self, ConfigError> {
        let space = space.into();
        let metric: ScoreMetric = config.metric.parse()?;
        space.validate()?;

        match (&config.mode, &space) {
            (SearchMode::Grid { .. }, ParamSpace::Ranges(_)) => {
                return Err(ConfigError::InvalidSetting(
                    "grid mode requires a grid space; use random mode for ranges".into(),
                ))
            }
            (SearchMode::Grid { cap: 0 }, _) => {
                return Err(ConfigError::InvalidSetting("cap must be at least 1".into()))
            }
            (SearchMode::Random { n_iterations: 0 }, _) => {
                return Err(ConfigError::InvalidSetting(
                    "n_iterations must be at least 1".into(),
                ))
            }
            _ => {}
        }
        if config.dataset.symbol.trim().is_empty() {
            return Err(ConfigError::InvalidSetting("symbol must not be empty".into()));
        }
        if config.dataset.start > config.dataset.end {
            return Err(ConfigError::InvalidSetting(format!(
                "start {} is after end {}",
                config.dataset.start, config.dataset.end
            )));
        }
        if !(config.initial_capital.is_finite() && config.initial_capital > 0.0) {
            return Err(ConfigError::InvalidSetting(format!(
                "initial_capital must be positive, got {}",
                config.initial_capital
            )));
        }
        if config.threads == 0 || config.chunk_size == 0 {
            return Err(ConfigError::InvalidSetting(
                "threads and chunk_size must be at least 1".into(),
            ));
        }

        Ok(Self {
            space,
            config,
            metric,
            constraints: Vec::new(),
        })
    }

    /// Add a predicate every evaluated combination must satisfy.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn metric(&self) -> ScoreMetric {
        self.metric
    }

    pub fn space(&self) -> &ParamSpace {
        &self.space
    }

    fn build_enumerator(&self) -> Result<Enumerator, ConfigError> {
        match (self.config.mode, &self.space) {
            (SearchMode::Grid { cap }, ParamSpace::Grid(grid)) => {
                Enumerator::for_grid(grid.clone(), cap, self.config.seed)
            }
            (SearchMode::Grid { .. }, ParamSpace::Ranges(_)) => Err(ConfigError::InvalidSetting(
                "grid mode requires a grid space".into(),
            )),
            (SearchMode::Random { n_iterations }, space) => {
                Enumerator::random(space.clone(), n_iterations, self.config.seed)
            }
        }
    }

    /// Run the search. Never fails; problems are reported in the result.
    pub fn run(
        &self,
        provider: &dyn DatasetProvider,
        factory: Arc<dyn StrategyFactory>,
        cancel: Option<&AtomicBool>,
    ) -> OptimizationResult {
        let started = Instant::now();
        let request = &self.config.dataset;
        let mut header = RunHeader {
            symbol: request.symbol.clone(),
            metric: self.metric,
            seed: self.config.seed,
            search_kind: None,
            space_size: None,
            dataset_hash: None,
        };
        info!(
            symbol = %request.symbol,
            start = %request.start,
            end = %request.end,
            metric = %self.metric,
            seed = self.config.seed,
            threads = self.config.threads,
            "optimization started"
        );

        let dataset = match provider.fetch(&request.symbol, request.start, request.end) {
            Ok(series) => Arc::new(series),
            Err(e) => {
                warn!(provider = provider.name(), error = %e, "dataset fetch failed");
                return OptimizationResult::aborted(header, format!("DataFetchError: {e}"));
            }
        };
        let hash = dataset.dataset_hash();
        info!(provider = provider.name(), bars = dataset.len(), hash = %hash, "dataset loaded");
        header.dataset_hash = Some(hash);

        let enumerator = match self.build_enumerator() {
            Ok(e) => e,
            Err(e) => return OptimizationResult::aborted(header, format!("ConfigError: {e}")),
        };
        header.search_kind = Some(enumerator.kind());
        header.space_size = enumerator.space_size();

        let mut warnings = Vec::new();
        if enumerator.kind() == EnumeratorKind::Sampled {
            let total = header
                .space_size
                .map_or_else(|| "more than u128::MAX".to_string(), |t| t.to_string());
            warnings.push(format!(
                "grid has {total} combinations; sampling {}",
                enumerator.planned()
            ));
        }
        info!(
            kind = %enumerator.kind(),
            space_size = ?header.space_size,
            planned = enumerator.planned(),
            "enumerator selected"
        );

        let evaluator = Evaluator::new(
            factory,
            self.metric,
            EvaluatorConfig {
                symbol: request.symbol.clone(),
                initial_capital: self.config.initial_capital,
                min_trades: self.config.min_trades,
                timeout: self.config.timeout_ms.map(Duration::from_millis),
            },
        );
        let dedupe = enumerator.kind() == EnumeratorKind::Random;
        let mut gate = Gate::new(&self.constraints, dedupe);
        let stop = StopSignal {
            cancel,
            deadline: self
                .config
                .time_budget_ms
                .map(|ms| started + Duration::from_millis(ms)),
        };
        let mut acc = Accumulator::new(self.metric);

        let cancelled = if self.config.threads > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.threads)
                .thread_name(|i| format!("sweeplab-worker-{i}"))
                .build()
            {
                Ok(pool) => self.run_parallel(
                    &pool, enumerator, &evaluator, &dataset, &mut gate, &stop, &mut acc,
                ),
                Err(e) => {
                    warn!(error = %e, "thread pool unavailable, running sequentially");
                    warnings.push(format!("thread pool unavailable ({e}); ran sequentially"));
                    run_sequential(enumerator, &evaluator, &dataset, &mut gate, &stop, &mut acc)
                }
            }
        } else {
            run_sequential(enumerator, &evaluator, &dataset, &mut gate, &stop, &mut acc)
        };

        if cancelled {
            warn!(tested = acc.tested, "optimization cancelled");
            warnings.push(format!("cancelled after {} combinations", acc.tested));
        }

        let result = acc.finish(header, warnings, cancelled, None);
        info!(
            tested = result.tested,
            valid = result.valid,
            failed = result.failed,
            skipped = result.skipped,
            pruned = result.pruned,
            best_score = ?result.best_score,
            cancelled = result.cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "optimization finished"
        );
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn run_parallel(
        &self,
        pool: &rayon::ThreadPool,
        enumerator: Enumerator,
        evaluator: &Evaluator,
        dataset: &Arc<PriceSeries>,
        gate: &mut Gate<'_>,
        stop: &StopSignal<'_>,
        acc: &mut Accumulator,
    ) -> bool {
        let mut combos = enumerator.enumerate().peekable();
        let mut chunk_no = 0usize;
        loop {
            if stop.should_stop() {
                return combos.peek().is_some();
            }
            let chunk: Vec<(usize, ParameterSet)> =
                combos.by_ref().take(self.config.chunk_size).collect();
            if chunk.is_empty() {
                return false;
            }

            // Admission stays sequential so dedupe sees enumeration order.
            let admitted: Vec<bool> = chunk.iter().map(|(_, p)| gate.admit(p)).collect();
            let results: Vec<Option<EvaluationResult>> = pool.install(|| {
                chunk
                    .par_iter()
                    .zip(admitted.par_iter())
                    .map(|((_, params), &ok)| ok.then(|| evaluator.evaluate(params, dataset)))
                    .collect()
            });

            for ((index, _), result) in chunk.into_iter().zip(results) {
                match result {
                    Some(r) => acc.record(index, r),
                    None => acc.record_skip(),
                }
            }
            debug!(chunk = chunk_no, tested = acc.tested, "chunk merged");
            chunk_no += 1;
        }
    }
}

fn run_sequential(
    enumerator: Enumerator,
    evaluator: &Evaluator,
    dataset: &Arc<PriceSeries>,
    gate: &mut Gate<'_>,
    stop: &StopSignal<'_>,
    acc: &mut Accumulator,
) -> bool {
    for (index, params) in enumerator.enumerate() {
        if stop.should_stop() {
            return true;
        }
        if !gate.admit(&params) {
            acc.record_skip();
            continue;
        }
        let result = evaluator.evaluate(&params, dataset);
        acc.record(index, result);
    }
    false
}

/// One-call search: grid spaces use `budget` as the sampling cap, range
/// spaces as the iteration count.
pub fn optimize(
    space: impl Into<ParamSpace>,
    provider: &dyn DatasetProvider,
    factory: Arc<dyn StrategyFactory>,
    dataset: DatasetRequest,
    metric: &str,
    budget: usize,
    seed: u64,
) -> Result<OptimizationResult, ConfigError> {
    let space = space.into();
    let mode = match space {
        ParamSpace::Grid(_) => SearchMode::Grid { cap: budget },
        ParamSpace::Ranges(_) => SearchMode::Random {
            n_iterations: budget,
        },
    };
    let config = OptimizerConfig {
        dataset,
        metric: metric.to_string(),
        mode,
        seed,
        ..OptimizerConfig::default()
    };
    Ok(Optimizer::new(space, config)?.run(provider, factory, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::{less_than, ParamGrid, ParamRanges};
    use sweeplab_core::data::{DataError, StaticProvider};
    use sweeplab_core::domain::PriceBar;
    use sweeplab_core::engine::SimulatorConfig;
    use sweeplab_core::strategy::SignalStrategyFactory;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset)
    }

    fn zigzag_provider() -> StaticProvider {
        let closes = [10.0, 11.0, 12.0, 11.0, 10.0, 11.0, 12.0, 11.0, 10.0, 11.0, 12.0, 13.0];
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::flat(day(i as i64), c))
            .collect();
        StaticProvider::new(PriceSeries::new("TEST", bars).unwrap())
    }

    fn momentum() -> Arc<dyn StrategyFactory> {
        Arc::new(SignalStrategyFactory::new("momentum", SimulatorConfig::default()).unwrap())
    }

    fn config(mode: SearchMode) -> OptimizerConfig {
        OptimizerConfig {
            dataset: DatasetRequest::new("TEST", day(0), day(30)),
            metric: "total_return".into(),
            mode,
            ..OptimizerConfig::default()
        }
    }

    struct FailingProvider;

    impl DatasetProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }
        fn fetch(&self, symbol: &str, _: NaiveDate, _: NaiveDate) -> Result<PriceSeries, DataError> {
            Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
        }
    }

    // ── Construction ──

    #[test]
    fn unknown_metric_rejected_before_fetch() {
        let mut cfg = config(SearchMode::Grid { cap: 10 });
        cfg.metric = "alpha".into();
        let grid = ParamGrid::new().with_values("lookback", [1, 2]);
        assert!(matches!(
            Optimizer::new(grid, cfg),
            Err(ConfigError::UnknownMetric(_))
        ));
    }

    #[test]
    fn grid_mode_rejects_ranges() {
        let ranges = ParamRanges::new().with_int("lookback", 1, 5);
        let err = Optimizer::new(ranges, config(SearchMode::Grid { cap: 10 }));
        assert!(matches!(err, Err(ConfigError::InvalidSetting(_))));
    }

    #[test]
    fn empty_space_rejected() {
        let err = Optimizer::new(ParamGrid::new(), config(SearchMode::Grid { cap: 10 }));
        assert!(matches!(err, Err(ConfigError::EmptySpace)));
    }

    // ── Run ──

    #[test]
    fn fetch_failure_aborts_with_zero_counts() {
        let grid = ParamGrid::new().with_values("lookback", [1, 2]);
        let opt = Optimizer::new(grid, config(SearchMode::Grid { cap: 10 })).unwrap();
        let result = opt.run(&FailingProvider, momentum(), None);
        assert!(!result.success);
        assert_eq!(result.tested, 0);
        assert!(result.best_params.is_empty());
        assert!(result.error.unwrap().starts_with("DataFetchError:"));
        assert!(result.dataset_hash.is_none());
    }

    #[test]
    fn counters_add_up() {
        let grid = ParamGrid::new().with_values("lookback", [1, 2, 20]);
        let opt = Optimizer::new(grid, config(SearchMode::Grid { cap: 10 })).unwrap();
        let result = opt.run(&zigzag_provider(), momentum(), None);
        assert_eq!(result.tested, 3);
        assert_eq!(result.tested, result.valid + result.failed + result.skipped);
        assert!(result.pruned <= result.failed);
        assert_eq!(result.failure_summary.get(&FailureCategory::InsufficientHistory), Some(&1));
        assert_eq!(result.search_kind, Some(EnumeratorKind::Exact));
        assert_eq!(result.space_size, Some(3));
    }

    #[test]
    fn constraint_rejections_are_skipped() {
        let grid = ParamGrid::new()
            .with_values("fast_period", [2, 4])
            .with_values("slow_period", [3, 4]);
        let factory: Arc<dyn StrategyFactory> =
            Arc::new(SignalStrategyFactory::new("ma_crossover", SimulatorConfig::default()).unwrap());
        let opt = Optimizer::new(grid, config(SearchMode::Grid { cap: 10 }))
            .unwrap()
            .with_constraint(less_than("fast_period", "slow_period"));
        let result = opt.run(&zigzag_provider(), factory, None);
        assert_eq!(result.tested, 4);
        assert_eq!(result.skipped, 2);
        assert_eq!(result.valid + result.failed, 2);
    }

    #[test]
    fn preset_cancel_flag_stops_immediately() {
        let grid = ParamGrid::new().with_values("lookback", [1, 2, 3]);
        let opt = Optimizer::new(grid, config(SearchMode::Grid { cap: 10 })).unwrap();
        let flag = AtomicBool::new(true);
        let result = opt.run(&zigzag_provider(), momentum(), Some(&flag));
        assert!(result.cancelled);
        assert_eq!(result.tested, 0);
        assert!(!result.success);
        assert!(result.warnings.iter().any(|w| w.contains("cancelled")));
    }

    #[test]
    fn random_mode_skips_duplicates() {
        let ranges = ParamRanges::new().with_int("lookback", 1, 2);
        let opt = Optimizer::new(ranges, config(SearchMode::Random { n_iterations: 20 })).unwrap();
        let result = opt.run(&zigzag_provider(), momentum(), None);
        assert_eq!(result.tested, 20);
        assert!(result.skipped >= 18);
        assert_eq!(result.valid + result.failed, 20 - result.skipped);
    }

    #[test]
    fn result_serializes_to_json() {
        let grid = ParamGrid::new().with_values("lookback", [1, 2]);
        let opt = Optimizer::new(grid, config(SearchMode::Grid { cap: 10 })).unwrap();
        let value = opt.run(&zigzag_provider(), momentum(), None).to_json_value().unwrap();
        assert!(value["best_params"].is_object());
        assert_eq!(value["metric"], "total_return");
        assert_eq!(value["search_kind"], "exact");
    }

    #[test]
    fn accumulator_keeps_first_of_equal_scores() {
        let mut acc = Accumulator::new(ScoreMetric::TotalReturn);
        let metrics = PerformanceMetrics::compute(&[100.0, 110.0], &[], 100.0, 110.0, 1);
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            let params = ParameterSet::new().with("p", *name);
            acc.record(i, EvaluationResult::success(params, 0.1, metrics.clone()));
        }
        let header = RunHeader {
            symbol: "TEST".into(),
            metric: ScoreMetric::TotalReturn,
            seed: 1,
            search_kind: None,
            space_size: None,
            dataset_hash: None,
        };
        let result = acc.finish(header, Vec::new(), false, None);
        assert_eq!(result.best_params.get_text("p"), Some("a"));
        let order: Vec<usize> = result.top_results.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }
}
