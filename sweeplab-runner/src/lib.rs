//! SweepLab Runner: parameter search over the `sweeplab-core` backtester.
//!
//! This crate builds on `sweeplab-core` to provide:
//! - Performance metrics and a named metric registry
//! - Parameter spaces (grids, ranges) and the combination enumerators
//! - The evaluator with its failure taxonomy
//! - The optimizer coordinator, sequential or on a rayon pool
//! - TOML run configuration and JSON/CSV export

pub mod config;
pub mod enumerator;
pub mod evaluator;
pub mod export;
pub mod metric;
pub mod metrics;
pub mod optimizer;
pub mod space;

pub use config::{ConfigError, OptimizationConfig, SearchKind, SearchSettings, SimulatorSettings};
pub use enumerator::{Enumerator, EnumeratorKind, ExactEnumerator, RandomEnumerator, SampledEnumerator};
pub use evaluator::{EvaluationResult, Evaluator, EvaluatorConfig, FailureCategory};
pub use export::{write_result_json, write_top_results_csv, ExportError};
pub use metric::ScoreMetric;
pub use metrics::PerformanceMetrics;
pub use optimizer::{
    optimize, DatasetRequest, FailureExample, OptimizationResult, Optimizer, OptimizerConfig,
    RankedResult, SearchMode,
};
pub use space::{less_than, parse_constraint, Constraint, ParamGrid, ParamRange, ParamRanges, ParamSpace};
