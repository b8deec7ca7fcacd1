//! TOML run configuration and the runner's configuration error type.
//!
//! An [`OptimizationConfig`] file names the dataset, the strategy, the
//! search settings, the simulator settings and the parameter space. Grid
//! and range tables keep their file order, which becomes the enumeration
//! order.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sweeplab_core::engine::{CostModel, SimulatorConfig};
use sweeplab_core::sizers::SizingConfig;
use sweeplab_core::ParamValue;
use thiserror::Error;

use crate::metric::ScoreMetric;
use crate::optimizer::{DatasetRequest, OptimizerConfig, SearchMode};
use crate::space::{parse_constraint, Constraint, ParamGrid, ParamRange, ParamRanges, ParamSpace};

/// Problems that stop a run before anything is fetched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown metric: {0}")]
    UnknownMetric(String),

    #[error("parameter space is empty")]
    EmptySpace,

    #[error("parameter '{0}' has no values")]
    EmptyValues(String),

    #[error("parameter '{0}' is defined twice")]
    DuplicateParameter(String),

    #[error("invalid range for '{name}': {reason}")]
    InvalidRange { name: String, reason: String },

    #[error("invalid value for '{name}': {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("invalid constraint '{expr}': {reason}")]
    InvalidConstraint { expr: String, reason: String },

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

// ─── Sections ────────────────────────────────────────────────────────

/// Whether to walk a grid or draw at random.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    #[default]
    Grid,
    Random,
}

/// `[search]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchSettings {
    pub mode: SearchKind,
    pub cap: usize,
    pub n_iterations: usize,
    pub seed: u64,
    pub metric: String,
    pub min_trades: usize,
    pub timeout_ms: Option<u64>,
    pub time_budget_ms: Option<u64>,
    pub threads: usize,
    pub chunk_size: usize,
    /// Expressions like `"fast_period < slow_period"`.
    pub constraints: Vec<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        let base = OptimizerConfig::default();
        Self {
            mode: SearchKind::Grid,
            cap: 500,
            n_iterations: 200,
            seed: base.seed,
            metric: base.metric,
            min_trades: base.min_trades,
            timeout_ms: None,
            time_budget_ms: None,
            threads: base.threads,
            chunk_size: base.chunk_size,
            constraints: Vec::new(),
        }
    }
}

/// `[simulator]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorSettings {
    pub initial_capital: f64,
    pub exposure_fraction: f64,
    pub allow_fractional: bool,
    pub min_trade_value: f64,
    pub commission_bps: f64,
    pub slippage_bps: f64,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            exposure_fraction: 1.0,
            allow_fractional: false,
            min_trade_value: 0.0,
            commission_bps: 0.0,
            slippage_bps: 0.0,
        }
    }
}

impl SimulatorSettings {
    pub fn to_simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig::new(self.initial_capital)
            .with_sizing(SizingConfig {
                exposure_fraction: self.exposure_fraction,
                allow_fractional: self.allow_fractional,
            })
            .with_costs(CostModel::new(self.slippage_bps, self.commission_bps))
            .with_min_trade_value(self.min_trade_value)
    }
}

// ─── Top level ───────────────────────────────────────────────────────

/// A complete optimization run as written in TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizationConfig {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Signal generator name, e.g. `momentum`.
    pub strategy: String,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub simulator: SimulatorSettings,
    #[serde(default)]
    pub grid: toml::Table,
    #[serde(default)]
    pub ranges: toml::Table,
}

impl OptimizationConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Check everything that can be checked without data.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.search.metric.parse::<ScoreMetric>()?;
        self.param_space()?.validate()?;
        self.constraints()?;
        if self.start > self.end {
            return Err(ConfigError::InvalidSetting(format!(
                "start {} is after end {}",
                self.start, self.end
            )));
        }
        self.simulator
            .to_simulator_config()
            .validate()
            .map_err(|e| ConfigError::InvalidSetting(e.to_string()))
    }

    /// The space to search. Grid mode reads `[grid]`; random mode reads
    /// `[ranges]`, falling back to `[grid]` when no ranges are given.
    pub fn param_space(&self) -> Result<ParamSpace, ConfigError> {
        match self.search.mode {
            SearchKind::Grid => Ok(ParamSpace::Grid(grid_from_table(&self.grid)?)),
            SearchKind::Random if self.ranges.is_empty() && !self.grid.is_empty() => {
                Ok(ParamSpace::Grid(grid_from_table(&self.grid)?))
            }
            SearchKind::Random => Ok(ParamSpace::Ranges(ranges_from_table(&self.ranges)?)),
        }
    }

    /// Parsed `[search] constraints`, checked against the search space.
    pub fn constraints(&self) -> Result<Vec<Constraint>, ConfigError> {
        let space = self.param_space()?;
        self.search
            .constraints
            .iter()
            .map(|expr| parse_constraint(expr, &space))
            .collect()
    }

    pub fn search_mode(&self) -> SearchMode {
        match self.search.mode {
            SearchKind::Grid => SearchMode::Grid {
                cap: self.search.cap,
            },
            SearchKind::Random => SearchMode::Random {
                n_iterations: self.search.n_iterations,
            },
        }
    }

    pub fn optimizer_config(&self) -> OptimizerConfig {
        OptimizerConfig {
            dataset: DatasetRequest::new(self.symbol.clone(), self.start, self.end),
            metric: self.search.metric.clone(),
            mode: self.search_mode(),
            seed: self.search.seed,
            initial_capital: self.simulator.initial_capital,
            min_trades: self.search.min_trades,
            timeout_ms: self.search.timeout_ms,
            time_budget_ms: self.search.time_budget_ms,
            threads: self.search.threads,
            chunk_size: self.search.chunk_size,
        }
    }

    pub fn simulator_config(&self) -> SimulatorConfig {
        self.simulator.to_simulator_config()
    }
}

// ─── Table conversion ────────────────────────────────────────────────

fn grid_from_table(table: &toml::Table) -> Result<ParamGrid, ConfigError> {
    let mut grid = ParamGrid::new();
    for (name, value) in table {
        let items = value.as_array().ok_or_else(|| ConfigError::InvalidValue {
            name: name.clone(),
            reason: format!("expected an array, got {}", value.type_str()),
        })?;
        let values = items
            .iter()
            .map(|v| param_value(name, v))
            .collect::<Result<Vec<_>, _>>()?;
        grid.push(name.clone(), values);
    }
    Ok(grid)
}

fn param_value(name: &str, value: &toml::Value) -> Result<ParamValue, ConfigError> {
    match value {
        toml::Value::Integer(i) => Ok(ParamValue::Int(*i)),
        toml::Value::Float(f) => Ok(ParamValue::Float(*f)),
        toml::Value::String(s) => Ok(ParamValue::Text(s.clone())),
        other => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("unsupported type {}", other.type_str()),
        }),
    }
}

fn ranges_from_table(table: &toml::Table) -> Result<ParamRanges, ConfigError> {
    let mut ranges = ParamRanges::new();
    for (name, value) in table {
        let bounds = value.as_table().ok_or_else(|| ConfigError::InvalidValue {
            name: name.clone(),
            reason: "expected { min = .., max = .. }".into(),
        })?;
        let bound = |key: &str| {
            bounds.get(key).ok_or_else(|| ConfigError::InvalidRange {
                name: name.clone(),
                reason: format!("missing '{key}'"),
            })
        };
        let range = match (bound("min")?, bound("max")?) {
            (toml::Value::Integer(min), toml::Value::Integer(max)) => ParamRange::Int {
                min: *min,
                max: *max,
            },
            (min, max) => match (as_number(min), as_number(max)) {
                (Some(min), Some(max)) => ParamRange::Float { min, max },
                _ => {
                    return Err(ConfigError::InvalidRange {
                        name: name.clone(),
                        reason: "bounds must be numbers".into(),
                    })
                }
            },
        };
        ranges.push(name.clone(), range);
    }
    Ok(ranges)
}

fn as_number(value: &toml::Value) -> Option<f64> {
    match value {
        toml::Value::Integer(i) => Some(*i as f64),
        toml::Value::Float(f) => Some(*f),
        _ => None,
    }
}
