//! SweepLab Core: domain types, simulator, strategy and data contracts.
//!
//! This crate contains everything a single backtest needs:
//! - Domain types (bars, validated price series, signals, trades, equity points)
//! - Parameter values and ordered parameter sets
//! - The long-only bar-loop simulator with sizing and cost models
//! - Indicators and the shipped signal generators
//! - Strategy / StrategyFactory contracts
//! - DatasetProvider contract with CSV, synthetic and in-memory providers
//! - Deterministic seed derivation

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod params;
pub mod rng;
pub mod signals;
pub mod sizers;
pub mod strategy;

pub use params::{ParamValue, ParameterSet};
