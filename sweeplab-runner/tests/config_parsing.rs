//! TOML configuration files through to a runnable optimizer.

use std::fs;

use sweeplab_core::data::SyntheticProvider;
use sweeplab_core::strategy::SignalStrategyFactory;
use sweeplab_core::ParamValue;
use sweeplab_runner::{ConfigError, OptimizationConfig, Optimizer, ParamSpace, SearchMode};

const MA_CONFIG: &str = r#"
symbol = "SYN"
start = "2021-01-01"
end = "2022-12-31"
strategy = "ma_crossover"

[search]
mode = "grid"
cap = 50
seed = 7
metric = "sharpe_ratio"
min_trades = 1
constraints = ["fast_period < slow_period"]

[simulator]
initial_capital = 25000.0
exposure_fraction = 0.5
allow_fractional = true
slippage_bps = 2.0

[grid]
fast_period = [5, 10, 20]
slow_period = [10, 20, 50]
"#;

#[test]
fn config_file_drives_a_full_run() {
    // GIVEN: a config file on disk
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sweep.toml");
    fs::write(&path, MA_CONFIG).unwrap();

    // WHEN: loading it and building the optimizer from it
    let config = OptimizationConfig::load(&path).unwrap();
    config.validate().unwrap();
    let space = config.param_space().unwrap();
    let factory =
        SignalStrategyFactory::new(&config.strategy, config.simulator_config()).unwrap();
    let mut optimizer = Optimizer::new(space, config.optimizer_config()).unwrap();
    for constraint in config.constraints().unwrap() {
        optimizer = optimizer.with_constraint(constraint);
    }
    let result = optimizer.run(&SyntheticProvider::new(1), std::sync::Arc::new(factory), None);

    // THEN: the constraint skips fast >= slow (3 of 9) and the rest run
    assert_eq!(result.tested, 9);
    assert_eq!(result.skipped, 3);
    assert_eq!(result.valid + result.failed, 6);
    assert_eq!(result.symbol, "SYN");
    assert_eq!(result.seed, 7);
}

#[test]
fn simulator_section_maps_onto_simulator_config() {
    let config = OptimizationConfig::from_toml_str(MA_CONFIG).unwrap();
    let sim = config.simulator_config();
    assert_eq!(sim.initial_capital, 25_000.0);
    assert_eq!(sim.sizing.exposure_fraction, 0.5);
    assert!(sim.sizing.allow_fractional);
    assert_eq!(sim.costs.slippage_bps, 2.0);
    assert_eq!(config.optimizer_config().mode, SearchMode::Grid { cap: 50 });
}

#[test]
fn grid_values_keep_types_and_order() {
    let config = OptimizationConfig::from_toml_str(MA_CONFIG).unwrap();
    let ParamSpace::Grid(grid) = config.param_space().unwrap() else {
        panic!("expected a grid");
    };
    assert_eq!(grid.axes()[0].name, "fast_period");
    assert_eq!(
        grid.axes()[1].values,
        vec![ParamValue::Int(10), ParamValue::Int(20), ParamValue::Int(50)]
    );
}

#[test]
fn inverted_range_fails_validation() {
    let text = r#"
symbol = "SYN"
start = "2021-01-01"
end = "2021-12-31"
strategy = "momentum"

[search]
mode = "random"

[ranges]
lookback = { min = 30, max = 5 }
"#;
    let config = OptimizationConfig::from_toml_str(text).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::InvalidRange { .. })));
}

#[test]
fn empty_grid_fails_validation() {
    let text = r#"
symbol = "SYN"
start = "2021-01-01"
end = "2021-12-31"
strategy = "momentum"
"#;
    let config = OptimizationConfig::from_toml_str(text).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::EmptySpace)));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let err = OptimizationConfig::from_toml_str("symbol = ").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn misspelled_constraint_name_fails_validation() {
    // GIVEN: a constraint naming a parameter the grid does not have
    let text = MA_CONFIG.replace("fast_period < slow_period", "fast_perod < slow_period");
    let config = OptimizationConfig::from_toml_str(&text).unwrap();

    // THEN: validation and constraint parsing both reject it
    assert!(matches!(config.validate(), Err(ConfigError::InvalidConstraint { .. })));
    let err = config.constraints().err().unwrap();
    assert!(err.to_string().contains("unknown parameter 'fast_perod'"));
}

#[test]
fn text_parameter_cannot_be_constrained() {
    let text = MA_CONFIG
        .replace("fast_period < slow_period", "mode < slow_period")
        .replace("slow_period = [10, 20, 50]", "slow_period = [10, 20, 50]\nmode = [\"a\", \"b\"]");
    let config = OptimizationConfig::from_toml_str(&text).unwrap();
    let err = config.constraints().err().unwrap();
    assert!(err.to_string().contains("not numeric"));
}

#[test]
fn float_range_too_wide_to_sample_fails_validation() {
    let text = r#"
symbol = "SYN"
start = "2021-01-01"
end = "2021-12-31"
strategy = "momentum"

[search]
mode = "random"
n_iterations = 5

[ranges]
lookback = { min = 2, max = 5 }
threshold = { min = -1e308, max = 1e308 }
"#;
    let config = OptimizationConfig::from_toml_str(text).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::InvalidRange { .. })));
    let err = Optimizer::new(config.param_space().unwrap(), config.optimizer_config()).err();
    assert!(matches!(err, Some(ConfigError::InvalidRange { .. })));
}
