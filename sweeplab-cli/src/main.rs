//! SweepLab CLI: parameter optimization and single backtests.
//!
//! Commands:
//! - `optimize`: search a parameter space described by a TOML config
//! - `backtest`: run one strategy with fixed parameters and print its trades

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sweeplab_core::data::{CsvProvider, DatasetProvider, SyntheticProvider};
use sweeplab_core::domain::equity::equity_values;
use sweeplab_core::domain::TradeRecord;
use sweeplab_core::engine::SimulatorConfig;
use sweeplab_core::signals::known_signals;
use sweeplab_core::strategy::{SignalStrategyFactory, Strategy, StrategyFactory};
use sweeplab_core::{ParamValue, ParameterSet};
use sweeplab_runner::{
    write_result_json, write_top_results_csv, OptimizationConfig, OptimizationResult, Optimizer,
    PerformanceMetrics,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sweeplab", about = "SweepLab: backtest parameter optimizer")]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search a parameter space described by a TOML config file.
    Optimize {
        /// Path to the TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// CSV file, or a directory of `<SYMBOL>.csv` files.
        #[arg(long, conflicts_with = "synthetic")]
        data: Option<PathBuf>,

        /// Use a seeded synthetic random walk instead of CSV data.
        #[arg(long)]
        synthetic: bool,

        /// Directory for result.json and top_results.csv.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Worker threads (overrides the config).
        #[arg(long)]
        threads: Option<usize>,

        /// Master seed (overrides the config).
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run one strategy with fixed parameters.
    Backtest {
        /// Signal generator: ma_crossover or momentum.
        #[arg(long)]
        strategy: String,

        /// Parameter as name=value; repeatable.
        #[arg(long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// CSV file, or a directory of `<SYMBOL>.csv` files.
        #[arg(long, conflicts_with = "synthetic")]
        data: Option<PathBuf>,

        /// Use a seeded synthetic random walk instead of CSV data.
        #[arg(long)]
        synthetic: bool,

        #[arg(long, default_value = "SPY")]
        symbol: String,

        /// Start date (YYYY-MM-DD).
        #[arg(long, default_value = "2020-01-01")]
        start: String,

        /// End date (YYYY-MM-DD).
        #[arg(long, default_value = "2023-12-31")]
        end: String,

        #[arg(long, default_value_t = 100_000.0)]
        capital: f64,

        /// Seed for --synthetic.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Optimize {
            config,
            data,
            synthetic,
            output,
            threads,
            seed,
        } => run_optimize(config, data, synthetic, output, threads, seed),
        Commands::Backtest {
            strategy,
            params,
            data,
            synthetic,
            symbol,
            start,
            end,
            capital,
            seed,
        } => run_backtest(
            &strategy, &params, data, synthetic, &symbol, &start, &end, capital, seed,
        ),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "sweeplab=debug" } else { "sweeplab=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn make_provider(
    data: Option<PathBuf>,
    synthetic: bool,
    seed: u64,
) -> Result<Box<dyn DatasetProvider>> {
    match (data, synthetic) {
        (Some(path), _) => {
            if !path.exists() {
                bail!("data path does not exist: {}", path.display());
            }
            Ok(Box::new(CsvProvider::new(path)))
        }
        (None, true) => Ok(Box::new(SyntheticProvider::new(seed))),
        (None, false) => bail!("one of --data or --synthetic is required"),
    }
}

// ─── optimize ────────────────────────────────────────────────────────

fn run_optimize(
    config_path: PathBuf,
    data: Option<PathBuf>,
    synthetic: bool,
    output: Option<PathBuf>,
    threads: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let mut config = OptimizationConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(threads) = threads {
        config.search.threads = threads;
    }
    if let Some(seed) = seed {
        config.search.seed = seed;
    }
    config.validate().context("invalid configuration")?;

    let provider = make_provider(data, synthetic, config.search.seed)?;
    let factory = SignalStrategyFactory::new(&config.strategy, config.simulator_config())
        .with_context(|| format!("known strategies: {}", known_signals().join(", ")))?;

    let mut optimizer = Optimizer::new(config.param_space()?, config.optimizer_config())?;
    for constraint in config.constraints()? {
        optimizer = optimizer.with_constraint(constraint);
    }

    let result = optimizer.run(provider.as_ref(), Arc::new(factory), None);
    print_optimization(&result);

    if let Some(dir) = output {
        let json = write_result_json(&dir, &result).context("writing result JSON")?;
        let csv = write_top_results_csv(&dir, &result).context("writing top results CSV")?;
        info!(json = %json.display(), csv = %csv.display(), "results written");
        println!("Results saved to: {}", dir.display());
    }

    if !result.success {
        bail!(
            "optimization failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn print_optimization(result: &OptimizationResult) {
    println!();
    println!("=== Optimization Result ===");
    println!("Symbol:         {}", result.symbol);
    println!("Metric:         {}", result.metric);
    println!("Seed:           {}", result.seed);
    if let Some(kind) = result.search_kind {
        let size = result
            .space_size
            .map_or_else(|| "unbounded".to_string(), |s| s.to_string());
        println!("Search:         {kind} (space {size})");
    }
    println!(
        "Tested:         {} (valid {}, failed {}, skipped {}, pruned {})",
        result.tested, result.valid, result.failed, result.skipped, result.pruned
    );
    if !result.failure_summary.is_empty() {
        println!("Failures:       {}", result.failure_breakdown());
    }
    for warning in &result.warnings {
        println!("WARNING: {warning}");
    }

    if !result.success {
        println!();
        println!("No valid result: {}", result.error.as_deref().unwrap_or("-"));
        return;
    }

    println!();
    println!("--- Best ---");
    println!("Params:         {}", result.best_params);
    if let Some(score) = result.best_score {
        println!("Score:          {score:.4}");
    }
    if let Some(m) = &result.best_metrics {
        print_metrics(m);
    }

    println!();
    println!("--- Top {} ---", result.top_results.len());
    println!(
        "{:>4} {:>6} {:>10} {:>10} {:>8}  Params",
        "Rank", "Index", "Score", "Return", "Trades"
    );
    println!("{}", "-".repeat(60));
    for r in &result.top_results {
        println!(
            "{:>4} {:>6} {:>10.4} {:>9.2}% {:>8}  {}",
            r.rank,
            r.index,
            r.score,
            r.metrics.total_return * 100.0,
            r.metrics.trade_count,
            r.params
        );
    }
    println!();
}

// ─── backtest ────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn run_backtest(
    strategy: &str,
    raw_params: &[String],
    data: Option<PathBuf>,
    synthetic: bool,
    symbol: &str,
    start: &str,
    end: &str,
    capital: f64,
    seed: u64,
) -> Result<()> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").context("parsing --start")?;
    let end = NaiveDate::parse_from_str(end, "%Y-%m-%d").context("parsing --end")?;
    let params = parse_params(raw_params)?;

    let provider = make_provider(data, synthetic, seed)?;
    let series = provider
        .fetch(symbol, start, end)
        .with_context(|| format!("fetching {symbol} from {}", provider.name()))?;

    let factory = SignalStrategyFactory::new(strategy, SimulatorConfig::new(capital))
        .with_context(|| format!("known strategies: {}", known_signals().join(", ")))?;
    let strategy = factory.build(&params, symbol, capital)?;
    let outcome = strategy.backtest(&series)?;
    let metrics = PerformanceMetrics::compute(
        &equity_values(&outcome.equity_curve),
        &outcome.trades,
        capital,
        outcome.final_value,
        outcome.bars_in_market,
    );

    println!();
    println!("=== Backtest Result ===");
    println!("Strategy:       {} ({params})", strategy.name());
    println!("Symbol:         {}", series.symbol());
    println!(
        "Period:         {} to {} ({} bars)",
        series.first_date(),
        series.last_date(),
        series.len()
    );
    println!("Final Value:    {:.2}", outcome.final_value);
    print_metrics(&metrics);
    print_trades(&outcome.trades);
    Ok(())
}

/// `name=value` pairs; integers, then floats, then text.
fn parse_params(raw: &[String]) -> Result<ParameterSet> {
    let mut params = ParameterSet::new();
    for item in raw {
        let Some((name, value)) = item.split_once('=') else {
            bail!("expected NAME=VALUE, got '{item}'");
        };
        let (name, value) = (name.trim(), value.trim());
        if name.is_empty() {
            bail!("empty parameter name in '{item}'");
        }
        let value = if let Ok(i) = value.parse::<i64>() {
            ParamValue::Int(i)
        } else if let Ok(f) = value.parse::<f64>() {
            ParamValue::Float(f)
        } else {
            ParamValue::Text(value.to_string())
        };
        params.insert(name, value);
    }
    Ok(params)
}

fn print_metrics(m: &PerformanceMetrics) {
    println!("Trades:         {}", m.trade_count);
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("CAGR:           {:.2}%", m.cagr * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe_ratio);
    println!("Sortino:        {:.3}", m.sortino_ratio);
    println!("Calmar:         {:.3}", m.calmar_ratio);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Exposure:       {:.1}%", m.exposure * 100.0);
}

fn print_trades(trades: &[TradeRecord]) {
    if trades.is_empty() {
        println!();
        println!("No trades.");
        return;
    }
    println!();
    println!(
        "{:<12} {:>10} {:<12} {:>10} {:>10} {:>12} {:>5}",
        "Entry", "Price", "Exit", "Price", "Qty", "PnL", "Bars"
    );
    println!("{}", "-".repeat(78));
    for t in trades {
        println!(
            "{:<12} {:>10.2} {:<12} {:>10.2} {:>10.2} {:>12.2} {:>5}{}",
            t.entry_date.to_string(),
            t.entry_price,
            t.exit_date.to_string(),
            t.exit_price,
            t.quantity,
            t.pnl,
            t.bars_held,
            if t.forced_exit { " (end)" } else { "" }
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_parse_by_type() {
        let raw = vec![
            "lookback=20".to_string(),
            "threshold = 0.05".to_string(),
            "mode=fast".to_string(),
        ];
        let params = parse_params(&raw).unwrap();
        assert_eq!(params.get("lookback"), Some(&ParamValue::Int(20)));
        assert_eq!(params.get("threshold"), Some(&ParamValue::Float(0.05)));
        assert_eq!(params.get_text("mode"), Some("fast"));
    }

    #[test]
    fn malformed_param_rejected() {
        assert!(parse_params(&["lookback".to_string()]).is_err());
        assert!(parse_params(&["=3".to_string()]).is_err());
    }

    #[test]
    fn cli_parses_optimize() {
        let cli = Cli::try_parse_from([
            "sweeplab", "optimize", "--config", "sweep.toml", "--synthetic", "--threads", "4",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Optimize { synthetic: true, threads: Some(4), .. }
        ));
    }

    #[test]
    fn bool_flags_default_off() {
        let cli = Cli::try_parse_from(["sweeplab", "optimize", "--config", "sweep.toml"]).unwrap();
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Commands::Optimize { synthetic: false, .. }));
    }

    #[test]
    fn data_and_synthetic_conflict() {
        let parsed = Cli::try_parse_from([
            "sweeplab", "backtest", "--strategy", "momentum", "--data", "x.csv", "--synthetic",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn provider_requires_a_source() {
        assert!(make_provider(None, false, 1).is_err());
        assert!(make_provider(None, true, 1).is_ok());
    }
}
