//! PairLab CLI: pairs-trading backtests, pair screening and parameter sweeps.
//!
//! Commands:
//! - `run`: backtest one pair from a TOML config file or from flags
//! - `scan`: test every pair in a symbol list for cointegration
//! - `sweep`: grid search over thresholds, window and fee rate for one pair

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pairlab_core::data::{CsvProvider, PriceProvider, SyntheticProvider};
use pairlab_core::stats::EngleGranger;
use pairlab_runner::{
    load_pair, run_from_config, run_sweep, save_artifacts, scan_pairs, BacktestConfig,
    BacktestOutcome, BacktestResult, SweepGrid, SweepOutcome,
};

#[derive(Parser)]
#[command(
    name = "pairlab",
    about = "PairLab CLI: cointegration pairs-trading backtester"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one pair.
    Run {
        #[command(flatten)]
        pair: PairArgs,

        #[command(flatten)]
        data: DataArgs,

        /// Entry z-score threshold.
        #[arg(long)]
        entry: Option<f64>,

        /// Exit z-score threshold.
        #[arg(long)]
        exit: Option<f64>,

        /// Rolling window in bars.
        #[arg(long)]
        window: Option<usize>,

        /// Proportional fee per leg.
        #[arg(long)]
        fee: Option<f64>,

        /// Initial capital.
        #[arg(long)]
        capital: Option<f64>,

        /// Enter on z-score alone, ignoring the fee gate.
        #[arg(long, default_value_t = false)]
        fee_naive: bool,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary only; write no artifacts.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Test every unordered pair of SYMBOLS for cointegration.
    Scan {
        /// Symbols to screen (e.g., BTC ETH SOL).
        #[arg(required = true, num_args = 2..)]
        symbols: Vec<String>,

        #[command(flatten)]
        data: DataArgs,

        /// Start date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Significance level for the cointegrated flag.
        #[arg(long, default_value_t = 0.05)]
        significance: f64,

        /// Print the report as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Grid search over entry/exit thresholds, windows and fee rates.
    Sweep {
        #[command(flatten)]
        pair: PairArgs,

        #[command(flatten)]
        data: DataArgs,

        /// Entry thresholds, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = vec![1.5, 2.0, 2.5])]
        entry: Vec<f64>,

        /// Exit thresholds, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = vec![0.1, 0.3, 0.5])]
        exit: Vec<f64>,

        /// Windows, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = vec![30, 60, 120])]
        window: Vec<usize>,

        /// Fee rates, comma separated. Defaults to the config's fee rate.
        #[arg(long, value_delimiter = ',')]
        fee: Vec<f64>,

        /// Number of results to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

/// Which pair to run: a config file, or two symbols plus defaults.
#[derive(Args)]
struct PairArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// First asset (required without --config).
    #[arg(long)]
    asset1: Option<String>,

    /// Second asset (required without --config).
    #[arg(long)]
    asset2: Option<String>,

    /// Start date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Skip the cointegration gate.
    #[arg(long, default_value_t = false)]
    no_coint: bool,
}

/// Where prices come from.
#[derive(Args)]
struct DataArgs {
    /// Use deterministic synthetic prices instead of CSV files.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Seed for --synthetic.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Bars per symbol for --synthetic.
    #[arg(long, default_value_t = 2000)]
    bars: usize,

    /// Directory of per-symbol CSV files. Overrides the config's [data] dir.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// File name pattern with a {symbol} placeholder. Overrides the config's pattern.
    #[arg(long)]
    file_pattern: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            pair,
            data,
            entry,
            exit,
            window,
            fee,
            capital,
            fee_naive,
            output_dir,
            no_save,
        } => {
            let mut config = build_config(&pair)?;
            if let Some(v) = entry {
                config.strategy.entry_threshold = v;
            }
            if let Some(v) = exit {
                config.strategy.exit_threshold = v;
            }
            if let Some(v) = window {
                config.strategy.window = v;
            }
            if let Some(v) = fee {
                config.costs.fee_rate = v;
            }
            if let Some(v) = capital {
                config.backtest.initial_capital = v;
            }
            if fee_naive {
                config.strategy.fee_aware_entries = false;
            }
            config.validate()?;
            run_cmd(&config, &data, &output_dir, no_save)
        }
        Commands::Scan {
            symbols,
            data,
            start,
            end,
            significance,
            json,
        } => scan_cmd(&symbols, &data, start, end, significance, json),
        Commands::Sweep {
            pair,
            data,
            entry,
            exit,
            window,
            fee,
            top,
        } => {
            let config = build_config(&pair)?;
            let grid = SweepGrid {
                entry_thresholds: entry,
                exit_thresholds: exit,
                windows: window,
                fee_rates: if fee.is_empty() {
                    vec![config.costs.fee_rate]
                } else {
                    fee
                },
            };
            sweep_cmd(&config, &data, &grid, top)
        }
    }
}

fn build_config(args: &PairArgs) -> Result<BacktestConfig> {
    let mut config = match (&args.config, &args.asset1, &args.asset2) {
        (Some(path), None, None) => BacktestConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        (Some(_), _, _) => bail!("--config and --asset1/--asset2 are mutually exclusive"),
        (None, Some(a1), Some(a2)) => BacktestConfig::for_pair(a1.clone(), a2.clone()),
        (None, _, _) => bail!("either --config or both --asset1 and --asset2 are required"),
    };
    if args.start.is_some() {
        config.pair.start_date = args.start;
    }
    if args.end.is_some() {
        config.pair.end_date = args.end;
    }
    if args.no_coint {
        config.cointegration.enabled = false;
    }
    Ok(config)
}

fn provider(args: &DataArgs, config: Option<&BacktestConfig>) -> Box<dyn PriceProvider> {
    if args.synthetic {
        return Box::new(SyntheticProvider::new(args.seed, args.bars));
    }
    let defaults = config.map(|c| c.data.clone()).unwrap_or_default();
    let dir = args.data_dir.clone().unwrap_or(defaults.dir);
    let pattern = args.file_pattern.clone().unwrap_or(defaults.file_pattern);
    Box::new(CsvProvider::with_pattern(dir, pattern))
}

fn run_cmd(
    config: &BacktestConfig,
    data: &DataArgs,
    output_dir: &std::path::Path,
    no_save: bool,
) -> Result<()> {
    let provider = provider(data, Some(config));
    let outcome = run_from_config(config, provider.as_ref(), &EngleGranger::new())?;

    let result = match outcome {
        BacktestOutcome::NotCointegrated {
            pair,
            p_value,
            significance,
        } => {
            println!("{pair} is not cointegrated (p = {p_value:.4} > {significance}); no backtest run.");
            return Ok(());
        }
        BacktestOutcome::Completed(result) => result,
    };

    print_summary(&result);

    if !no_save {
        let run_dir = save_artifacts(&result, output_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn scan_cmd(
    symbols: &[String],
    data: &DataArgs,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    significance: f64,
    json: bool,
) -> Result<()> {
    if !(significance > 0.0 && significance < 1.0) {
        bail!("--significance must be in (0, 1), got {significance}");
    }
    let provider = provider(data, None);
    let report = scan_pairs(
        provider.as_ref(),
        &EngleGranger::new(),
        symbols,
        start,
        end,
        significance,
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!(
        "{:<16} {:>10} {:>10} {:>12} {:>8}  {}",
        "Pair", "p-value", "t-stat", "Hedge", "Bars", "Cointegrated"
    );
    println!("{}", "-".repeat(72));
    for e in &report.entries {
        println!(
            "{:<16} {:>10.4} {:>10.3} {:>12.4} {:>8}  {}",
            format!("{}-{}", e.asset1, e.asset2),
            e.p_value,
            e.t_statistic,
            e.hedge_ratio,
            e.bars,
            if e.cointegrated { "yes" } else { "no" }
        );
    }
    for f in &report.failures {
        println!("{}-{}: skipped ({})", f.asset1, f.asset2, f.reason);
    }
    println!();
    Ok(())
}

fn sweep_cmd(config: &BacktestConfig, data: &DataArgs, grid: &SweepGrid, top: usize) -> Result<()> {
    let provider = provider(data, Some(config));
    let loaded = load_pair(
        provider.as_ref(),
        &config.pair.asset1,
        &config.pair.asset2,
        config.pair.start_date,
        config.pair.end_date,
    )?;
    info!(grid_points = grid.size(), "sweep grid built");

    let results = match run_sweep(grid, config, &loaded, &EngleGranger::new())? {
        SweepOutcome::NotCointegrated {
            pair,
            p_value,
            significance,
        } => {
            println!("{pair} is not cointegrated (p = {p_value:.4} > {significance}); sweep skipped.");
            return Ok(());
        }
        SweepOutcome::Completed(results) => results,
    };

    println!();
    println!("=== Sweep: {} ({} configs) ===", loaded.series.name(), results.len());
    if let Some(c) = results.cointegration() {
        println!("Cointegration p-value: {:.4}", c.p_value);
    }
    println!(
        "{:>6} {:>6} {:>7} {:>8} {:>10} {:>9} {:>9} {:>7}",
        "Entry", "Exit", "Window", "Fee", "Return", "Sharpe", "Ret/Risk", "Trades"
    );
    println!("{}", "-".repeat(70));
    for r in results.top_n(top) {
        let s = &r.config.strategy;
        println!(
            "{:>6.2} {:>6.2} {:>7} {:>8.4} {:>9.2}% {:>9.3} {:>9.3} {:>7}",
            s.entry_threshold,
            s.exit_threshold,
            s.window,
            r.config.costs.fee_rate,
            r.return_pct * 100.0,
            r.sharpe,
            r.return_to_risk,
            r.trades.len()
        );
    }
    println!();
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    println!();
    println!("=== Backtest Result ===");
    println!("Pair:           {}", result.pair_name());
    match (&result.start, &result.end) {
        (Some(start), Some(end)) => println!("Period:         {start} to {end}"),
        _ => println!("Period:         (no bars after warmup)"),
    }
    println!(
        "Bars:           {} ({} warmup)",
        result.bar_count, result.warmup_bars
    );
    if let Some(c) = &result.cointegration {
        println!(
            "Cointegration:  p = {:.4}, hedge ratio {:.4}",
            c.p_value, c.hedge_ratio
        );
    }
    println!("Trades:         {}", result.metrics.trade_count);
    println!();
    println!("--- Performance ---");
    println!("Return:         {:.2}%", result.return_pct * 100.0);
    println!("Final Capital:  {:.2}", result.final_capital);
    println!("Sharpe:         {:.3}", result.sharpe);
    println!("Return/Risk:    {:.3}", result.return_to_risk);
    println!(
        "Max Drawdown:   {:.2}%",
        result.metrics.max_drawdown * 100.0
    );
    println!("Win Rate:       {:.1}%", result.metrics.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", result.metrics.profit_factor);
    println!("Avg Bars Held:  {:.1}", result.metrics.avg_bars_held);
    println!("Max Consec Win: {}", result.metrics.max_consecutive_wins);
    println!("Max Consec Loss:{}", result.metrics.max_consecutive_losses);
    if let Some(open) = &result.open_position {
        println!("Open at end:    {} since {}", open.kind, open.entry_time);
    }
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}
