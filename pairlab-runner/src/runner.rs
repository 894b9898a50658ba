//! Backtest runner: wires together data loading, the cointegration gate,
//! the signal engine and metrics.
//!
//! Three entry points:
//! - `run_from_config()`: loads the pair through a provider, then runs. Used by CLI.
//! - `run_backtest()`: takes a pre-loaded pair and applies the gate. Used by scans.
//! - `run_ungated()`: takes a pre-loaded pair and skips the gate. Used by sweeps,
//!   which run the gate once for the whole grid.
//!
//! `simulate()` is the flat positional-argument form returning the three headline
//! numbers, or `None`s when the gate rejects the pair.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use pairlab_core::data::PriceProvider;
use pairlab_core::domain::{PairSeries, Trade};
use pairlab_core::engine::{
    generate_signals, usable_rows, AlwaysAllow, CapitalPoint, EntryGate, OpenPosition, SignalRow,
    TradeSimulator,
};
use pairlab_core::indicators::{SpreadAnalyzer, SpreadError};
use pairlab_core::stats::{CointegrationResult, CointegrationTest, StatsError};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_pair, LoadError, LoadedPair};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("cointegration test failed: {0}")]
    Stats(#[from] StatsError),
    #[error("spread analysis: {0}")]
    Spread(#[from] SpreadError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single pair backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub asset1: String,
    pub asset2: String,
    pub config: BacktestConfig,
    /// First and last simulated bar.
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    /// Aligned bars after the date filter.
    pub bar_count: usize,
    /// Bars dropped because their rolling window had not filled.
    pub warmup_bars: usize,
    /// One point per simulated bar.
    pub capital_series: Vec<CapitalPoint>,
    /// One slot per simulated bar; `Some` where a trade closed.
    pub trade_returns: Vec<Option<f64>>,
    pub trades: Vec<Trade>,
    pub open_position: Option<OpenPosition>,
    pub initial_capital: f64,
    pub final_capital: f64,
    /// `final_capital / initial_capital − 1`, as a fraction.
    pub return_pct: f64,
    pub sharpe: f64,
    pub return_to_risk: f64,
    pub metrics: PerformanceMetrics,
    /// `None` when the gate was disabled.
    pub cointegration: Option<CointegrationResult>,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    /// Per-bar signal trace. Written to `trace.csv`, not to the manifest.
    #[serde(skip)]
    pub trace: Vec<SignalRow>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn pair_name(&self) -> String {
        format!("{}-{}", self.asset1, self.asset2)
    }

    /// Capital values alone, in bar order.
    pub fn capital_values(&self) -> Vec<f64> {
        self.capital_series.iter().map(|p| p.capital).collect()
    }
}

/// Either a full result or the gate's rejection.
#[derive(Debug, Clone)]
pub enum BacktestOutcome {
    NotCointegrated {
        pair: String,
        p_value: f64,
        significance: f64,
    },
    Completed(Box<BacktestResult>),
}

impl BacktestOutcome {
    pub fn completed(self) -> Option<BacktestResult> {
        match self {
            BacktestOutcome::Completed(result) => Some(*result),
            BacktestOutcome::NotCointegrated { .. } => None,
        }
    }
}

/// Load the configured pair through `provider` and run it.
pub fn run_from_config(
    config: &BacktestConfig,
    provider: &dyn PriceProvider,
    tester: &dyn CointegrationTest,
) -> Result<BacktestOutcome, RunError> {
    config.validate()?;
    let loaded = load_pair(
        provider,
        &config.pair.asset1,
        &config.pair.asset2,
        config.pair.start_date,
        config.pair.end_date,
    )?;
    run_backtest(config, &loaded, tester)
}

/// Run a backtest on pre-loaded data: no I/O.
///
/// With the gate enabled, a p-value above the configured significance stops
/// the run before any signal is generated.
pub fn run_backtest(
    config: &BacktestConfig,
    loaded: &LoadedPair,
    tester: &dyn CointegrationTest,
) -> Result<BacktestOutcome, RunError> {
    config.validate()?;

    let cointegration = if config.cointegration.enabled {
        let result = test_pair(&loaded.series, tester)?;
        let significance = config.cointegration.significance;
        if !result.is_cointegrated(significance) {
            info!(
                pair = %loaded.series.name(),
                p_value = result.p_value,
                significance,
                "pair is not cointegrated; skipping simulation"
            );
            return Ok(BacktestOutcome::NotCointegrated {
                pair: loaded.series.name(),
                p_value: result.p_value,
                significance,
            });
        }
        Some(result)
    } else {
        debug!(pair = %loaded.series.name(), "cointegration gate disabled");
        None
    };

    let result = run_ungated(config, loaded, cointegration)?;
    Ok(BacktestOutcome::Completed(Box::new(result)))
}

/// Run the cointegration test on a pair's two price columns.
pub fn test_pair(
    series: &PairSeries,
    tester: &dyn CointegrationTest,
) -> Result<CointegrationResult, StatsError> {
    let result = tester.test(&series.prices1(), &series.prices2())?;
    debug!(
        pair = %series.name(),
        test = tester.name(),
        p_value = result.p_value,
        "cointegration tested"
    );
    Ok(result)
}

/// Spread analysis, signal pass, simulation and metrics; no gate.
///
/// `cointegration` is only recorded in the result.
pub fn run_ungated(
    config: &BacktestConfig,
    loaded: &LoadedPair,
    cointegration: Option<CointegrationResult>,
) -> Result<BacktestResult, RunError> {
    let series = &loaded.series;
    let cost = config.cost_model()?;
    let params = config.signal_params();

    let snapshots = SpreadAnalyzer::new(config.strategy.window)?.analyze(series);
    let gate: &dyn EntryGate = if config.strategy.fee_aware_entries {
        &cost
    } else {
        &AlwaysAllow
    };
    let rows = usable_rows(&generate_signals(series, &snapshots, &params, gate));
    let sim = TradeSimulator::new(cost, config.backtest.initial_capital).run(&rows);

    let capital: Vec<f64> = sim.capital_curve.iter().map(|p| p.capital).collect();
    let metrics =
        PerformanceMetrics::compute(&capital, &sim.trades, config.backtest.risk_free_rate);

    info!(
        pair = %series.name(),
        bars = rows.len(),
        trades = sim.trades.len(),
        return_pct = sim.total_return,
        sharpe = metrics.sharpe,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id()?,
        asset1: series.asset1.clone(),
        asset2: series.asset2.clone(),
        config: config.clone(),
        start: rows.first().map(|r| r.bar.timestamp),
        end: rows.last().map(|r| r.bar.timestamp),
        bar_count: series.len(),
        warmup_bars: series.len() - rows.len(),
        capital_series: sim.capital_curve,
        trade_returns: sim.trade_returns,
        trades: sim.trades,
        open_position: sim.open_position,
        initial_capital: sim.initial_capital,
        final_capital: sim.final_capital,
        return_pct: sim.total_return,
        sharpe: metrics.sharpe,
        return_to_risk: metrics.return_to_risk,
        metrics,
        cointegration,
        dataset_hash: loaded.dataset_hash.clone(),
        has_synthetic: loaded.has_synthetic,
        trace: rows,
    })
}

/// Positional form of a single backtest.
///
/// Returns `(return_pct, return_to_risk, sharpe)`, or three `None`s when
/// `cointegration` is given and rejects the pair. Passing `None` disables the gate.
#[allow(clippy::too_many_arguments)]
pub fn simulate(
    provider: &dyn PriceProvider,
    cointegration: Option<&dyn CointegrationTest>,
    asset1: &str,
    asset2: &str,
    entry_threshold: f64,
    exit_threshold: f64,
    stop_loss: f64,
    cooldown: usize,
    window: usize,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    fee_rate: f64,
    initial_capital: f64,
) -> Result<(Option<f64>, Option<f64>, Option<f64>), RunError> {
    let mut config = BacktestConfig::for_pair(asset1, asset2);
    config.pair.start_date = start_date;
    config.pair.end_date = end_date;
    config.strategy.entry_threshold = entry_threshold;
    config.strategy.exit_threshold = exit_threshold;
    config.strategy.stop_loss = stop_loss;
    config.strategy.cooldown = cooldown;
    config.strategy.window = window;
    config.costs.fee_rate = fee_rate;
    config.backtest.initial_capital = initial_capital;
    config.cointegration.enabled = cointegration.is_some();
    config.validate()?;

    let loaded = load_pair(provider, asset1, asset2, start_date, end_date)?;
    let outcome = match cointegration {
        Some(tester) => run_backtest(&config, &loaded, tester)?,
        None => BacktestOutcome::Completed(Box::new(run_ungated(&config, &loaded, None)?)),
    };

    Ok(match outcome.completed() {
        Some(r) => (Some(r.return_pct), Some(r.return_to_risk), Some(r.sharpe)),
        None => (None, None, None),
    })
}
