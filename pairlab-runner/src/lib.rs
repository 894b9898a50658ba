//! PairLab Runner: backtest orchestration, metrics, artifacts, sweeps, screening.
//!
//! This crate builds on `pairlab-core` to provide:
//! - TOML configuration with validation and content-addressed run ids
//! - Pair loading through any `PriceProvider`, with date filtering
//! - The cointegration-gated backtest runner and the positional `simulate` entry point
//! - Per-trade risk metrics
//! - JSON/CSV/Markdown artifacts
//! - Parallel parameter sweeps and pair screening

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod scan;
pub mod sweep;

pub use config::{BacktestConfig, ConfigError, RunId};
pub use data_loader::{compute_dataset_hash, load_pair, LoadError, LoadedPair};
pub use export::{
    export_equity_csv, export_json, export_trace_csv, export_trades_csv, generate_report,
    import_json, load_artifacts, save_artifacts,
};
pub use metrics::PerformanceMetrics;
pub use runner::{
    run_backtest, run_from_config, run_ungated, simulate, test_pair, BacktestOutcome,
    BacktestResult, RunError, SCHEMA_VERSION,
};
pub use scan::{pair_combinations, scan_pairs, ScanEntry, ScanFailure, ScanReport};
pub use sweep::{run_sweep, SweepGrid, SweepOutcome, SweepResults};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn performance_metrics_is_send_sync() {
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
    }

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
        assert_send::<BacktestOutcome>();
        assert_sync::<BacktestOutcome>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
        assert_send::<LoadedPair>();
        assert_sync::<LoadedPair>();
    }

    #[test]
    fn sweep_types_are_send_sync() {
        assert_send::<SweepGrid>();
        assert_sync::<SweepGrid>();
        assert_send::<SweepResults>();
        assert_sync::<SweepResults>();
    }

    #[test]
    fn scan_types_are_send_sync() {
        assert_send::<ScanReport>();
        assert_sync::<ScanReport>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
