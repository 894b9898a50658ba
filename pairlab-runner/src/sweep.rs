//! Parameter sweep over signal thresholds, window and fee rate for one pair.

use rayon::prelude::*;
use tracing::info;

use pairlab_core::stats::{CointegrationResult, CointegrationTest};

use crate::config::BacktestConfig;
use crate::data_loader::LoadedPair;
use crate::runner::{run_ungated, test_pair, BacktestResult, RunError};

/// Parameter grid.
///
/// Defines the values for each parameter to sweep over.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepGrid {
    pub entry_thresholds: Vec<f64>,
    pub exit_thresholds: Vec<f64>,
    pub windows: Vec<usize>,
    pub fee_rates: Vec<f64>,
}

impl SweepGrid {
    /// A small grid around the default strategy.
    ///
    /// Entry: 1.5, 2.0, 2.5. Exit: 0.1, 0.3, 0.5. Window: 30, 60, 120.
    pub fn default_grid(fee_rate: f64) -> Self {
        Self {
            entry_thresholds: vec![1.5, 2.0, 2.5],
            exit_thresholds: vec![0.1, 0.3, 0.5],
            windows: vec![30, 60, 120],
            fee_rates: vec![fee_rate],
        }
    }

    /// Returns the number of raw grid points, before invalid combinations are skipped.
    pub fn size(&self) -> usize {
        self.entry_thresholds.len()
            * self.exit_thresholds.len()
            * self.windows.len()
            * self.fee_rates.len()
    }

    /// Generates all configurations in the grid.
    ///
    /// Combinations whose exit threshold is not below the entry threshold are skipped.
    pub fn generate_configs(&self, base: &BacktestConfig) -> Vec<BacktestConfig> {
        let mut configs = Vec::new();

        for &entry in &self.entry_thresholds {
            for &exit in &self.exit_thresholds {
                if exit >= entry {
                    continue;
                }
                for &window in &self.windows {
                    for &fee_rate in &self.fee_rates {
                        let mut config = base.clone();
                        config.strategy.entry_threshold = entry;
                        config.strategy.exit_threshold = exit;
                        config.strategy.window = window;
                        config.costs.fee_rate = fee_rate;
                        configs.push(config);
                    }
                }
            }
        }

        configs
    }
}

/// Results from a parameter sweep, sorted by Sharpe descending.
#[derive(Debug, Clone)]
pub struct SweepResults {
    results: Vec<BacktestResult>,
    cointegration: Option<CointegrationResult>,
}

impl SweepResults {
    fn new(mut results: Vec<BacktestResult>, cointegration: Option<CointegrationResult>) -> Self {
        results.sort_by(|a, b| {
            b.sharpe
                .partial_cmp(&a.sharpe)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self {
            results,
            cointegration,
        }
    }

    /// All results, best Sharpe first.
    pub fn all(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// The gate's verdict, shared by every grid point. `None` when the gate was disabled.
    pub fn cointegration(&self) -> Option<&CointegrationResult> {
        self.cointegration.as_ref()
    }

    /// Gets a result by run id.
    pub fn get(&self, run_id: &str) -> Option<&BacktestResult> {
        self.results.iter().find(|r| r.run_id == run_id)
    }

    pub fn top_n(&self, n: usize) -> &[BacktestResult] {
        &self.results[..n.min(self.results.len())]
    }

    pub fn best(&self) -> Option<&BacktestResult> {
        self.results.first()
    }
}

/// Either the sweep results or the gate's rejection of the pair.
#[derive(Debug, Clone)]
pub enum SweepOutcome {
    NotCointegrated {
        pair: String,
        p_value: f64,
        significance: f64,
    },
    Completed(SweepResults),
}

/// Run every grid point against one pre-loaded pair, in parallel.
///
/// The cointegration gate depends only on prices, so it runs once for the
/// whole grid using `base`'s gate settings.
pub fn run_sweep(
    grid: &SweepGrid,
    base: &BacktestConfig,
    loaded: &LoadedPair,
    tester: &dyn CointegrationTest,
) -> Result<SweepOutcome, RunError> {
    base.validate()?;

    let cointegration = if base.cointegration.enabled {
        let result = test_pair(&loaded.series, tester)?;
        let significance = base.cointegration.significance;
        if !result.is_cointegrated(significance) {
            info!(
                pair = %loaded.series.name(),
                p_value = result.p_value,
                significance,
                "pair is not cointegrated; sweep skipped"
            );
            return Ok(SweepOutcome::NotCointegrated {
                pair: loaded.series.name(),
                p_value: result.p_value,
                significance,
            });
        }
        Some(result)
    } else {
        None
    };

    let configs = grid.generate_configs(base);
    info!(
        pair = %loaded.series.name(),
        configs = configs.len(),
        "starting parameter sweep"
    );

    let results = configs
        .par_iter()
        .map(|config| {
            config.validate()?;
            run_ungated(config, loaded, cointegration.clone())
        })
        .collect::<Result<Vec<_>, RunError>>()?;

    Ok(SweepOutcome::Completed(SweepResults::new(
        results,
        cointegration,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::load_pair;
    use pairlab_core::data::SyntheticProvider;
    use pairlab_core::stats::{CriticalValues, StatsError};

    struct FixedPValue(f64);

    impl CointegrationTest for FixedPValue {
        fn name(&self) -> &str {
            "fixed"
        }

        fn test(&self, a: &[f64], _b: &[f64]) -> Result<CointegrationResult, StatsError> {
            Ok(CointegrationResult {
                t_statistic: -4.0,
                p_value: self.0,
                critical_values: CriticalValues {
                    one_pct: -3.9,
                    five_pct: -3.3,
                    ten_pct: -3.0,
                },
                intercept: 0.0,
                hedge_ratio: 1.0,
                used_lag: 0,
                nobs: a.len(),
            })
        }
    }

    fn loaded() -> LoadedPair {
        load_pair(&SyntheticProvider::new(11, 400), "AAA", "BBB", None, None).unwrap()
    }

    fn grid() -> SweepGrid {
        SweepGrid {
            entry_thresholds: vec![1.0, 2.0],
            exit_thresholds: vec![0.3, 1.5],
            windows: vec![20, 40],
            fee_rates: vec![0.0, 0.001],
        }
    }

    #[test]
    fn grid_size_counts_raw_points() {
        assert_eq!(grid().size(), 16);
        assert_eq!(SweepGrid::default_grid(0.01).size(), 27);
    }

    #[test]
    fn grid_skips_exit_at_or_above_entry() {
        let base = BacktestConfig::for_pair("AAA", "BBB");
        let configs = grid().generate_configs(&base);
        // (1.0, 1.5) is skipped: 3 threshold pairs × 2 windows × 2 fees
        assert_eq!(configs.len(), 12);
        for c in &configs {
            assert!(c.strategy.exit_threshold < c.strategy.entry_threshold);
            assert_eq!(c.pair, base.pair);
        }
    }

    #[test]
    fn sweep_is_sorted_by_sharpe() {
        let base = BacktestConfig::for_pair("AAA", "BBB");
        let outcome = run_sweep(&grid(), &base, &loaded(), &FixedPValue(0.01)).unwrap();
        let SweepOutcome::Completed(results) = outcome else {
            panic!("gate should pass");
        };
        assert_eq!(results.len(), 12);
        for pair in results.all().windows(2) {
            assert!(pair[0].sharpe >= pair[1].sharpe);
        }
        assert_eq!(results.best().map(|r| r.sharpe), Some(results.all()[0].sharpe));
        assert_eq!(results.top_n(100).len(), 12);
        assert_eq!(results.cointegration().map(|c| c.p_value), Some(0.01));
        let first = &results.all()[0];
        assert!(results.get(&first.run_id).is_some());
    }

    #[test]
    fn rejected_pair_skips_the_grid() {
        let base = BacktestConfig::for_pair("AAA", "BBB");
        let outcome = run_sweep(&grid(), &base, &loaded(), &FixedPValue(0.6)).unwrap();
        assert!(matches!(
            outcome,
            SweepOutcome::NotCointegrated { p_value, .. } if p_value == 0.6
        ));
    }

    #[test]
    fn invalid_grid_point_is_an_error() {
        let mut base = BacktestConfig::for_pair("AAA", "BBB");
        base.cointegration.enabled = false;
        let bad = SweepGrid {
            windows: vec![1],
            ..grid()
        };
        let err = run_sweep(&bad, &base, &loaded(), &FixedPValue(0.01)).unwrap_err();
        assert!(matches!(err, RunError::Config(_)));
    }

    #[test]
    fn sweep_matches_individual_runs() {
        let mut base = BacktestConfig::for_pair("AAA", "BBB");
        base.cointegration.enabled = false;
        let data = loaded();
        let SweepOutcome::Completed(results) =
            run_sweep(&grid(), &base, &data, &FixedPValue(0.01)).unwrap()
        else {
            panic!("gate disabled");
        };
        for r in results.all() {
            let single = run_ungated(&r.config, &data, None).unwrap();
            assert_eq!(single.final_capital, r.final_capital);
            assert_eq!(single.trades.len(), r.trades.len());
        }
    }
}
