//! Pair screening: test every unordered pair in a symbol list for cointegration.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use pairlab_core::data::{align_pair, PriceProvider, PriceSeries};
use pairlab_core::stats::CointegrationTest;

/// One screened pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanEntry {
    pub asset1: String,
    pub asset2: String,
    pub p_value: f64,
    pub t_statistic: f64,
    pub hedge_ratio: f64,
    /// `p_value <= significance`.
    pub cointegrated: bool,
    /// Aligned bars the test ran on.
    pub bars: usize,
}

/// A pair that could not be tested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub asset1: String,
    pub asset2: String,
    pub reason: String,
}

/// Screening output: tested pairs by ascending p-value, plus the failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    pub significance: f64,
    pub entries: Vec<ScanEntry>,
    pub failures: Vec<ScanFailure>,
}

impl ScanReport {
    pub fn cointegrated(&self) -> impl Iterator<Item = &ScanEntry> {
        self.entries.iter().filter(|e| e.cointegrated)
    }
}

/// Every unordered pair of `symbols`, in list order. Repeated symbols are ignored.
pub fn pair_combinations(symbols: &[String]) -> Vec<(String, String)> {
    let mut unique: Vec<&String> = Vec::with_capacity(symbols.len());
    for s in symbols {
        if !unique.contains(&s) {
            unique.push(s);
        }
    }

    let mut pairs = Vec::new();
    for (i, a) in unique.iter().enumerate() {
        for b in &unique[i + 1..] {
            pairs.push(((*a).clone(), (*b).clone()));
        }
    }
    pairs
}

/// Fetch each symbol once, then align and test every pair in parallel.
///
/// A symbol that cannot be fetched, or a pair that cannot be aligned or tested,
/// becomes a [`ScanFailure`] rather than aborting the scan.
pub fn scan_pairs(
    provider: &dyn PriceProvider,
    tester: &dyn CointegrationTest,
    symbols: &[String],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    significance: f64,
) -> ScanReport {
    let pairs = pair_combinations(symbols);
    info!(
        symbols = symbols.len(),
        pairs = pairs.len(),
        provider = provider.name(),
        test = tester.name(),
        "screening pairs"
    );

    let fetched: Vec<(String, Result<PriceSeries, String>)> = symbols
        .par_iter()
        .map(|s| (s.clone(), provider.fetch(s).map_err(|e| e.to_string())))
        .collect();
    let lookup = |symbol: &str| {
        fetched
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, r)| r.clone())
            .unwrap_or_else(|| Err(format!("symbol '{symbol}' was not fetched")))
    };

    let outcomes: Vec<Result<ScanEntry, ScanFailure>> = pairs
        .par_iter()
        .map(|(a, b)| -> Result<ScanEntry, ScanFailure> {
            let fail = |reason: String| ScanFailure {
                asset1: a.clone(),
                asset2: b.clone(),
                reason,
            };
            let first = lookup(a).map_err(&fail)?;
            let second = lookup(b).map_err(&fail)?;
            let series = align_pair(&first, &second)
                .map_err(|e| fail(e.to_string()))?
                .between(start, end);
            let result = tester
                .test(&series.prices1(), &series.prices2())
                .map_err(|e| fail(e.to_string()))?;
            Ok(ScanEntry {
                asset1: a.clone(),
                asset2: b.clone(),
                p_value: result.p_value,
                t_statistic: result.t_statistic,
                hedge_ratio: result.hedge_ratio,
                cointegrated: result.is_cointegrated(significance),
                bars: series.len(),
            })
        })
        .collect();

    let mut report = ScanReport {
        significance,
        ..ScanReport::default()
    };
    for outcome in outcomes {
        match outcome {
            Ok(entry) => report.entries.push(entry),
            Err(failure) => {
                warn!(
                    pair = %format!("{}-{}", failure.asset1, failure.asset2),
                    reason = %failure.reason,
                    "pair skipped"
                );
                report.failures.push(failure);
            }
        }
    }
    report.entries.sort_by(|x, y| {
        x.p_value
            .partial_cmp(&y.p_value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    info!(
        tested = report.entries.len(),
        cointegrated = report.cointegrated().count(),
        failed = report.failures.len(),
        "screening complete"
    );
    report
}
