//! Engle-Granger two-step cointegration test.
//!
//! 1. Regress asset 1 on a constant and asset 2; keep the residuals.
//! 2. Run an augmented Dickey-Fuller regression (no deterministic terms) on
//!    the residuals, picking the lag order by minimum AIC.
//! 3. Map the ADF t-statistic to an approximate p-value with MacKinnon's
//!    (1994) response surface for the constant-term case.
//!
//! A small p-value rejects "no cointegration": the spread mean-reverts.
//! An exact linear relation (R² within rounding of 1) skips the ADF step and
//! reports a statistic of −∞, p-value 0.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

use super::ols::{ols, OlsFit};
use super::StatsError;

/// Fewest observations the test will run on.
pub const MIN_OBSERVATIONS: usize = 20;

/// R² at or above `1 - PERFECT_FIT_TOLERANCE` counts as an exact linear fit.
/// Equals `100 * sqrt(f64::EPSILON)`.
const PERFECT_FIT_TOLERANCE: f64 = 1.490_116_119_384_765_6e-6;

/// Default significance level for the tradeability gate.
pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;

// MacKinnon (1994), constant term, rows for N = 1 and N = 2 series.
const TAU_MAX_C: [f64; 2] = [2.74, 0.92];
const TAU_MIN_C: [f64; 2] = [-18.83, -18.86];
const TAU_STAR_C: [f64; 2] = [-1.61, -2.62];
const TAU_C_SMALLP: [[f64; 3]; 2] = [[2.1659, 1.4412, 3.8269], [2.92, 1.5012, 3.9796]];
const SMALL_SCALING: [f64; 3] = [1.0, 1.0, 1e-2];
const TAU_C_LARGEP: [[f64; 4]; 2] = [
    [1.7339, 9.3202, -1.2745, -1.0368],
    [2.1945, 6.4695, -2.9198, -4.2377],
];
const LARGE_SCALING: [f64; 4] = [1.0, 1e-1, 1e-1, 1e-2];

// MacKinnon (2010) finite-sample critical values, constant term:
// crit = b0 + b1/T + b2/T^2 + b3/T^3 for the 1%, 5% and 10% levels.
const CRIT_C: [[[f64; 4]; 3]; 2] = [
    [
        [-3.43035, -6.5393, -16.786, -79.433],
        [-2.86154, -2.8903, -4.234, -40.040],
        [-2.56677, -1.5384, -2.809, 0.0],
    ],
    [
        [-3.89644, -10.9519, -33.527, 0.0],
        [-3.33613, -6.1101, -6.823, 0.0],
        [-3.04445, -4.2412, -2.720, 0.0],
    ],
];

/// Critical values of the test statistic at the usual levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

/// Outcome of a cointegration test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CointegrationResult {
    /// ADF t-statistic on the cointegrating residuals. −∞ for an exact fit,
    /// which JSON stores as `null`.
    #[serde(deserialize_with = "null_as_neg_infinity")]
    pub t_statistic: f64,
    /// Approximate p-value in `[0, 1]`.
    pub p_value: f64,
    pub critical_values: CriticalValues,
    /// Intercept of the cointegrating regression.
    pub intercept: f64,
    /// Slope of asset 1 on asset 2.
    pub hedge_ratio: f64,
    /// Augmentation lags chosen by AIC.
    pub used_lag: usize,
    pub nobs: usize,
}

impl CointegrationResult {
    pub fn is_cointegrated(&self, significance: f64) -> bool {
        self.p_value <= significance
    }
}

/// A two-series cointegration test.
pub trait CointegrationTest: Send + Sync {
    fn name(&self) -> &str;

    fn test(&self, series1: &[f64], series2: &[f64]) -> Result<CointegrationResult, StatsError>;
}

/// Engle-Granger with AIC lag selection, as in the common statistical packages.
#[derive(Debug, Clone, Default)]
pub struct EngleGranger {
    /// Upper bound on ADF augmentation lags. `None` uses `ceil(12 (n/100)^(1/4))`.
    pub max_lag: Option<usize>,
}

impl EngleGranger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_lag(max_lag: usize) -> Self {
        Self {
            max_lag: Some(max_lag),
        }
    }
}

impl CointegrationTest for EngleGranger {
    fn name(&self) -> &str {
        "engle_granger"
    }

    fn test(&self, series1: &[f64], series2: &[f64]) -> Result<CointegrationResult, StatsError> {
        if series1.len() != series2.len() {
            return Err(StatsError::LengthMismatch {
                left: series1.len(),
                right: series2.len(),
            });
        }
        let n = series1.len();
        if n < MIN_OBSERVATIONS {
            return Err(StatsError::InsufficientData {
                needed: MIN_OBSERVATIONS,
                got: n,
            });
        }
        if series1.iter().chain(series2).any(|v| !v.is_finite()) {
            return Err(StatsError::NonFinite);
        }

        let coint = ols(series1, &[vec![1.0; n], series2.to_vec()])?;
        let mean1 = series1.iter().sum::<f64>() / n as f64;
        let tss: f64 = series1.iter().map(|v| (v - mean1).powi(2)).sum();
        if tss <= 0.0 {
            return Err(StatsError::Degenerate("asset 1 is constant".into()));
        }
        let r_squared = 1.0 - coint.ssr / tss;
        let (t_statistic, used_lag) = if r_squared >= 1.0 - PERFECT_FIT_TOLERANCE {
            (f64::NEG_INFINITY, 0)
        } else {
            adf_no_trend(&coint.residuals, self.max_lag)?
        };
        let p_value = mackinnon_pvalue(t_statistic, 2)?;
        let critical_values = mackinnon_crit(2, n - 1)?;

        debug!(
            nobs = n,
            t_statistic,
            p_value,
            used_lag,
            r_squared,
            hedge_ratio = coint.coefficients[1],
            "engle-granger"
        );

        Ok(CointegrationResult {
            t_statistic,
            p_value,
            critical_values,
            intercept: coint.coefficients[0],
            hedge_ratio: coint.coefficients[1],
            used_lag,
            nobs: n,
        })
    }
}

/// ADF t-statistic on `x` without constant or trend, lag order by AIC.
///
/// Returns `(t_statistic, used_lag)`.
pub fn adf_no_trend(x: &[f64], max_lag: Option<usize>) -> Result<(f64, usize), StatsError> {
    let nobs = x.len();
    if nobs < 4 {
        return Err(StatsError::InsufficientData { needed: 4, got: nobs });
    }
    let default_lag = (12.0 * (nobs as f64 / 100.0).powf(0.25)).ceil() as usize;
    // The longest candidate must leave at least one residual degree of freedom.
    let max_lag = max_lag.unwrap_or(default_lag).min((nobs - 1) / 2 - 1);
    let diffs: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

    // Every candidate is fitted on the sample the longest lag allows.
    let mut best: Option<(f64, usize)> = None;
    for lag in 0..=max_lag {
        let fit = adf_regression(x, &diffs, lag, max_lag)?;
        let aic = fit.aic();
        if best.map_or(true, |(b, _)| aic < b) {
            best = Some((aic, lag));
        }
    }
    let used_lag = best.map_or(0, |(_, lag)| lag);

    let fit = adf_regression(x, &diffs, used_lag, used_lag)?;
    Ok((fit.t_stat(0), used_lag))
}

/// `Δx_t = γ x_{t-1} + Σ φ_i Δx_{t-i}` on the rows available after `skip` lags.
fn adf_regression(x: &[f64], diffs: &[f64], lag: usize, skip: usize) -> Result<OlsFit, StatsError> {
    let rows = skip..diffs.len();
    let y: Vec<f64> = rows.clone().map(|t| diffs[t]).collect();
    let mut columns = Vec::with_capacity(lag + 1);
    columns.push(rows.clone().map(|t| x[t]).collect::<Vec<f64>>());
    for i in 1..=lag {
        columns.push(rows.clone().map(|t| diffs[t - i]).collect());
    }
    ols(&y, &columns)
}

/// MacKinnon (1994) approximate p-value for a constant-term unit-root
/// statistic with `n_series` integrated series (1 = plain ADF, 2 = pair).
pub fn mackinnon_pvalue(stat: f64, n_series: usize) -> Result<f64, StatsError> {
    let idx = table_index(n_series)?;
    if stat.is_nan() {
        return Err(StatsError::NonFinite);
    }
    if stat > TAU_MAX_C[idx] {
        return Ok(1.0);
    }
    if stat < TAU_MIN_C[idx] {
        return Ok(0.0);
    }
    let z = if stat <= TAU_STAR_C[idx] {
        polynomial(&TAU_C_SMALLP[idx], &SMALL_SCALING, stat)
    } else {
        polynomial(&TAU_C_LARGEP[idx], &LARGE_SCALING, stat)
    };
    let normal =
        Normal::new(0.0, 1.0).map_err(|e| StatsError::Degenerate(format!("normal: {e}")))?;
    Ok(normal.cdf(z))
}

/// MacKinnon (2010) critical values for `nobs` observations.
pub fn mackinnon_crit(n_series: usize, nobs: usize) -> Result<CriticalValues, StatsError> {
    let idx = table_index(n_series)?;
    let inv = 1.0 / nobs.max(1) as f64;
    let at = |level: usize| {
        let b = CRIT_C[idx][level];
        b[0] + b[1] * inv + b[2] * inv.powi(2) + b[3] * inv.powi(3)
    };
    Ok(CriticalValues {
        one_pct: at(0),
        five_pct: at(1),
        ten_pct: at(2),
    })
}

fn null_as_neg_infinity<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<f64> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or(f64::NEG_INFINITY))
}

fn table_index(n_series: usize) -> Result<usize, StatsError> {
    match n_series {
        1 | 2 => Ok(n_series - 1),
        other => Err(StatsError::Unsupported(format!(
            "no MacKinnon table for {other} series"
        ))),
    }
}

fn polynomial(coef: &[f64], scaling: &[f64], x: f64) -> f64 {
    coef.iter()
        .zip(scaling)
        .enumerate()
        .map(|(i, (c, s))| c * s * x.powi(i as i32))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_walk(rng: &mut StdRng, n: usize) -> Vec<f64> {
        let mut level = 100.0_f64;
        (0..n)
            .map(|_| {
                level += rng.gen_range(-1.0..1.0);
                level
            })
            .collect()
    }

    #[test]
    fn pvalue_bounds_and_monotonicity() {
        assert_eq!(mackinnon_pvalue(5.0, 2).unwrap(), 1.0);
        assert_eq!(mackinnon_pvalue(-25.0, 2).unwrap(), 0.0);

        let mut prev = 0.0;
        for i in 0..=80 {
            let stat = -10.0 + 0.125 * i as f64;
            let p = mackinnon_pvalue(stat, 2).unwrap();
            assert!((0.0..=1.0).contains(&p));
            assert!(p + 1e-9 >= prev, "p-value must rise with the statistic");
            prev = p;
        }
    }

    #[test]
    fn pvalue_near_five_percent_at_critical_value() {
        let crit = mackinnon_crit(2, 10_000).unwrap();
        let p = mackinnon_pvalue(crit.five_pct, 2).unwrap();
        assert!((p - 0.05).abs() < 0.01, "got {p}");
    }

    #[test]
    fn pvalue_pieces_meet_at_tau_star() {
        for idx in 0..2 {
            let star = TAU_STAR_C[idx];
            let small = polynomial(&TAU_C_SMALLP[idx], &SMALL_SCALING, star);
            let large = polynomial(&TAU_C_LARGEP[idx], &LARGE_SCALING, star);
            assert!((small - large).abs() < 0.01);
        }
    }

    #[test]
    fn unsupported_series_count() {
        assert!(matches!(
            mackinnon_pvalue(-3.0, 3),
            Err(StatsError::Unsupported(_))
        ));
    }

    #[test]
    fn critical_values_are_ordered() {
        let crit = mackinnon_crit(2, 250).unwrap();
        assert!(crit.one_pct < crit.five_pct);
        assert!(crit.five_pct < crit.ten_pct);
    }

    #[test]
    fn cointegrated_pair_has_small_pvalue() {
        let mut rng = StdRng::seed_from_u64(42);
        let common = random_walk(&mut rng, 500);
        let b: Vec<f64> = common.clone();
        let a: Vec<f64> = common
            .iter()
            .map(|v| 1.5 * v + 10.0 + rng.gen_range(-1.0..1.0))
            .collect();

        let result = EngleGranger::new().test(&a, &b).unwrap();
        assert!(result.p_value < 0.01, "p = {}", result.p_value);
        assert!(result.is_cointegrated(DEFAULT_SIGNIFICANCE));
        assert!((result.hedge_ratio - 1.5).abs() < 0.05);
        assert!(result.t_statistic < result.critical_values.one_pct);
    }

    #[test]
    fn stationary_series_rejects_unit_root() {
        let mut rng = StdRng::seed_from_u64(3);
        let noise: Vec<f64> = (0..300).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let (stat, used_lag) = adf_no_trend(&noise, Some(0)).unwrap();
        assert_eq!(used_lag, 0);
        assert!(stat < -3.0, "stat = {stat}");
    }

    #[test]
    fn autolag_stays_past_five_percent_on_white_noise() {
        // -1.95 is the no-constant 5% critical value.
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let noise: Vec<f64> = (0..300).map(|_| rng.gen_range(-1.0..1.0)).collect();
            let (stat, used_lag) = adf_no_trend(&noise, None).unwrap();
            assert!(used_lag <= 16);
            assert!(stat < -1.95, "seed {seed}: stat = {stat}");
        }
    }

    #[test]
    fn exact_linear_pair_is_cointegrated() {
        let mut rng = StdRng::seed_from_u64(5);
        let b = random_walk(&mut rng, 300);
        for a in [
            b.iter().map(|v| v + 10.0).collect::<Vec<f64>>(),
            b.iter().map(|v| 2.0 * v).collect(),
        ] {
            let result = EngleGranger::new().test(&a, &b).unwrap();
            assert_eq!(result.t_statistic, f64::NEG_INFINITY);
            assert_eq!(result.p_value, 0.0);
            assert_eq!(result.used_lag, 0);
            assert!(result.is_cointegrated(DEFAULT_SIGNIFICANCE));
        }
    }

    #[test]
    fn exact_fit_survives_json() {
        let mut rng = StdRng::seed_from_u64(5);
        let b = random_walk(&mut rng, 100);
        let a: Vec<f64> = b.iter().map(|v| v + 10.0).collect();
        let result = EngleGranger::new().test(&a, &b).unwrap();
        let json = serde_json::to_string(&result).unwrap();
        let back: CointegrationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.t_statistic, f64::NEG_INFINITY);
        assert_eq!(back.p_value, 0.0);
    }

    #[test]
    fn minimum_observations_is_enough() {
        let mut rng = StdRng::seed_from_u64(9);
        let b = random_walk(&mut rng, MIN_OBSERVATIONS);
        let a: Vec<f64> = b.iter().map(|v| v + rng.gen_range(-1.0..1.0)).collect();
        let result = EngleGranger::new().test(&a, &b).unwrap();
        assert_eq!(result.nobs, MIN_OBSERVATIONS);
        assert!(result.used_lag <= (MIN_OBSERVATIONS - 1) / 2 - 1);
        assert!((0.0..=1.0).contains(&result.p_value));
    }

    #[test]
    fn constant_first_asset_is_degenerate() {
        let b: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let a = vec![5.0; 40];
        assert!(matches!(
            EngleGranger::new().test(&a, &b),
            Err(StatsError::Degenerate(_))
        ));
    }

    #[test]
    fn too_short_is_insufficient() {
        let a = vec![1.0; 10];
        let err = EngleGranger::new().test(&a, &a).unwrap_err();
        assert_eq!(err, StatsError::InsufficientData { needed: 20, got: 10 });
    }

    #[test]
    fn length_mismatch() {
        let err = EngleGranger::new()
            .test(&[1.0; 30], &[1.0; 31])
            .unwrap_err();
        assert!(matches!(err, StatsError::LengthMismatch { .. }));
    }

    #[test]
    fn constant_regressor_is_degenerate() {
        let a: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let b = vec![5.0; 40];
        assert!(matches!(
            EngleGranger::new().test(&a, &b),
            Err(StatsError::Degenerate(_))
        ));
    }
}
