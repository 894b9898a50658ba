//! Ordinary least squares via the normal equations.
//!
//! Design matrices here are tiny (at most a constant, one level column and a
//! handful of lagged differences), so an explicit Gauss-Jordan inverse of
//! X'X is both adequate and gives the coefficient covariance for free.

use super::StatsError;

/// Result of an OLS fit.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub residuals: Vec<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    pub nobs: usize,
}

impl OlsFit {
    /// t-statistic of coefficient `j`.
    pub fn t_stat(&self, j: usize) -> f64 {
        self.coefficients[j] / self.std_errors[j]
    }

    /// Akaike information criterion up to an additive constant that only
    /// depends on `nobs`. Comparable across fits on the same sample.
    pub fn aic(&self) -> f64 {
        let n = self.nobs as f64;
        let k = self.coefficients.len() as f64;
        n * (self.ssr.max(f64::MIN_POSITIVE) / n).ln() + 2.0 * k
    }
}

/// Regress `y` on the given regressor columns (no implicit constant).
pub fn ols(y: &[f64], columns: &[Vec<f64>]) -> Result<OlsFit, StatsError> {
    let n = y.len();
    let k = columns.len();
    if k == 0 {
        return Err(StatsError::Degenerate("no regressors".into()));
    }
    if let Some(col) = columns.iter().find(|c| c.len() != n) {
        return Err(StatsError::LengthMismatch {
            left: n,
            right: col.len(),
        });
    }
    if n <= k {
        return Err(StatsError::InsufficientData { needed: k + 1, got: n });
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for i in 0..k {
        for j in i..k {
            let dot: f64 = columns[i].iter().zip(&columns[j]).map(|(a, b)| a * b).sum();
            xtx[i][j] = dot;
            xtx[j][i] = dot;
        }
        xty[i] = columns[i].iter().zip(y).map(|(a, b)| a * b).sum();
    }

    let inv = invert(xtx)?;
    let coefficients: Vec<f64> = inv
        .iter()
        .map(|row| row.iter().zip(&xty).map(|(a, b)| a * b).sum())
        .collect();

    let residuals: Vec<f64> = (0..n)
        .map(|t| {
            let fitted: f64 = columns
                .iter()
                .zip(&coefficients)
                .map(|(col, beta)| col[t] * beta)
                .sum();
            y[t] - fitted
        })
        .collect();
    let ssr: f64 = residuals.iter().map(|r| r * r).sum();
    let sigma2 = ssr / (n - k) as f64;
    let std_errors = (0..k).map(|j| (sigma2 * inv[j][j]).sqrt()).collect();

    Ok(OlsFit {
        coefficients,
        std_errors,
        residuals,
        ssr,
        nobs: n,
    })
}

/// Gauss-Jordan inverse with partial pivoting.
fn invert(mut a: Vec<Vec<f64>>) -> Result<Vec<Vec<f64>>, StatsError> {
    let k = a.len();
    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |m, v| m.max(v.abs()));
    if !scale.is_finite() {
        return Err(StatsError::NonFinite);
    }
    let tol = scale * 1e-12;
    let mut inv: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..k {
        let pivot = (col..k)
            .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() <= tol {
            return Err(StatsError::Degenerate("singular design matrix".into()));
        }
        a.swap(col, pivot);
        inv.swap(col, pivot);

        let p = a[col][col];
        for j in 0..k {
            a[col][j] /= p;
            inv[col][j] /= p;
        }
        for row in 0..k {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..k {
                a[row][j] -= factor * a[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }
    Ok(inv)
}
