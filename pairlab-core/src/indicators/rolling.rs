//! Trailing-window mean and sample standard deviation.
//!
//! Both return one value per input element. Positions before the window has
//! filled, and any window containing a NaN, are NaN.

/// Rolling mean over the trailing `window` values (inclusive of the current one).
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 || n < window {
        return result;
    }

    let mut sum: f64 = values[..window].iter().sum();
    result[window - 1] = sum / window as f64;

    for i in window..n {
        sum += values[i] - values[i - window];
        if sum.is_nan() {
            // Drop accumulated NaN once it has left the window.
            sum = values[i + 1 - window..=i].iter().sum();
        }
        result[i] = sum / window as f64;
    }
    result
}

/// Rolling sample standard deviation (n - 1 denominator).
///
/// Computed two-pass per window so a constant window yields exactly 0.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window < 2 || n < window {
        return result;
    }
    for (i, slot) in result.iter_mut().enumerate().skip(window - 1) {
        *slot = sample_std(&values[i + 1 - window..=i]);
    }
    result
}

fn sample_std(window: &[f64]) -> f64 {
    let len = window.len() as f64;
    let mean = window.iter().sum::<f64>() / len;
    let ss: f64 = window.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (len - 1.0)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn mean_basic() {
        let result = rolling_mean(&[10.0, 11.0, 12.0, 13.0, 14.0], 3);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert_approx(result[3], 12.0, DEFAULT_EPSILON);
        assert_approx(result[4], 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn std_basic() {
        let result = rolling_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8);
        // Sample std of the classic example: sqrt(32 / 7).
        assert_approx(result[7], (32.0_f64 / 7.0).sqrt(), DEFAULT_EPSILON);
        assert!(result[..7].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn constant_window_has_zero_std() {
        let result = rolling_std(&[3.0; 6], 4);
        assert_eq!(result[3], 0.0);
        assert_eq!(result[5], 0.0);
    }

    #[test]
    fn nan_leaves_the_window() {
        let result = rolling_mean(&[1.0, f64::NAN, 3.0, 4.0, 5.0, 6.0], 2);
        assert!(result[1].is_nan());
        assert!(result[2].is_nan());
        assert_approx(result[3], 3.5, DEFAULT_EPSILON);
        assert_approx(result[5], 5.5, DEFAULT_EPSILON);
    }

    #[test]
    fn window_longer_than_input_is_all_nan() {
        assert!(rolling_mean(&[1.0, 2.0], 5).iter().all(|v| v.is_nan()));
        assert!(rolling_std(&[1.0, 2.0], 5).iter().all(|v| v.is_nan()));
    }
}
