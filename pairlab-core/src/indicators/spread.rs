//! Spread analysis: rolling z-score of asset1 − asset2 plus per-asset rolling stats.
//!
//! z[i] = (spread[i] − mean[i]) / max(std[i], ε), with ε = 1e-8. A std that is
//! zero, below ε, or NaN (window not yet filled) is replaced by ε before the
//! division, so the denominator is never zero. The z-score itself is still NaN
//! while the rolling mean is NaN; such bars are not ready and are dropped
//! before simulation.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::rolling::{rolling_mean, rolling_std};
use crate::domain::PairSeries;

/// Floor applied to the spread std before it divides anything.
pub const STD_EPSILON: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpreadError {
    #[error("window must be at least 2, got {0}")]
    InvalidWindow(usize),
}

/// Per-bar spread statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadSnapshot {
    pub spread: f64,
    pub spread_mean: f64,
    /// Rolling spread std after the ε floor; this is the z-score denominator.
    pub spread_std: f64,
    pub z_score: f64,
    pub asset1_mean: f64,
    pub asset1_std: f64,
    pub asset2_mean: f64,
    pub asset2_std: f64,
}

impl SpreadSnapshot {
    /// All rolling statistics are defined (the window has filled).
    pub fn is_ready(&self) -> bool {
        [
            self.spread,
            self.spread_mean,
            self.spread_std,
            self.z_score,
            self.asset1_mean,
            self.asset1_std,
            self.asset2_mean,
            self.asset2_std,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Floor a std so it can safely divide.
pub fn floor_std(std: f64) -> f64 {
    if std.is_nan() || std < STD_EPSILON {
        STD_EPSILON
    } else {
        std
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpreadAnalyzer {
    window: usize,
}

impl SpreadAnalyzer {
    pub fn new(window: usize) -> Result<Self, SpreadError> {
        if window < 2 {
            return Err(SpreadError::InvalidWindow(window));
        }
        Ok(Self { window })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Bars before the first ready snapshot.
    pub fn lookback(&self) -> usize {
        self.window - 1
    }

    /// One snapshot per bar of `series`.
    pub fn analyze(&self, series: &PairSeries) -> Vec<SpreadSnapshot> {
        let w = self.window;
        let spread = series.spreads();
        let prices1 = series.prices1();
        let prices2 = series.prices2();

        if series.len() < w {
            warn!(
                pair = %series.name(),
                bars = series.len(),
                window = w,
                "window longer than series; no bar will have rolling statistics"
            );
        }

        let spread_mean = rolling_mean(&spread, w);
        let spread_std = rolling_std(&spread, w);
        let asset1_mean = rolling_mean(&prices1, w);
        let asset1_std = rolling_std(&prices1, w);
        let asset2_mean = rolling_mean(&prices2, w);
        let asset2_std = rolling_std(&prices2, w);

        let snapshots: Vec<SpreadSnapshot> = (0..series.len())
            .map(|i| {
                let std_used = floor_std(spread_std[i]);
                SpreadSnapshot {
                    spread: spread[i],
                    spread_mean: spread_mean[i],
                    spread_std: std_used,
                    z_score: (spread[i] - spread_mean[i]) / std_used,
                    asset1_mean: asset1_mean[i],
                    asset1_std: asset1_std[i],
                    asset2_mean: asset2_mean[i],
                    asset2_std: asset2_std[i],
                }
            })
            .collect();

        debug!(
            bars = snapshots.len(),
            ready = snapshots.iter().filter(|s| s.is_ready()).count(),
            window = w,
            "spread analyzed"
        );
        snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PairBar;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::NaiveDate;

    fn pair(p1: &[f64], p2: &[f64]) -> PairSeries {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let bars = p1
            .iter()
            .zip(p2)
            .enumerate()
            .map(|(i, (&a, &b))| PairBar::new(base + chrono::Duration::minutes(5 * i as i64), a, b))
            .collect();
        PairSeries::new("A", "B", bars).unwrap()
    }

    #[test]
    fn rejects_window_below_two() {
        assert_eq!(SpreadAnalyzer::new(1), Err(SpreadError::InvalidWindow(1)));
        assert!(SpreadAnalyzer::new(2).is_ok());
    }

    #[test]
    fn z_score_matches_hand_computation() {
        let series = pair(&[10.0, 12.0, 11.0, 15.0], &[1.0, 1.0, 1.0, 1.0]);
        let snaps = SpreadAnalyzer::new(3).unwrap().analyze(&series);

        // Window at i=3: spreads 11, 10, 14 → mean 35/3, sample std sqrt(26/3 / 2)
        let mean = 35.0_f64 / 3.0;
        let var = ((11.0 - mean).powi(2) + (10.0 - mean).powi(2) + (14.0 - mean).powi(2)) / 2.0;
        let z = (14.0 - mean) / var.sqrt();
        assert_approx(snaps[3].spread, 14.0, DEFAULT_EPSILON);
        assert_approx(snaps[3].spread_mean, mean, DEFAULT_EPSILON);
        assert_approx(snaps[3].z_score, z, DEFAULT_EPSILON);
        assert_approx(snaps[3].asset2_mean, 1.0, DEFAULT_EPSILON);
        assert_eq!(snaps[3].asset2_std, 0.0);
    }

    #[test]
    fn warmup_bars_are_not_ready_but_std_is_floored() {
        let series = pair(&[10.0, 12.0, 11.0, 15.0], &[1.0, 2.0, 3.0, 4.0]);
        let snaps = SpreadAnalyzer::new(3).unwrap().analyze(&series);
        assert!(!snaps[0].is_ready());
        assert!(!snaps[1].is_ready());
        assert!(snaps[2].is_ready());
        assert_eq!(snaps[0].spread_std, STD_EPSILON);
        assert!(snaps[0].z_score.is_nan());
    }

    #[test]
    fn constant_spread_uses_epsilon() {
        let series = pair(&[5.0, 6.0, 7.0, 8.0], &[1.0, 2.0, 3.0, 4.0]);
        let snaps = SpreadAnalyzer::new(2).unwrap().analyze(&series);
        for snap in &snaps[1..] {
            assert_eq!(snap.spread_std, STD_EPSILON);
            assert_eq!(snap.z_score, 0.0);
            assert!(snap.is_ready());
        }
    }

    #[test]
    fn window_longer_than_series_yields_no_ready_bar() {
        let series = pair(&[1.0, 2.0, 3.0], &[1.0, 1.0, 1.0]);
        let snaps = SpreadAnalyzer::new(10).unwrap().analyze(&series);
        assert_eq!(snaps.len(), 3);
        assert!(snaps.iter().all(|s| !s.is_ready()));
    }

    #[test]
    fn floor_std_cases() {
        assert_eq!(floor_std(0.0), STD_EPSILON);
        assert_eq!(floor_std(f64::NAN), STD_EPSILON);
        assert_eq!(floor_std(1e-12), STD_EPSILON);
        assert_eq!(floor_std(0.5), 0.5);
    }
}
