//! PairBar: one aligned observation of both legs.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Close prices of both assets at a single timestamp.
///
/// Produced by the aligner; both prices are finite by construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairBar {
    pub timestamp: NaiveDateTime,
    pub price1: f64,
    pub price2: f64,
}

impl PairBar {
    pub fn new(timestamp: NaiveDateTime, price1: f64, price2: f64) -> Self {
        Self {
            timestamp,
            price1,
            price2,
        }
    }

    /// Spread of the pair: asset1 minus asset2.
    pub fn spread(&self) -> f64 {
        self.price1 - self.price2
    }

    /// Returns true if either leg carries a non-finite price.
    pub fn is_void(&self) -> bool {
        !self.price1.is_finite() || !self.price2.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn spread_is_first_minus_second() {
        let bar = PairBar::new(ts(0), 105.5, 100.0);
        assert!((bar.spread() - 5.5).abs() < 1e-12);
    }

    #[test]
    fn nan_leg_is_void() {
        assert!(PairBar::new(ts(1), f64::NAN, 1.0).is_void());
        assert!(PairBar::new(ts(1), 1.0, f64::INFINITY).is_void());
        assert!(!PairBar::new(ts(1), 1.0, 2.0).is_void());
    }
}
