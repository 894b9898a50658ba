//! Rolling indicators over aligned pair data.
//!
//! Everything here is a pure window-local computation, precomputed once for
//! the whole series before the sequential signal pass begins.

pub mod rolling;
pub mod spread;

pub use rolling::{rolling_mean, rolling_std};
pub use spread::{floor_std, SpreadAnalyzer, SpreadError, SpreadSnapshot, STD_EPSILON};

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
