//! Statistical tests gating tradeability of a pair.

pub mod cointegration;
pub mod ols;

use thiserror::Error;

pub use cointegration::{
    adf_no_trend, mackinnon_crit, mackinnon_pvalue, CointegrationResult, CointegrationTest,
    CriticalValues, EngleGranger, DEFAULT_SIGNIFICANCE, MIN_OBSERVATIONS,
};
pub use ols::{ols, OlsFit};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("series length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("degenerate regression: {0}")]
    Degenerate(String),

    #[error("non-finite value in input")]
    NonFinite,

    #[error("unsupported: {0}")]
    Unsupported(String),
}
