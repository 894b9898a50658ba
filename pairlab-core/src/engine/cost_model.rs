//! Cost model: proportional fee per leg and the round-trip profitability gate.
//!
//! Fees are directional: a buyer pays `price × (1 + fee)`, a seller receives
//! `price × (1 − fee)`. An entry is worthwhile only if the expected round trip
//! still clears both legs' fees.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CostModelError {
    #[error("invalid side '{0}': expected 'buy' or 'sell'")]
    InvalidSide(String),

    #[error("fee rate must be in [0, 1), got {0}")]
    InvalidFeeRate(f64),
}

/// Direction of a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl FromStr for Side {
    type Err = CostModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err(CostModelError::InvalidSide(s.to_string())),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("buy"),
            Side::Sell => f.write_str("sell"),
        }
    }
}

/// Decides whether opening a leg is allowed.
///
/// Consulted only when a new position would be opened; an open position is
/// never re-evaluated.
pub trait EntryGate: Send + Sync {
    fn allows(&self, current_price: f64, expected_price: f64, side: Side) -> bool;
}

/// Proportional transaction cost, charged on every leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub fee_rate: f64,
}

impl CostModel {
    pub fn new(fee_rate: f64) -> Result<Self, CostModelError> {
        if !(0.0..1.0).contains(&fee_rate) {
            return Err(CostModelError::InvalidFeeRate(fee_rate));
        }
        Ok(Self { fee_rate })
    }

    pub fn frictionless() -> Self {
        Self { fee_rate: 0.0 }
    }

    /// Does the round trip from `current_price` to `expected_price` clear fees?
    ///
    /// - Buy: `expected × (1 − fee) > current × (1 + fee)`
    /// - Sell: `current × (1 − fee) > expected × (1 + fee)`
    pub fn worthwhile(&self, current_price: f64, expected_price: f64, side: Side) -> bool {
        let f = self.fee_rate;
        match side {
            Side::Buy => expected_price * (1.0 - f) > current_price * (1.0 + f),
            Side::Sell => current_price * (1.0 - f) > expected_price * (1.0 + f),
        }
    }

    /// String-sided variant for callers holding an unparsed side.
    pub fn worthwhile_str(
        &self,
        current_price: f64,
        expected_price: f64,
        side: &str,
    ) -> Result<bool, CostModelError> {
        let side: Side = side.parse()?;
        Ok(self.worthwhile(current_price, expected_price, side))
    }

    /// Price actually paid (buy) or received (sell) after the fee.
    pub fn fill_price(&self, price: f64, side: Side) -> f64 {
        match side {
            Side::Buy => price * (1.0 + self.fee_rate),
            Side::Sell => price * (1.0 - self.fee_rate),
        }
    }
}

impl EntryGate for CostModel {
    fn allows(&self, current_price: f64, expected_price: f64, side: Side) -> bool {
        self.worthwhile(current_price, expected_price, side)
    }
}

/// Fee-naive gate: every entry the z-score asks for is taken.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAllow;

impl EntryGate for AlwaysAllow {
    fn allows(&self, _current_price: f64, _expected_price: f64, _side: Side) -> bool {
        true
    }
}
