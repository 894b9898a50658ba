//! Trade: a closed pair round trip.

use super::position::Position;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A completed pair trade: entry → exit (first bar back at Neutral).
///
/// Prices are fee-adjusted fill prices, already moved against the trader
/// on every leg. `return_pct` is the realized return of the whole pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub kind: Position,

    // ── Entry ──
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price1: f64,
    pub entry_price2: f64,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price1: f64,
    pub exit_price2: f64,

    pub return_pct: f64,
}

impl Trade {
    pub fn bars_held(&self) -> usize {
        self.exit_index.saturating_sub(self.entry_index)
    }

    pub fn is_winner(&self) -> bool {
        self.return_pct > 0.0
    }
}
