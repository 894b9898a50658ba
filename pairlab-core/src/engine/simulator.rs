//! Trade simulator: walks the signal rows and realizes pair trades.
//!
//! Single sequential pass. Row 0 only seeds capital. From row 1 on:
//! - flat and the label is not Neutral → open at this row's fee-adjusted prices
//! - open and the label is Neutral → close, compound capital by the trade return
//! - otherwise capital carries forward
//!
//! A label that flips straight from one side to the other does not close the
//! open trade; only a Neutral label does.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cost_model::{CostModel, Side};
use super::signal::SignalRow;
use crate::domain::{PairBar, Position, Trade};

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;

/// Capital after processing one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalPoint {
    pub timestamp: NaiveDateTime,
    pub capital: f64,
}

/// A position opened but not closed by the final row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub kind: Position,
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price1: f64,
    pub entry_price2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// One point per input row.
    pub capital_curve: Vec<CapitalPoint>,
    /// One slot per input row; `Some` only where a trade closed.
    pub trade_returns: Vec<Option<f64>>,
    pub trades: Vec<Trade>,
    pub initial_capital: f64,
    pub final_capital: f64,
    /// `final_capital / initial_capital − 1`.
    pub total_return: f64,
    pub open_position: Option<OpenPosition>,
}

impl SimulationResult {
    /// Realized per-trade returns with the empty slots removed.
    pub fn realized_returns(&self) -> Vec<f64> {
        self.trade_returns.iter().flatten().copied().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeSimulator {
    pub cost: CostModel,
    pub initial_capital: f64,
}

impl TradeSimulator {
    pub fn new(cost: CostModel, initial_capital: f64) -> Self {
        Self {
            cost,
            initial_capital,
        }
    }

    /// Fee-adjusted entry prices `(asset1, asset2)` for opening `kind`.
    pub fn entry_prices(&self, kind: Position, bar: &PairBar) -> (f64, f64) {
        let (side1, side2) = legs(kind);
        (
            self.cost.fill_price(bar.price1, side1),
            self.cost.fill_price(bar.price2, side2),
        )
    }

    /// Fee-adjusted exit prices `(asset1, asset2)` for closing `kind`.
    pub fn exit_prices(&self, kind: Position, bar: &PairBar) -> (f64, f64) {
        let (side1, side2) = legs(kind);
        (
            self.cost.fill_price(bar.price1, side1.opposite()),
            self.cost.fill_price(bar.price2, side2.opposite()),
        )
    }

    pub fn run(&self, rows: &[SignalRow]) -> SimulationResult {
        let mut capital = self.initial_capital;
        let mut capital_curve = Vec::with_capacity(rows.len());
        let mut trade_returns = Vec::with_capacity(rows.len());
        let mut trades = Vec::new();
        let mut open: Option<OpenPosition> = None;

        for (i, row) in rows.iter().enumerate() {
            let mut closed_return = None;

            if i > 0 {
                match open {
                    None if !row.position.is_neutral() => {
                        let (p1, p2) = self.entry_prices(row.position, &row.bar);
                        open = Some(OpenPosition {
                            kind: row.position,
                            entry_index: i,
                            entry_time: row.bar.timestamp,
                            entry_price1: p1,
                            entry_price2: p2,
                        });
                    }
                    Some(pos) if row.position.is_neutral() => {
                        let trade = self.close(&pos, i, &row.bar);
                        capital *= 1.0 + trade.return_pct;
                        closed_return = Some(trade.return_pct);
                        trades.push(trade);
                        open = None;
                    }
                    _ => {}
                }
            }

            capital_curve.push(CapitalPoint {
                timestamp: row.bar.timestamp,
                capital,
            });
            trade_returns.push(closed_return);
        }

        let total_return = capital / self.initial_capital - 1.0;
        debug!(
            rows = rows.len(),
            trades = trades.len(),
            final_capital = capital,
            still_open = open.is_some(),
            "simulation finished"
        );

        SimulationResult {
            capital_curve,
            trade_returns,
            trades,
            initial_capital: self.initial_capital,
            final_capital: capital,
            total_return,
            open_position: open,
        }
    }

    fn close(&self, pos: &OpenPosition, index: usize, bar: &PairBar) -> Trade {
        let (exit1, exit2) = self.exit_prices(pos.kind, bar);
        let ret1 = exit1 / pos.entry_price1 - 1.0;
        let ret2 = exit2 / pos.entry_price2 - 1.0;
        let return_pct = match pos.kind {
            Position::Long1Short2 => ret1 - ret2,
            Position::Short1Long2 => ret2 - ret1,
            Position::Neutral => 0.0,
        };

        Trade {
            kind: pos.kind,
            entry_index: pos.entry_index,
            entry_time: pos.entry_time,
            entry_price1: pos.entry_price1,
            entry_price2: pos.entry_price2,
            exit_index: index,
            exit_time: bar.timestamp,
            exit_price1: exit1,
            exit_price2: exit2,
            return_pct,
        }
    }
}

impl Default for TradeSimulator {
    fn default() -> Self {
        Self::new(CostModel::frictionless(), DEFAULT_INITIAL_CAPITAL)
    }
}

/// Entry sides of (asset1, asset2) for a position kind.
fn legs(kind: Position) -> (Side, Side) {
    match kind {
        Position::Short1Long2 => (Side::Sell, Side::Buy),
        // Neutral never reaches a fill; map it like the long-first pair.
        Position::Long1Short2 | Position::Neutral => (Side::Buy, Side::Sell),
    }
}
