//! Signal generation: the per-bar position state machine.
//!
//! The position at bar i depends only on the position at bar i−1, the spread
//! snapshot at bar i and the entry gate. Three rules are applied in a fixed
//! order every bar, each free to overwrite the previous one:
//!
//! 1. z > +entry and selling asset 1 toward its mean clears fees → `Short1Long2`
//! 2. z < −entry and buying asset 1 toward its mean clears fees → `Long1Short2`
//! 3. exit_floor < z < exit → `Neutral`
//!
//! Rule 3 runs last, so it wins on any bar where its band holds.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cost_model::{EntryGate, Side};
use crate::domain::{PairBar, PairSeries, Position};
use crate::indicators::SpreadSnapshot;

/// Lower edge of the exit band used by the reference strategy.
pub const DEFAULT_EXIT_FLOOR: f64 = -0.5;

/// Thresholds for the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalParams {
    pub entry_threshold: f64,
    pub exit_threshold: f64,
    #[serde(default = "default_exit_floor")]
    pub exit_floor: f64,
    /// Reserved. Carried through configuration, never consulted.
    #[serde(default)]
    pub stop_loss: f64,
    /// Reserved. Carried through configuration, never consulted.
    #[serde(default)]
    pub cooldown: usize,
}

fn default_exit_floor() -> f64 {
    DEFAULT_EXIT_FLOOR
}

impl SignalParams {
    pub fn new(entry_threshold: f64, exit_threshold: f64) -> Self {
        Self {
            entry_threshold,
            exit_threshold,
            exit_floor: DEFAULT_EXIT_FLOOR,
            stop_loss: 0.0,
            cooldown: 0,
        }
    }
}

impl Default for SignalParams {
    fn default() -> Self {
        Self::new(2.0, 0.3)
    }
}

/// One bar of the signal trace: prices, statistics, and the resulting label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub bar: PairBar,
    pub snapshot: SpreadSnapshot,
    pub position: Position,
}

impl SignalRow {
    pub fn is_ready(&self) -> bool {
        self.snapshot.is_ready()
    }
}

/// Pure transition: the position after observing one bar.
///
/// A NaN z-score fails every comparison, so warm-up bars leave `prev` as is.
pub fn next_position(
    prev: Position,
    snapshot: &SpreadSnapshot,
    price1: f64,
    params: &SignalParams,
    gate: &dyn EntryGate,
) -> Position {
    let z = snapshot.z_score;
    let mut position = prev;

    if z > params.entry_threshold && gate.allows(price1, snapshot.asset1_mean, Side::Sell) {
        position = Position::Short1Long2;
    }
    if z < -params.entry_threshold && gate.allows(price1, snapshot.asset1_mean, Side::Buy) {
        position = Position::Long1Short2;
    }
    if params.exit_floor < z && z < params.exit_threshold {
        position = Position::Neutral;
    }
    position
}

/// Fold [`next_position`] over every bar, starting from `Neutral`.
///
/// Returns one row per bar, warm-up bars included; use [`usable_rows`] to drop
/// the ones without rolling statistics.
pub fn generate_signals(
    series: &PairSeries,
    snapshots: &[SpreadSnapshot],
    params: &SignalParams,
    gate: &dyn EntryGate,
) -> Vec<SignalRow> {
    let mut position = Position::Neutral;
    let rows: Vec<SignalRow> = series
        .bars()
        .iter()
        .zip(snapshots)
        .map(|(bar, snapshot)| {
            position = next_position(position, snapshot, bar.price1, params, gate);
            SignalRow {
                bar: *bar,
                snapshot: *snapshot,
                position,
            }
        })
        .collect();

    debug!(
        bars = rows.len(),
        non_neutral = rows.iter().filter(|r| !r.position.is_neutral()).count(),
        "signals generated"
    );
    rows
}

/// Rows whose rolling statistics are all defined.
pub fn usable_rows(rows: &[SignalRow]) -> Vec<SignalRow> {
    rows.iter().copied().filter(SignalRow::is_ready).collect()
}
