//! Backtesting engine: cost model, signal state machine and trade simulator.
//!
//! The engine consumes precomputed spread snapshots and runs two sequential
//! passes over them:
//!
//! 1. Signal pass: fold the pure transition over every bar → one label per bar
//! 2. Simulation pass: open and close pair trades on label changes, compound capital

pub mod cost_model;
pub mod signal;
pub mod simulator;

pub use cost_model::{AlwaysAllow, CostModel, CostModelError, EntryGate, Side};
pub use signal::{
    generate_signals, next_position, usable_rows, SignalParams, SignalRow, DEFAULT_EXIT_FLOOR,
};
pub use simulator::{
    CapitalPoint, OpenPosition, SimulationResult, TradeSimulator, DEFAULT_INITIAL_CAPITAL,
};
