//! PairLab Core: domain types, data providers, statistics, signal engine.
//!
//! This crate contains the heart of the pairs backtest:
//! - Domain types (pair bars, aligned series, positions, trades)
//! - Price providers and the inner-join aligner
//! - Engle-Granger cointegration test
//! - Rolling spread statistics with the ε-floored z-score
//! - Fee-aware entry gate, per-bar position state machine, trade simulator

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod stats;
