//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: capital curve and/or trade list in, scalar out.
//! The two headline ratios work on realized per-trade returns, not on bar returns,
//! and are not annualized.

use serde::{Deserialize, Serialize};
use pairlab_core::domain::Trade;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub sharpe: f64,
    pub return_to_risk: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
    pub avg_trade_return: f64,
    pub avg_bars_held: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
}

impl PerformanceMetrics {
    /// Compute all metrics from a capital curve and trade list.
    pub fn compute(capital_curve: &[f64], trades: &[Trade], risk_free_rate: f64) -> Self {
        let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();
        Self {
            total_return: total_return(capital_curve),
            sharpe: sharpe_ratio(&returns, risk_free_rate),
            return_to_risk: return_to_risk(&returns),
            max_drawdown: max_drawdown(capital_curve),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
            avg_trade_return: mean_f64(&returns),
            avg_bars_held: avg_bars_held(trades),
            max_consecutive_wins: max_consecutive(trades, true),
            max_consecutive_losses: max_consecutive(trades, false),
        }
    }
}

// ─── Headline ratios ────────────────────────────────────────────────

/// Sharpe over per-trade returns: mean(r − rf) / std(r).
///
/// Returns 0.0 for fewer than two returns or zero (or non-finite) dispersion.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    let std = std_dev(returns);
    if returns.len() < 2 || std.is_nan() || std < 1e-15 {
        return 0.0;
    }
    let excess: Vec<f64> = returns.iter().map(|r| r - risk_free_rate).collect();
    mean_f64(&excess) / std
}

/// Compounded return over all trades divided by the std of per-trade returns.
///
/// Returns 0.0 for fewer than two returns or zero (or non-finite) dispersion.
pub fn return_to_risk(returns: &[f64]) -> f64 {
    let std = std_dev(returns);
    if returns.len() < 2 || std.is_nan() || std < 1e-15 {
        return 0.0;
    }
    compounded_return(returns) / std
}

/// Product of (1 + r) over all returns, minus one.
pub fn compounded_return(returns: &[f64]) -> f64 {
    returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

// ─── Curve and trade metrics ────────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(capital_curve: &[f64]) -> f64 {
    match (capital_curve.first(), capital_curve.last()) {
        (Some(&initial), Some(&last)) if initial > 0.0 => (last - initial) / initial,
        _ => 0.0,
    }
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if capital is constant or monotonically increasing.
pub fn max_drawdown(capital_curve: &[f64]) -> f64 {
    let Some(&first) = capital_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &cap in capital_curve {
        if cap > peak {
            peak = cap;
        }
        if peak > 0.0 {
            let dd = (cap - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Win rate: fraction of trades that were winners.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Profit factor: sum of winning returns / |sum of losing returns|.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.return_pct > 0.0)
        .map(|t| t.return_pct)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.return_pct < 0.0)
        .map(|t| t.return_pct.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Mean holding period in bars.
pub fn avg_bars_held(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.bars_held()).sum::<usize>() as f64 / trades.len() as f64
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n − 1).
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn max_consecutive(trades: &[Trade], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for trade in trades {
        if trade.is_winner() == winners {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}
