//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! Provides the export formats for a pair backtest:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: per-bar signal trace, trade tape and capital curve
//! - **Markdown**: human-readable single-run report
//!
//! All persisted artifacts include a `schema_version` field. Newer versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use pairlab_core::domain::Trade;
use pairlab_core::engine::CapitalPoint;

use crate::runner::{BacktestResult, SCHEMA_VERSION};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn ts(t: &NaiveDateTime) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting newer schema versions.
///
/// The per-bar trace is not part of the manifest and comes back empty.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the per-bar signal trace.
///
/// Columns: timestamp, asset1, asset2, asset1_mean, asset2_mean, asset1_std,
/// asset2_std, spread, rolling_mean, rolling_std, zscore, signal, capital,
/// trade_return. `trade_return` is empty except on bars where a trade closed.
pub fn export_trace_csv(result: &BacktestResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "timestamp",
        "asset1",
        "asset2",
        "asset1_mean",
        "asset2_mean",
        "asset1_std",
        "asset2_std",
        "spread",
        "rolling_mean",
        "rolling_std",
        "zscore",
        "signal",
        "capital",
        "trade_return",
    ])?;

    for (i, row) in result.trace.iter().enumerate() {
        let s = &row.snapshot;
        let capital = result
            .capital_series
            .get(i)
            .map(|p| format!("{:.6}", p.capital))
            .unwrap_or_default();
        let trade_return = result
            .trade_returns
            .get(i)
            .copied()
            .flatten()
            .map(|r| format!("{r:.8}"))
            .unwrap_or_default();

        wtr.write_record([
            &ts(&row.bar.timestamp),
            &format!("{:.6}", row.bar.price1),
            &format!("{:.6}", row.bar.price2),
            &format!("{:.6}", s.asset1_mean),
            &format!("{:.6}", s.asset2_mean),
            &format!("{:.6}", s.asset1_std),
            &format!("{:.6}", s.asset2_std),
            &format!("{:.6}", s.spread),
            &format!("{:.6}", s.spread_mean),
            &format!("{:.6}", s.spread_std),
            &format!("{:.6}", s.z_score),
            row.position.label(),
            &capital,
            &trade_return,
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export a trade list as CSV.
///
/// Columns: kind, entry_index, entry_time, entry_price1, entry_price2,
/// exit_index, exit_time, exit_price1, exit_price2, bars_held, return
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "kind",
        "entry_index",
        "entry_time",
        "entry_price1",
        "entry_price2",
        "exit_index",
        "exit_time",
        "exit_price1",
        "exit_price2",
        "bars_held",
        "return",
    ])?;

    for t in trades {
        wtr.write_record([
            t.kind.label(),
            &t.entry_index.to_string(),
            &ts(&t.entry_time),
            &format!("{:.6}", t.entry_price1),
            &format!("{:.6}", t.entry_price2),
            &t.exit_index.to_string(),
            &ts(&t.exit_time),
            &format!("{:.6}", t.exit_price1),
            &format!("{:.6}", t.exit_price2),
            &t.bars_held().to_string(),
            &format!("{:.8}", t.return_pct),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the capital curve as CSV with bar_index, timestamp and capital columns.
pub fn export_equity_csv(capital_series: &[CapitalPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "timestamp", "capital"])?;
    for (i, point) in capital_series.iter().enumerate() {
        wtr.write_record([
            &i.to_string(),
            &ts(&point.timestamp),
            &format!("{:.2}", point.capital),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates a directory named `{asset1}-{asset2}_{timestamp}/` under `output_dir`
/// containing:
/// - `manifest.json`: the full `BacktestResult`
/// - `trace.csv`: per-bar prices, rolling statistics, signal and capital
/// - `trades.csv`: trade tape
/// - `equity.csv`: bar-by-bar capital
/// - `report.md`: human-readable summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}",
        result.pair_name(),
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let files = [
        ("manifest.json", export_json(result)?),
        ("trace.csv", export_trace_csv(result)?),
        ("trades.csv", export_trades_csv(&result.trades)?),
        ("equity.csv", export_equity_csv(&result.capital_series)?),
        ("report.md", generate_report(result)),
    ];
    for (name, content) in files {
        let path = run_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects newer schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);
    let cfg = &result.config;

    md.push_str(&format!("# Pair Backtest: {}\n\n", result.pair_name()));

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    let period = match (&result.start, &result.end) {
        (Some(s), Some(e)) => format!("{} to {}", ts(s), ts(e)),
        _ => "no simulated bars".to_string(),
    };
    md.push_str(&format!("| Period | {period} |\n"));
    md.push_str(&format!(
        "| Bars | {} ({} warmup) |\n",
        result.bar_count, result.warmup_bars
    ));
    md.push_str(&format!("| Initial Capital | {:.2} |\n", result.initial_capital));
    md.push_str(&format!("| Run ID | {} |\n", result.run_id));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    md.push_str("## Strategy\n\n");
    md.push_str(&format!(
        "- entry ±{}, exit ({}, {}), window {}\n",
        cfg.strategy.entry_threshold,
        cfg.strategy.exit_floor,
        cfg.strategy.exit_threshold,
        cfg.strategy.window
    ));
    md.push_str(&format!(
        "- fee {} per leg, {} entries\n",
        cfg.costs.fee_rate,
        if cfg.strategy.fee_aware_entries {
            "fee-aware"
        } else {
            "fee-naive"
        }
    ));
    match &result.cointegration {
        Some(c) => md.push_str(&format!(
            "- cointegration p-value {:.4} (t = {:.3}, hedge ratio {:.4})\n",
            c.p_value, c.t_statistic, c.hedge_ratio
        )),
        None => md.push_str("- cointegration gate disabled\n"),
    }
    md.push('\n');

    let m = &result.metrics;
    md.push_str("## Performance\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Return | {:.2}% |\n", result.return_pct * 100.0));
    md.push_str(&format!("| Final Capital | {:.2} |\n", result.final_capital));
    md.push_str(&format!("| Sharpe (per trade) | {:.3} |\n", result.sharpe));
    md.push_str(&format!("| Return / Risk | {:.3} |\n", result.return_to_risk));
    md.push_str(&format!("| Max Drawdown | {:.2}% |\n", m.max_drawdown * 100.0));
    md.push_str(&format!("| Trades | {} |\n", m.trade_count));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate * 100.0));
    md.push_str(&format!("| Avg Trade | {:.4}% |\n", m.avg_trade_return * 100.0));
    md.push_str(&format!("| Avg Bars Held | {:.1} |\n", m.avg_bars_held));
    if let Some(open) = &result.open_position {
        md.push_str(&format!(
            "| Open at End | {} since {} |\n",
            open.kind,
            ts(&open.entry_time)
        ));
    }

    md
}
