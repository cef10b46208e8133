//! Artifact export: JSON, CSV and Markdown.
//!
//! - **JSON**: full `BacktestResult` with a schema version; newer versions
//!   are rejected on load
//! - **CSV**: trade tape, equity curve and the flat metric report
//! - **Markdown**: single-run report and a side-by-side comparison

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use macdlab_core::domain::{EquityPoint, Trade};

use crate::optimizer::OptimizationResult;
use crate::report::{self, Report, ReportValue};
use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult`, rejecting unknown schema versions.
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

/// The flat report as an ordered JSON object. Undefined cells are `null`.
pub fn export_report_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize report to JSON")
}

// ─── CSV ────────────────────────────────────────────────────────────

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Trade tape. Exit columns are empty for a trade still open.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_bar",
        "entry_time",
        "entry_price",
        "exit_bar",
        "exit_time",
        "exit_price",
        "quantity",
        "entry_commission",
        "exit_commission",
        "pnl",
        "return_pct",
        "bars_held",
        "is_open",
    ])?;

    for t in trades {
        let exit = t.exit.as_ref();
        wtr.write_record([
            t.entry.bar_index.to_string(),
            t.entry.timestamp.to_rfc3339(),
            format!("{:.6}", t.entry.price),
            opt(exit.map(|o| o.bar_index)),
            opt(exit.map(|o| o.timestamp.to_rfc3339())),
            opt(exit.map(|o| format!("{:.6}", o.price))),
            format!("{:.8}", t.quantity()),
            format!("{:.4}", t.entry.commission),
            opt(exit.map(|o| format!("{:.4}", o.commission))),
            opt(t.pnl.map(|p| format!("{p:.4}"))),
            opt(t.return_pct().map(|r| format!("{:.4}", r * 100.0))),
            opt(t.bars_held()),
            t.is_open.to_string(),
        ])?;
    }
    finish(wtr)
}

pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "timestamp", "cash", "position_qty", "position_value", "equity"])?;
    for (i, p) in equity_curve.iter().enumerate() {
        wtr.write_record([
            i.to_string(),
            p.timestamp.to_rfc3339(),
            format!("{:.4}", p.cash),
            format!("{:.8}", p.position_qty),
            format!("{:.4}", p.position_value),
            format!("{:.4}", p.equity),
        ])?;
    }
    finish(wtr)
}

/// Two-column `metric,value` table in report order.
pub fn export_report_csv(report: &Report) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["metric", "value"])?;
    for (key, value) in report.iter() {
        wtr.write_record([key.to_string(), value.to_string()])?;
    }
    finish(wtr)
}

/// One row per optimizer evaluation, best first.
pub fn export_evaluations_csv(result: &OptimizationResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "fast_period",
        "slow_period",
        "signal_period",
        "position_size",
        "score",
        "return_pct",
        "sharpe",
        "max_drawdown_pct",
        "trades",
    ])?;
    for (rank, e) in result.ranked().into_iter().enumerate() {
        wtr.write_record([
            (rank + 1).to_string(),
            e.params.fast_period.to_string(),
            e.params.slow_period.to_string(),
            e.params.signal_period.to_string(),
            e.params.position_size.to_string(),
            format!("{:.6}", e.score),
            format!("{:.4}", e.metrics.return_pct),
            format!("{:.4}", e.metrics.sharpe),
            format!("{:.4}", e.metrics.max_drawdown_pct),
            e.metrics.trade_count.to_string(),
        ])?;
    }
    finish(wtr)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for one run under `output_dir/run_{id}/`:
/// `manifest.json`, `trades.csv`, `equity.csv`, `report.csv`, `report.md`.
///
/// The directory name comes from the run id, so re-saving the same run
/// overwrites it. Returns the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(format!("run_{}", result.run_id.short()));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let write = |name: &str, content: String| -> Result<()> {
        let path = run_dir.join(name);
        std::fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))
    };

    write("manifest.json", export_json(result)?)?;
    write("trades.csv", export_trades_csv(&result.trades)?)?;
    write("equity.csv", export_equity_csv(&result.equity_curve)?)?;
    write("report.csv", export_report_csv(&result.report())?)?;
    write("report.md", generate_report(result))?;

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown ───────────────────────────────────────────────────────

pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Run\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Strategy | {} |\n", result.params));
    md.push_str(&format!("| Period | {} to {} |\n", result.start, result.end));
    md.push_str(&format!("| Initial Cash | {:.2} |\n", result.config.initial_cash));
    md.push_str(&format!("| Commission | {} |\n", result.config.commission));
    md.push_str(&format!(
        "| Bars | {} ({} warmup) |\n",
        result.bar_count, result.warmup_bars
    ));
    md.push_str(&format!(
        "| Signals | {} ({} entries skipped) |\n",
        result.signal_count, result.skipped_entries
    ));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash.short()));
    md.push_str(&format!("| Run Id | {} |\n", result.run_id));
    md.push('\n');

    md.push_str("## Performance\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | ---: |\n");
    for (key, value) in result.report().iter() {
        md.push_str(&format!("| {key} | {value} |\n"));
    }
    md.push('\n');

    if !result.trades.is_empty() {
        md.push_str("## Trades\n\n");
        md.push_str("| # | Entry | Entry Price | Exit | Exit Price | PnL | Return |\n");
        md.push_str("| ---: | --- | ---: | --- | ---: | ---: | ---: |\n");
        for (i, t) in result.trades.iter().enumerate() {
            let (exit_time, exit_price) = match &t.exit {
                Some(o) => (o.timestamp.to_string(), format!("{:.2}", o.price)),
                None => ("open".to_string(), String::new()),
            };
            md.push_str(&format!(
                "| {} | {} | {:.2} | {} | {} | {} | {} |\n",
                i + 1,
                t.entry.timestamp,
                t.entry.price,
                exit_time,
                exit_price,
                t.pnl.map(|p| format!("{p:.2}")).unwrap_or_default(),
                t.return_pct()
                    .map(|r| format!("{:.2}%", r * 100.0))
                    .unwrap_or_default(),
            ));
        }
        md.push('\n');
    }

    md
}

/// Side-by-side Markdown table over any number of runs, one column each.
pub fn generate_comparison(results: &[BacktestResult]) -> String {
    let mut md = String::with_capacity(1024 + 256 * results.len());
    md.push_str("# Strategy Comparison\n\n");

    let headers: Vec<String> = results
        .iter()
        .map(|r| {
            format!(
                "{}/{}/{} @ {}",
                r.params.fast_period, r.params.slow_period, r.params.signal_period, r.params.position_size
            )
        })
        .collect();
    md.push_str(&format!("| Metric | {} |\n", headers.join(" | ")));
    md.push_str(&format!("| --- |{}\n", " ---: |".repeat(results.len())));

    let reports: Vec<Report> = results.iter().map(BacktestResult::report).collect();
    for key in report::KEYS {
        let cells: Vec<String> = reports
            .iter()
            .map(|r| r.get(key).unwrap_or(ReportValue::Undefined).to_string())
            .collect();
        md.push_str(&format!("| {key} | {} |\n", cells.join(" | ")));
    }
    md
}
