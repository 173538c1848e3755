//! Reporting and export: JSON, CSV and Markdown artifacts for a backtest.
//!
//! Every persisted report carries a `schema_version`; newer versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use swingscan_core::domain::{PatternMatch, Signal};

use crate::backtest::{BacktestReport, Trade, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a report, rejecting schema versions newer than this build.
pub fn import_json(json: &str) -> Result<BacktestReport> {
    let report: BacktestReport =
        serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}

pub fn export_trades_csv<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "signal_kind",
        "direction",
        "signal_bar",
        "signal_time",
        "entry_bar",
        "entry_time",
        "entry_price",
        "exit_bar",
        "exit_time",
        "exit_price",
        "pnl_pct",
    ])?;
    for t in trades {
        wtr.write_record([
            &t.symbol,
            t.signal_kind.name(),
            &format!("{:?}", t.direction),
            &t.signal_index.to_string(),
            &t.signal_timestamp.to_string(),
            &t.entry_index.to_string(),
            &t.entry_timestamp.to_string(),
            &format!("{:.4}", t.entry_price),
            &t.exit_index.to_string(),
            &t.exit_timestamp.to_string(),
            &format!("{:.4}", t.exit_price),
            &format!("{:.4}", t.pnl_pct),
        ])?;
    }
    finish(wtr)
}

pub fn export_signals_csv<'a>(signals: impl IntoIterator<Item = &'a Signal>) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "kind",
        "direction",
        "bar",
        "time",
        "price",
        "volume_ratio",
        "level",
        "range",
        "avg_range",
        "source",
    ])?;
    for s in signals {
        wtr.write_record([
            &s.symbol,
            s.kind.name(),
            &format!("{:?}", s.direction),
            &s.bar_index.to_string(),
            &s.timestamp.to_string(),
            &format!("{:.4}", s.price),
            &format!("{:.4}", s.volume_ratio),
            &format!("{:.4}", s.level),
            &opt(s.range),
            &opt(s.avg_range),
            s.source.tag(),
        ])?;
    }
    finish(wtr)
}

/// Points are flattened into `time@price` pairs joined by `;`.
pub fn export_patterns_csv<'a>(
    patterns: impl IntoIterator<Item = &'a PatternMatch>,
) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "kind",
        "confirm_bar",
        "confirm_time",
        "level",
        "entry",
        "stop",
        "target",
        "reward_risk",
        "confirmations",
        "points",
    ])?;
    for p in patterns {
        let confirmations: Vec<&str> = p.confirmations.iter().map(|c| c.name()).collect();
        let points: Vec<String> = p
            .points
            .iter()
            .map(|pt| format!("{}@{:.4}", pt.timestamp, pt.price))
            .collect();
        wtr.write_record([
            &p.symbol,
            p.kind.name(),
            &p.confirm_index.to_string(),
            &p.confirm_timestamp.to_string(),
            &format!("{:.4}", p.level),
            &format!("{:.4}", p.entry),
            &format!("{:.4}", p.stop),
            &format!("{:.4}", p.target),
            &opt(p.reward_risk()),
            &confirmations.join(";"),
            &points.join(";"),
        ])?;
    }
    finish(wtr)
}

// ─── Markdown report ────────────────────────────────────────────────

fn pf(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "n/a".into())
}

pub fn generate_report(report: &BacktestReport) -> String {
    let mut md = String::with_capacity(2048);
    md.push_str("# Backtest Report\n\n");
    md.push_str("| Field | Value |\n| --- | --- |\n");
    md.push_str(&format!("| Run | `{}` |\n", report.run_id));
    md.push_str(&format!("| Period | {} to {} |\n", report.start, report.end));
    md.push_str(&format!(
        "| L / V / M / H | {} / {} / {} / {} |\n",
        report.params.lookback,
        report.params.volume_window,
        report.params.volume_multiplier,
        report.params.hold_bars
    ));
    md.push_str(&format!(
        "| Symbols | {} ({} excluded) |\n\n",
        report.symbols.len(),
        report.excluded.len()
    ));

    md.push_str("## Per symbol\n\n");
    md.push_str("| Symbol | Bars | Trades | Win rate | Net P&L % | Profit factor |\n");
    md.push_str("| --- | ---: | ---: | ---: | ---: | ---: |\n");
    for (symbol, bt) in &report.symbols {
        md.push_str(&format!(
            "| {} | {} | {} | {:.1}% | {:.2} | {} |\n",
            symbol,
            bt.bar_count,
            bt.stats.trade_count,
            bt.stats.win_rate * 100.0,
            bt.stats.total_pnl_pct,
            pf(bt.stats.profit_factor)
        ));
    }
    let agg = &report.aggregate;
    md.push_str(&format!(
        "| **All** | | {} | {:.1}% | {:.2} | {} |\n\n",
        agg.trade_count,
        agg.win_rate * 100.0,
        agg.total_pnl_pct,
        pf(agg.profit_factor)
    ));

    if !report.pattern_summary.is_empty() {
        md.push_str("## Pattern outcomes\n\n");
        md.push_str("| Pattern | Count | Wins | Losses | Expired | Win rate | Avg P&L % |\n");
        md.push_str("| --- | ---: | ---: | ---: | ---: | ---: | ---: |\n");
        for (kind, s) in &report.pattern_summary {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {:.1}% | {:.2} |\n",
                kind,
                s.count,
                s.wins,
                s.losses,
                s.expired,
                s.win_rate * 100.0,
                s.avg_pnl_pct
            ));
        }
        md.push('\n');
    }

    if !report.excluded.is_empty() {
        md.push_str("## Excluded\n\n");
        for (symbol, reason) in &report.excluded {
            md.push_str(&format!("- {symbol}: {reason}\n"));
        }
    }
    md
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the artifact set for a run under `output_dir/backtest_{run id prefix}/`:
/// `report.json`, `trades.csv`, `signals.csv`, `patterns.csv`, `report.md`.
///
/// Returns the created directory.
pub fn save_artifacts(report: &BacktestReport, output_dir: &Path) -> Result<PathBuf> {
    let prefix: String = report.run_id.chars().take(12).collect();
    let run_dir = output_dir.join(format!("backtest_{prefix}"));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let files = [
        ("report.json", export_json(report)?),
        ("trades.csv", export_trades_csv(report.trades())?),
        ("signals.csv", export_signals_csv(report.signals())?),
        ("patterns.csv", export_patterns_csv(report.patterns())?),
        ("report.md", generate_report(report)),
    ];
    for (name, contents) in files {
        let path = run_dir.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(run_dir)
}

/// Load the report from an artifact directory.
pub fn load_artifacts(dir: &Path) -> Result<BacktestReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
