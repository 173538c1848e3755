//! Artifact export: files on disk, CSV columns, schema version gate.

mod common;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use common::{breakout_bars, params};
use swingscan_runner::backtest::{run_backtest_from_data, BacktestReport};
use swingscan_runner::export::{
    export_json, export_trades_csv, generate_report, import_json, load_artifacts, save_artifacts,
};

fn report() -> BacktestReport {
    let first = NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap();
    let mut data = BTreeMap::new();
    data.insert("ACME".to_string(), breakout_bars(first, 20));
    data.insert("TINY".to_string(), breakout_bars(first, 5));
    let day = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
    run_backtest_from_data(&data, day(4), day(5), &params(), 20).unwrap()
}

#[test]
fn artifacts_are_written_and_reloaded() {
    let report = report();
    let dir = tempfile::tempdir().unwrap();
    let run_dir = save_artifacts(&report, dir.path()).unwrap();

    for name in ["report.json", "trades.csv", "signals.csv", "patterns.csv", "report.md"] {
        assert!(run_dir.join(name).is_file(), "missing {name}");
    }

    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.run_id, report.run_id);
    assert_eq!(loaded.schema_version, report.schema_version);
    assert_eq!(loaded.symbols.len(), 1);
    assert_eq!(loaded.excluded.keys().collect::<Vec<_>>(), vec!["TINY"]);
    assert_eq!(loaded.symbols["ACME"].trades.len(), 1);
}

#[test]
fn trade_csv_has_one_row_per_trade() {
    let report = report();
    let csv = export_trades_csv(report.trades()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("symbol,signal_kind,direction"));
    assert!(lines[1].starts_with("ACME,breakout,Long,15,"));
    assert!(lines[1].ends_with(",0.1984"));
}

#[test]
fn newer_schema_is_rejected() {
    let json = export_json(&report()).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["schema_version"] = serde_json::json!(99);
    let err = import_json(&value.to_string()).unwrap_err();
    assert!(err.to_string().contains("unsupported schema version 99"));
}

#[test]
fn markdown_report_lists_symbols_and_exclusions() {
    let md = generate_report(&report());
    assert!(md.starts_with("# Backtest Report"));
    assert!(md.contains("| ACME | 20 | 1 | 100.0% |"));
    assert!(md.contains("- TINY: insufficient data"));
}
