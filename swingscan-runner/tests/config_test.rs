//! The shipped example configuration stays loadable and matches defaults.

use std::path::PathBuf;

use swingscan_core::DetectionParams;
use swingscan_runner::config::{ProviderKind, ScanConfig};

fn example_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("swingscan.example.toml")
}

#[test]
fn example_config_loads() {
    let config = ScanConfig::load(&example_path()).unwrap();
    assert_eq!(config.universe.symbols.len(), 5);
    assert_eq!(config.data.provider, ProviderKind::Yahoo);
    assert_eq!(config.monitor.holidays.len(), 3);
}

#[test]
fn example_detection_section_is_the_default() {
    let config = ScanConfig::load(&example_path()).unwrap();
    assert_eq!(config.detection, DetectionParams::default());
    assert_eq!(config.data, ScanConfig::default().data);
    assert_eq!(config.backtest, ScanConfig::default().backtest);
}

#[test]
fn example_calendar_skips_listed_holidays() {
    let config = ScanConfig::load(&example_path()).unwrap();
    let calendar = config.calendar();
    let independence_day = chrono::NaiveDate::from_ymd_opt(2024, 8, 15).unwrap();
    assert!(calendar.slots(independence_day).is_empty());
    assert_eq!(calendar.slots(independence_day.pred_opt().unwrap()).len(), 7);
}
