//! swingscan runner: configuration, backtests and the live monitor.
//!
//! This crate builds on `swingscan-core` to provide:
//! - TOML configuration with validation
//! - Bar Store assembly from historical and current-session fetches
//! - Backtest Simulator with per-symbol and pooled statistics
//! - Pattern outcome evaluation
//! - Market calendar and check slots
//! - Continuous Monitor with deduplicated alerts
//! - CSV, JSON and Markdown export

pub mod alert;
pub mod backtest;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod monitor;
pub mod pattern_outcome;
pub mod pipeline;

pub use alert::{Alert, AlertSink, ChannelSink, LogSink, SinkError};
pub use backtest::{
    run_backtest, run_backtest_from_data, simulate_symbol, BacktestError, BacktestReport,
    SymbolBacktest, Trade, SCHEMA_VERSION,
};
pub use calendar::{CheckSlot, MarketCalendar};
pub use clock::{Clock, SystemClock, TokioClock};
pub use config::{
    BacktestSettings, ConfigError, DataConfig, MonitorConfig, ProviderKind, ScanConfig,
    UniverseConfig,
};
pub use data_loader::{assemble, load_symbol, FetchWindow};
pub use metrics::SymbolStats;
pub use monitor::{
    CheckReport, Monitor, MonitorError, MonitorHandle, MonitorSettings, MonitorState,
    MonitorStatus, SchedulingOverrun, SymbolScanError,
};
pub use pattern_outcome::{evaluate_pattern, Outcome, OutcomeSummary, PatternOutcome};
pub use pipeline::{analyze_symbol, Detection, FineBars, SymbolAnalysis};
