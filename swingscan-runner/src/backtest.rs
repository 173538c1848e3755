//! Backtest Simulator.
//!
//! Replays the Signal Detector over history and turns every directional
//! signal into a fixed-hold trade: entry at the next bar's open, exit at the
//! close `H` bars after the signal. Confirmed patterns are followed forward
//! separately (see [`crate::pattern_outcome`]).
//!
//! Two entry points:
//! - `run_backtest()`: fetches bars from a [`BarSource`], then simulates.
//! - `run_backtest_from_data()`: pre-loaded bars, no I/O; symbols run in
//!   parallel on rayon.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use futures::stream::{self, StreamExt};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use swingscan_core::data::BarSource;
use swingscan_core::domain::{Bar, Direction, Interval, PatternKind, PatternMatch, Signal, SignalKind};
use swingscan_core::signals::DetectionMode;
use swingscan_core::{DetectionError, DetectionParams, ParamError};
use thiserror::Error;
use tracing::{info, warn};

use crate::data_loader::assemble;
use crate::metrics::SymbolStats;
use crate::pattern_outcome::{evaluate_pattern, summarize, OutcomeSummary, PatternOutcome};
use crate::pipeline::analyze_symbol;

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(#[from] ParamError),

    #[error("failed to serialize run identity: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One simulated fixed-hold trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub signal_kind: SignalKind,
    pub direction: Direction,
    pub signal_index: usize,
    pub signal_timestamp: NaiveDateTime,
    pub entry_index: usize,
    pub entry_timestamp: NaiveDateTime,
    pub entry_price: f64,
    pub exit_index: usize,
    pub exit_timestamp: NaiveDateTime,
    pub exit_price: f64,
    /// Signed so that a favourable move is positive for either direction.
    pub pnl_pct: f64,
}

/// Trade for `signal` held `hold_bars`. `None` for neutral signals or when
/// the exit bar is missing.
pub fn trade_for_signal(bars: &[Bar], signal: &Signal, hold_bars: usize) -> Option<Trade> {
    if signal.direction == Direction::Neutral || hold_bars == 0 {
        return None;
    }
    let i = signal.bar_index;
    let entry = bars.get(i + 1)?;
    let exit = bars.get(i + hold_bars)?;
    if entry.open <= 0.0 {
        return None;
    }
    Some(Trade {
        symbol: signal.symbol.clone(),
        signal_kind: signal.kind,
        direction: signal.direction,
        signal_index: i,
        signal_timestamp: signal.timestamp,
        entry_index: i + 1,
        entry_timestamp: entry.timestamp,
        entry_price: entry.open,
        exit_index: i + hold_bars,
        exit_timestamp: exit.timestamp,
        exit_price: exit.close,
        pnl_pct: signal.direction.sign() * (exit.close - entry.open) / entry.open * 100.0,
    })
}

/// Everything the simulator produced for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolBacktest {
    pub symbol: String,
    pub bar_count: usize,
    pub signals: Vec<Signal>,
    pub trades: Vec<Trade>,
    pub stats: SymbolStats,
    pub patterns: Vec<PatternMatch>,
    pub pattern_outcomes: Vec<PatternOutcome>,
}

/// Simulate one symbol. Fails only with `InsufficientData` (or an ordering
/// problem in the input); both exclude the symbol, not the run.
pub fn simulate_symbol(
    symbol: &str,
    bars: &[Bar],
    params: &DetectionParams,
    outcome_horizon: usize,
) -> Result<SymbolBacktest, DetectionError> {
    let analysis = analyze_symbol(symbol, bars, None, params, DetectionMode::Historical)?;
    let trades: Vec<Trade> = analysis
        .signals
        .iter()
        .filter_map(|s| trade_for_signal(bars, s, params.hold_bars))
        .collect();
    let pattern_outcomes = analysis
        .patterns
        .iter()
        .filter_map(|m| evaluate_pattern(bars, m, outcome_horizon))
        .collect();

    Ok(SymbolBacktest {
        symbol: symbol.to_string(),
        bar_count: bars.len(),
        stats: SymbolStats::compute(&trades),
        signals: analysis.signals,
        trades,
        patterns: analysis.patterns,
        pattern_outcomes,
    })
}

/// Full result of a backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// BLAKE3 of parameters, universe and date range.
    pub run_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub params: DetectionParams,
    pub symbols: BTreeMap<String, SymbolBacktest>,
    /// Symbols left out of the aggregate, with the reason.
    pub excluded: BTreeMap<String, String>,
    /// Statistics over the trades of every included symbol.
    pub aggregate: SymbolStats,
    pub pattern_summary: BTreeMap<PatternKind, OutcomeSummary>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestReport {
    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.symbols.values().flat_map(|s| s.trades.iter())
    }

    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.symbols.values().flat_map(|s| s.signals.iter())
    }

    pub fn patterns(&self) -> impl Iterator<Item = &PatternMatch> {
        self.symbols.values().flat_map(|s| s.patterns.iter())
    }
}

/// Deterministic identity of a run.
pub fn run_id(
    params: &DetectionParams,
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<String, BacktestError> {
    let mut sorted: Vec<&String> = symbols.iter().collect();
    sorted.sort();
    let mut hasher = blake3::Hasher::new();
    hasher.update(&serde_json::to_vec(params)?);
    hasher.update(&serde_json::to_vec(&sorted)?);
    hasher.update(start.to_string().as_bytes());
    hasher.update(end.to_string().as_bytes());
    Ok(hasher.finalize().to_hex().to_string())
}

/// Simulate pre-loaded bars: no I/O.
///
/// Parameters are validated once up front; an invalid parameter fails the
/// whole run. Per-symbol failures are recorded in `excluded`.
pub fn run_backtest_from_data(
    data: &BTreeMap<String, Vec<Bar>>,
    start: NaiveDate,
    end: NaiveDate,
    params: &DetectionParams,
    outcome_horizon: usize,
) -> Result<BacktestReport, BacktestError> {
    params.validate()?;
    let names: Vec<String> = data.keys().cloned().collect();
    let run_id = run_id(params, &names, start, end)?;

    let results: Vec<(String, Result<SymbolBacktest, DetectionError>)> = data
        .par_iter()
        .map(|(symbol, bars)| {
            (
                symbol.clone(),
                simulate_symbol(symbol, bars, params, outcome_horizon),
            )
        })
        .collect();

    let mut symbols = BTreeMap::new();
    let mut excluded = BTreeMap::new();
    for (symbol, result) in results {
        match result {
            Ok(bt) => {
                symbols.insert(symbol, bt);
            }
            Err(DetectionError::InvalidParameter(e)) => return Err(e.into()),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "excluding symbol from backtest");
                excluded.insert(symbol, e.to_string());
            }
        }
    }

    let pooled: Vec<Trade> = symbols.values().flat_map(|s| s.trades.clone()).collect();
    let outcomes: Vec<PatternOutcome> = symbols
        .values()
        .flat_map(|s| s.pattern_outcomes.clone())
        .collect();

    Ok(BacktestReport {
        schema_version: SCHEMA_VERSION,
        run_id,
        start,
        end,
        params: params.clone(),
        aggregate: SymbolStats::compute(&pooled),
        pattern_summary: summarize(&outcomes),
        symbols,
        excluded,
    })
}

/// Fetch `[start, end]` (inclusive dates) for every symbol and simulate.
///
/// Fetches run `max_in_flight` at a time. A symbol whose fetch fails is
/// excluded with the provider's reason; the run continues.
#[allow(clippy::too_many_arguments)]
pub async fn run_backtest(
    source: &dyn BarSource,
    symbols: &[String],
    interval: Interval,
    start: NaiveDate,
    end: NaiveDate,
    params: &DetectionParams,
    outcome_horizon: usize,
    max_in_flight: usize,
) -> Result<BacktestReport, BacktestError> {
    params.validate()?;
    let from = start.and_time(chrono::NaiveTime::MIN);
    let to = (end + chrono::Duration::days(1)).and_time(chrono::NaiveTime::MIN);

    let fetched: Vec<(String, Result<Vec<Bar>, String>)> = stream::iter(symbols.iter().cloned())
        .map(|symbol| async move {
            let result = source
                .fetch_bars(&symbol, interval, from, to)
                .await
                .map(|bars| assemble(bars, Vec::new()))
                .map_err(|e| e.to_string());
            (symbol, result)
        })
        .buffer_unordered(max_in_flight.max(1))
        .collect()
        .await;

    let mut data = BTreeMap::new();
    let mut unavailable = BTreeMap::new();
    for (symbol, result) in fetched {
        match result {
            Ok(bars) => {
                data.insert(symbol, bars);
            }
            Err(reason) => {
                warn!(symbol = %symbol, reason = %reason, "data unavailable, excluding symbol");
                unavailable.insert(symbol, reason);
            }
        }
    }

    let mut report = run_backtest_from_data(&data, start, end, params, outcome_horizon)?;
    report.run_id = run_id(params, symbols, start, end)?;
    report.excluded.extend(unavailable);
    info!(
        run_id = %report.run_id,
        included = report.symbols.len(),
        excluded = report.excluded.len(),
        trades = report.aggregate.trade_count,
        "backtest complete"
    );
    Ok(report)
}
