//! Per-symbol analysis: Indicator Engine → Signal Detector (+ volume spikes)
//! → Pattern Detector.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use swingscan_core::domain::{Bar, DetectionKey, Interval, PatternMatch, Signal};
use swingscan_core::indicators::IndicatorSeries;
use swingscan_core::patterns::PatternDetector;
use swingscan_core::signals::{detect_volume_spikes, merge_signals, DetectionMode, SignalDetector};
use swingscan_core::{DetectionError, DetectionParams};

/// A signal or a confirmed pattern; what the monitor deduplicates and alerts on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Detection {
    Signal(Signal),
    Pattern(PatternMatch),
}

impl Detection {
    pub fn symbol(&self) -> &str {
        match self {
            Self::Signal(s) => &s.symbol,
            Self::Pattern(p) => &p.symbol,
        }
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            Self::Signal(s) => s.timestamp,
            Self::Pattern(p) => p.confirm_timestamp,
        }
    }

    pub fn key(&self) -> DetectionKey {
        match self {
            Self::Signal(s) => s.key(),
            Self::Pattern(p) => p.key(),
        }
    }
}

/// Short-interval bars for volume spikes, referenced against the main series
/// whose bars are `coarse_interval` long.
#[derive(Debug, Clone, Copy)]
pub struct FineBars<'a> {
    pub bars: &'a [Bar],
    pub coarse_interval: Interval,
}

/// Everything detected for one symbol in one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolAnalysis {
    pub symbol: String,
    pub bar_count: usize,
    /// Signals ordered by timestamp, then kind.
    pub signals: Vec<Signal>,
    /// Patterns ordered by confirming bar.
    pub patterns: Vec<PatternMatch>,
}

impl SymbolAnalysis {
    /// Signals and patterns together, ordered by timestamp.
    pub fn detections(&self) -> Vec<Detection> {
        let mut all: Vec<Detection> = self
            .signals
            .iter()
            .cloned()
            .map(Detection::Signal)
            .chain(self.patterns.iter().cloned().map(Detection::Pattern))
            .collect();
        all.sort_by(|a, b| a.timestamp().cmp(&b.timestamp()).then_with(|| a.key().cmp(&b.key())));
        all
    }
}

/// Run the full detection pipeline over one symbol's bars.
///
/// Volume spikes from `fine` are referenced against the closed bars of
/// `bars` and merged into the signal stream.
pub fn analyze_symbol(
    symbol: &str,
    bars: &[Bar],
    fine: Option<FineBars<'_>>,
    params: &DetectionParams,
    mode: DetectionMode,
) -> Result<SymbolAnalysis, DetectionError> {
    let series = IndicatorSeries::compute(bars, params)?;
    let mut signals = SignalDetector::new(params).detect(symbol, bars, &series, params, mode);
    if let Some(fine) = fine {
        let spikes = detect_volume_spikes(
            symbol,
            fine.bars,
            bars,
            fine.coarse_interval,
            params.volume_window,
        );
        signals = merge_signals(signals, spikes);
    }
    let patterns = PatternDetector::new(params).detect(symbol, bars, &series, params);

    Ok(SymbolAnalysis {
        symbol: symbol.to_string(),
        bar_count: bars.len(),
        signals,
        patterns,
    })
}
