//! Signal Detector.
//!
//! Walks bar indices in order and asks each [`SignalRule`] whether it fires.
//! Rules see only `bars[..=i]` and series values at indices ≤ i. Signals for
//! one symbol therefore come out in non-decreasing timestamp order, and a
//! re-run over the same input yields the same list.

pub mod momentum;
pub mod swing;
pub mod volume_spike;

pub use momentum::MomentumBuildup;
pub use swing::{SwingBreakdown, SwingBreakout};
pub use volume_spike::detect_volume_spikes;

use std::collections::HashSet;
use std::ops::Range;

use crate::domain::{Bar, Signal, SignalKind};
use crate::indicators::IndicatorSeries;
use crate::params::DetectionParams;

/// Which index range and thresholds a detection pass uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectionMode {
    /// Backtest replay: every signal must leave H bars for the exit.
    #[default]
    Historical,
    /// Live scan: runs to the last bar and applies the reduced volume
    /// threshold to that bar only.
    Live,
}

/// Everything a rule may read at one bar.
pub struct RuleContext<'a> {
    pub symbol: &'a str,
    pub bars: &'a [Bar],
    pub series: &'a IndicatorSeries,
    pub params: &'a DetectionParams,
    /// Volume ratio threshold in force at this bar.
    pub volume_multiplier: f64,
}

/// One detection rule evaluated bar by bar.
pub trait SignalRule: Send + Sync {
    fn kind(&self) -> SignalKind;

    /// Returns a signal if the rule fires at `bar_index`.
    /// Implementations must only use data at indices `..=bar_index`.
    fn evaluate(&self, ctx: &RuleContext<'_>, bar_index: usize) -> Option<Signal>;
}

/// Valid bar indices for a detection pass over `len` bars.
pub fn detection_range(len: usize, params: &DetectionParams, mode: DetectionMode) -> Range<usize> {
    let start = params.warmup_end();
    let end = match mode {
        DetectionMode::Historical => len.saturating_sub(params.hold_bars),
        DetectionMode::Live => len,
    };
    start..end.max(start)
}

pub struct SignalDetector {
    rules: Vec<Box<dyn SignalRule>>,
}

impl SignalDetector {
    /// Rules enabled by `params`: breakout and breakdown always, momentum
    /// buildup when configured.
    pub fn new(params: &DetectionParams) -> Self {
        let mut rules: Vec<Box<dyn SignalRule>> =
            vec![Box::new(SwingBreakout), Box::new(SwingBreakdown)];
        if params.momentum.enabled {
            rules.push(Box::new(MomentumBuildup));
        }
        Self { rules }
    }

    /// A detector running exactly `rules`, in order.
    pub fn with_rules(rules: Vec<Box<dyn SignalRule>>) -> Self {
        Self { rules }
    }

    pub fn detect(
        &self,
        symbol: &str,
        bars: &[Bar],
        series: &IndicatorSeries,
        params: &DetectionParams,
        mode: DetectionMode,
    ) -> Vec<Signal> {
        let range = detection_range(bars.len().min(series.len()), params, mode);
        let last = bars.len().saturating_sub(1);
        let mut signals = Vec::new();

        for i in range {
            let volume_multiplier = if mode == DetectionMode::Live && i == last {
                params.live_volume_multiplier()
            } else {
                params.volume_multiplier
            };
            let ctx = RuleContext {
                symbol,
                bars,
                series,
                params,
                volume_multiplier,
            };
            signals.extend(self.rules.iter().filter_map(|rule| rule.evaluate(&ctx, i)));
        }
        signals
    }
}

/// Merge two signal streams by timestamp, keeping the first of any duplicate
/// (symbol, timestamp, kind).
pub fn merge_signals(primary: Vec<Signal>, secondary: Vec<Signal>) -> Vec<Signal> {
    let mut all = primary;
    all.extend(secondary);
    all.sort_by(|a, b| {
        (&a.symbol, a.timestamp, a.kind).cmp(&(&b.symbol, b.timestamp, b.kind))
    });
    let mut seen = HashSet::new();
    all.retain(|s| seen.insert(s.key()));
    all
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::Bar;
    use crate::params::DetectionParams;

    /// L = 5, V = 10, M = 1.6, H = 3.
    pub fn params() -> DetectionParams {
        DetectionParams {
            lookback: 5,
            volume_window: 10,
            volume_multiplier: 1.6,
            hold_bars: 3,
            ..Default::default()
        }
    }

    /// 20 quiet bars pinned under a flat swing-high of exactly 100 and over a
    /// swing-low near 98.49; bar 15 breaks out with a volume ratio of 2.0.
    pub fn breakout_fixture() -> Vec<Bar> {
        let high = 100.0 / 0.995;
        let mut bars: Vec<Bar> = (0..20)
            .map(|i| Bar {
                timestamp: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
                    + chrono::Duration::hours(i),
                open: 98.5,
                high,
                low: 98.0,
                close: 99.0,
                volume: 1000.0,
            })
            .collect();
        // avg = (9 × 1000 + 2250) / 10 = 1125 → ratio 2.0
        bars[15] = Bar {
            open: 99.0,
            high: 101.5,
            close: 101.0,
            volume: 2250.0,
            ..bars[15]
        };
        for bar in bars.iter_mut().skip(16) {
            *bar = Bar {
                open: 100.8,
                high: 101.5,
                close: 101.0,
                ..*bar
            };
        }
        bars
    }
}
