//! Indicator Engine.
//!
//! Every indicator implements [`Indicator`]: a pure transform from a bar
//! sequence to an index-aligned `Vec<f64>`, NaN through its warm-up. The
//! engine runs the set a detection pass needs once per symbol and stores the
//! results in an [`IndicatorSeries`], addressed by bar index.

pub mod range;
pub mod roc;
pub mod rsi;
pub mod swing;
pub mod volume;
pub mod window;

pub use range::{bar_ranges, AvgRange};
pub use roc::Roc;
pub use rsi::Rsi;
pub use swing::{SwingBand, SwingLevel};
pub use volume::{volume_ratio, AvgVolume};
pub use window::{Extremum, RollingExtremum, RollingMean};

use crate::domain::Bar;
use crate::error::DetectionError;
use crate::params::DetectionParams;

/// Trait for indicators.
///
/// Indicators take a full bar series and produce a numeric output series of
/// the same length. The first `lookback()` values are `f64::NAN` (warmup).
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "swing_high_12", "rsi_14").
    fn name(&self) -> &str;

    /// Number of leading NaN values.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Index-aligned derived series for one symbol's bars.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub swing_high: Vec<f64>,
    pub swing_low: Vec<f64>,
    pub avg_volume: Vec<f64>,
    pub vol_ratio: Vec<f64>,
    pub range: Vec<f64>,
    pub avg_range: Vec<f64>,
    pub oscillator: Vec<f64>,
    pub roc: Vec<f64>,
    warmup_end: usize,
}

impl IndicatorSeries {
    /// Validate parameters and bars, then compute every series.
    ///
    /// Fails with `InsufficientData` when `bars.len() < max(L, V) + H + 1`.
    pub fn compute(bars: &[Bar], params: &DetectionParams) -> Result<Self, DetectionError> {
        params.validate()?;
        let required = params.required_bars();
        if bars.len() < required {
            return Err(DetectionError::InsufficientData {
                required,
                available: bars.len(),
            });
        }
        if let Some(pos) = bars.windows(2).position(|w| w[0].timestamp >= w[1].timestamp) {
            return Err(DetectionError::Unordered { index: pos + 1 });
        }

        let avg_volume = AvgVolume::new(params.volume_window).compute(bars);
        let vol_ratio = volume_ratio(bars, &avg_volume);
        Ok(Self {
            swing_high: SwingLevel::high(params.lookback).compute(bars),
            swing_low: SwingLevel::low(params.lookback).compute(bars),
            avg_volume,
            vol_ratio,
            range: bar_ranges(bars),
            avg_range: AvgRange::new(params.lookback).compute(bars),
            oscillator: Rsi::new(params.patterns.oscillator_period).compute(bars),
            roc: Roc::new(params.momentum.roc_bars).compute(bars),
            warmup_end: params.warmup_end(),
        })
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// First index whose swing-rule inputs (levels at i−1, ratios at i) are all defined.
    pub fn warmup_end(&self) -> usize {
        self.warmup_end
    }
}

/// Value at `index`, or `None` if out of range or undefined.
pub fn defined(series: &[f64], index: usize) -> Option<f64> {
    series.get(index).copied().filter(|v| !v.is_nan())
}

#[cfg(test)]
fn test_timestamp(i: usize) -> chrono::NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::hours(i as i64)
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for first bar), high = max(open,close) + 1.0,
/// low = min(open,close) - 1.0, volume = 1000, hourly timestamps.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: test_timestamp(i),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

#[cfg(test)]
pub fn make_bars_with_volume(closes: &[f64], volumes: &[f64]) -> Vec<Bar> {
    let mut bars = make_bars(closes);
    for (bar, &v) in bars.iter_mut().zip(volumes) {
        bar.volume = v;
    }
    bars
}

/// Bars from (open, high, low, close) tuples, volume 1000.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            timestamp: test_timestamp(i),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
