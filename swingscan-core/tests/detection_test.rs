//! End-to-end detection through the public API: parameters → Indicator
//! Engine → Signal and Pattern Detectors.

use chrono::{NaiveDate, NaiveDateTime};
use swingscan_core::domain::{Bar, ConfirmationCheck, Direction, PatternKind, SignalKind};
use swingscan_core::indicators::IndicatorSeries;
use swingscan_core::patterns::PatternDetector;
use swingscan_core::signals::{DetectionMode, SignalDetector};
use swingscan_core::{DetectionError, DetectionParams, ParamError};

fn ts(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap()
        + chrono::Duration::hours(i as i64)
}

fn params() -> DetectionParams {
    DetectionParams {
        lookback: 5,
        volume_window: 10,
        volume_multiplier: 1.6,
        hold_bars: 3,
        ..Default::default()
    }
}

/// Flat swing-high of exactly 100 with a bullish, double-volume cross at bar 15.
fn breakout_series() -> Vec<Bar> {
    let quiet = |i: usize| Bar {
        timestamp: ts(i),
        open: 98.5,
        high: 100.0 / 0.995,
        low: 98.0,
        close: 99.0,
        volume: 1000.0,
    };
    let mut bars: Vec<Bar> = (0..20).map(quiet).collect();
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

#[test]
fn engineered_breakout_fires_once_at_bar_15() {
    let p = params();
    let bars = breakout_series();
    let series = IndicatorSeries::compute(&bars, &p).unwrap();
    assert!((series.swing_high[14] - 100.0).abs() < 1e-9);
    assert!((series.vol_ratio[15] - 2.0).abs() < 1e-9);

    let signals = SignalDetector::new(&p).detect("ACME", &bars, &series, &p, DetectionMode::Historical);
    assert_eq!(signals.len(), 1, "{signals:?}");
    let s = &signals[0];
    assert_eq!(s.kind, SignalKind::Breakout);
    assert_eq!(s.direction, Direction::Long);
    assert_eq!(s.bar_index, 15);
    assert_eq!(s.timestamp, ts(15));
    assert_eq!(s.price, 101.0);
    assert_eq!(s.symbol, "ACME");
}

#[test]
fn short_series_is_insufficient() {
    let p = params();
    let bars = &breakout_series()[..p.required_bars() - 1];
    assert_eq!(
        IndicatorSeries::compute(bars, &p),
        Err(DetectionError::InsufficientData {
            required: 14,
            available: 13
        })
    );
    assert!(IndicatorSeries::compute(&breakout_series()[..14], &p).is_ok());
}

#[test]
fn invalid_parameters_are_rejected_not_clamped() {
    let bars = breakout_series();

    let p = DetectionParams {
        volume_multiplier: 0.0,
        ..params()
    };
    assert!(matches!(
        IndicatorSeries::compute(&bars, &p),
        Err(DetectionError::InvalidParameter(_))
    ));

    let p = DetectionParams {
        lookback: 0,
        ..params()
    };
    assert!(matches!(
        p.validate(),
        Err(ParamError::NonPositiveWindow { .. })
    ));
}

#[test]
fn unordered_bars_are_rejected() {
    let p = params();
    let mut bars = breakout_series();
    bars[7].timestamp = bars[6].timestamp;
    assert_eq!(
        IndicatorSeries::compute(&bars, &p),
        Err(DetectionError::Unordered { index: 7 })
    );
}

#[test]
fn breakout_follow_through_is_a_retest() {
    let p = params();
    let bars = breakout_series();
    let series = IndicatorSeries::compute(&bars, &p).unwrap();
    let matches = PatternDetector::new(&p).detect("ACME", &bars, &series, &p);

    // Bar 16 dips back to within 2% of the broken level of 100 and closes above it.
    assert_eq!(matches.len(), 1, "{matches:?}");
    let m = &matches[0];
    assert_eq!(m.kind, PatternKind::RetestUptrend);
    assert_eq!(m.confirm_index, 16);
    assert!((m.level - 100.0).abs() < 1e-9);
    assert!((m.target - 102.0).abs() < 1e-9);
    assert!((m.stop - 98.0 * 0.98).abs() < 1e-9);
    assert!((m.entry - 101.5 * 1.001).abs() < 1e-9);
    assert!(m.confirmations.contains(ConfirmationCheck::BreakVolume));
}
