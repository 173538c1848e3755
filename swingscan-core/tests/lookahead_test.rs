//! Look-ahead contamination tests.
//!
//! Invariant: no indicator value or signal at bar t may depend on data from
//! bar t+1 or later.
//!
//! Method: run on a truncated series and on the full series, and assert that
//! everything up to the truncation point is identical.

use chrono::NaiveDate;
use swingscan_core::domain::{Bar, SignalKind};
use swingscan_core::indicators::{
    AvgRange, AvgVolume, Indicator, IndicatorSeries, Roc, Rsi, SwingLevel,
};
use swingscan_core::signals::{DetectionMode, SignalDetector};
use swingscan_core::DetectionParams;

/// Deterministic pseudo-random walk with periodic volume bursts.
fn make_test_bars(n: usize) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap();
    let mut price = 100.0;
    (0..n)
        .map(|i| {
            let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
            let change = ((seed >> 33) % 200) as f64 / 100.0 - 1.0;
            let open = price;
            price = (price + change * 1.5).max(10.0);
            let close = price;
            let volume = if i % 17 == 0 { 5000.0 } else { 1000.0 + (i % 7) as f64 * 50.0 };
            Bar {
                timestamp: base + chrono::Duration::hours(i as i64),
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume,
            }
        })
        .collect()
}

fn assert_no_lookahead(indicator: &dyn Indicator, full: &[Bar], truncated_len: usize) {
    let full_result = indicator.compute(full);
    let truncated_result = indicator.compute(&full[..truncated_len]);
    assert_eq!(truncated_result.len(), truncated_len, "{}", indicator.name());

    for i in 0..truncated_len {
        let (t, f) = (truncated_result[i], full_result[i]);
        if t.is_nan() && f.is_nan() {
            continue;
        }
        assert!(
            (t - f).abs() < 1e-9,
            "{}: value at bar {i} changed when future bars were added (truncated={t}, full={f})",
            indicator.name()
        );
    }
}

fn params() -> DetectionParams {
    DetectionParams {
        lookback: 10,
        volume_window: 20,
        volume_multiplier: 1.5,
        hold_bars: 3,
        ..Default::default()
    }
}

#[test]
fn indicators_have_no_lookahead() {
    let bars = make_test_bars(300);
    let indicators: Vec<Box<dyn Indicator>> = vec![
        Box::new(SwingLevel::high(12)),
        Box::new(SwingLevel::low(12)),
        Box::new(AvgVolume::new(70)),
        Box::new(AvgRange::new(12)),
        Box::new(Rsi::new(14)),
        Box::new(Roc::new(3)),
    ];
    for indicator in &indicators {
        assert_no_lookahead(indicator.as_ref(), &bars, 150);
    }
}

#[test]
fn signals_have_no_lookahead() {
    let mut p = params();
    p.momentum.enabled = true;
    let bars = make_test_bars(300);
    let detector = SignalDetector::new(&p);

    let full_series = IndicatorSeries::compute(&bars, &p).unwrap();
    let full = detector.detect("TEST", &bars, &full_series, &p, DetectionMode::Historical);

    let cut = 180;
    let short_series = IndicatorSeries::compute(&bars[..cut], &p).unwrap();
    let short = detector.detect("TEST", &bars[..cut], &short_series, &p, DetectionMode::Historical);

    let full_prefix: Vec<_> = full
        .into_iter()
        .filter(|s| s.bar_index < cut - p.hold_bars)
        .collect();
    assert_eq!(short, full_prefix);
}

#[test]
fn live_mode_matches_historical_before_the_last_bar() {
    let p = params();
    let bars = make_test_bars(200);
    let series = IndicatorSeries::compute(&bars, &p).unwrap();
    let detector = SignalDetector::new(&p);

    let historical = detector.detect("TEST", &bars, &series, &p, DetectionMode::Historical);
    let live = detector.detect("TEST", &bars, &series, &p, DetectionMode::Live);

    let live_prefix: Vec<_> = live
        .iter()
        .filter(|s| s.bar_index < bars.len() - p.hold_bars)
        .cloned()
        .collect();
    assert_eq!(historical, live_prefix);
    assert!(live
        .iter()
        .all(|s| matches!(s.kind, SignalKind::Breakout | SignalKind::Breakdown)));
}
