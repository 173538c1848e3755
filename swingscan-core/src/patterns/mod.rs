//! Pattern Detector.
//!
//! 1. Locate peaks and troughs of the close series (and of the oscillator for
//!    divergence), filtered by separation and prominence.
//! 2. Each template walks consecutive extrema of its arity and emits
//!    structurally valid [`Formation`]s with a confirming bar.
//! 3. Every formation goes through the same validation step: the applicable
//!    checks are evaluated, all enabled ones must pass, and entry/stop/target
//!    are derived uniformly from the formation's level and height.

pub mod candle;
pub mod checks;
mod divergence;
pub mod extrema;
mod retest;
mod reversal;

use std::collections::HashSet;

use crate::domain::{Bar, Direction, ExtremumPoint, PatternKind, PatternMatch, PointRole};
use crate::indicators::IndicatorSeries;
use crate::params::{DetectionParams, PatternParams};

/// A structurally valid candidate before confirmation checks.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Formation {
    pub kind: PatternKind,
    /// (bar index, price, role), increasing bar index.
    pub points: Vec<(usize, f64, PointRole)>,
    /// Neckline or broken level.
    pub level: f64,
    /// Measured move projected from `level`.
    pub height: f64,
    /// Price the stop is placed beyond.
    pub stop_anchor: f64,
    pub confirm: usize,
    /// Bar that broke `level`, if the formation has one.
    pub break_bar: Option<usize>,
}

/// Everything a template may read for one symbol.
pub(crate) struct PatternContext<'a> {
    pub bars: &'a [Bar],
    pub series: &'a IndicatorSeries,
    pub params: &'a PatternParams,
    pub lookback: usize,
    pub closes: Vec<f64>,
    pub peaks: Vec<usize>,
    pub troughs: Vec<usize>,
}

impl<'a> PatternContext<'a> {
    fn new(bars: &'a [Bar], series: &'a IndicatorSeries, params: &'a DetectionParams) -> Self {
        let patterns = &params.patterns;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let (lo, hi) = closes
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &c| (lo.min(c), hi.max(c)));
        let min_prominence = if hi > lo {
            (hi - lo) * patterns.prominence_pct / 100.0
        } else {
            0.0
        };
        let warm = series.warmup_end();
        let peaks = extrema::find_peaks(&closes, patterns.min_point_spacing, min_prominence)
            .into_iter()
            .filter(|&i| i >= warm)
            .collect();
        let troughs = extrema::find_troughs(&closes, patterns.min_point_spacing, min_prominence)
            .into_iter()
            .filter(|&i| i >= warm)
            .collect();
        Self {
            bars,
            series,
            params: patterns,
            lookback: params.lookback,
            closes,
            peaks,
            troughs,
        }
    }

    /// First close beyond `level` in `direction` within the confirmation
    /// window after `last`. A close beyond `invalidation` the other way first
    /// voids the formation.
    pub fn find_break(
        &self,
        last: usize,
        level: f64,
        invalidation: f64,
        direction: Direction,
    ) -> Option<usize> {
        let end = (last + self.params.confirmation_window).min(self.closes.len().saturating_sub(1));
        for k in last + 1..=end {
            let close = self.closes[k];
            match direction {
                Direction::Long if close < invalidation => return None,
                Direction::Long if close > level => return Some(k),
                Direction::Short if close > invalidation => return None,
                Direction::Short if close < level => return Some(k),
                _ => {}
            }
        }
        None
    }

    /// Closes strictly between two bar indices.
    pub fn closes_between(&self, a: usize, b: usize) -> &[f64] {
        if b <= a + 1 {
            return &[];
        }
        &self.closes[a + 1..b]
    }
}

pub struct PatternDetector {
    kinds: Vec<PatternKind>,
}

impl PatternDetector {
    pub fn new(params: &DetectionParams) -> Self {
        let kinds = PatternKind::ALL
            .into_iter()
            .filter(|k| params.patterns.is_enabled(*k))
            .collect();
        Self { kinds }
    }

    pub fn kinds(&self) -> &[PatternKind] {
        &self.kinds
    }

    /// All confirmed patterns, ordered by confirming bar then kind.
    pub fn detect(
        &self,
        symbol: &str,
        bars: &[Bar],
        series: &IndicatorSeries,
        params: &DetectionParams,
    ) -> Vec<PatternMatch> {
        if self.kinds.is_empty() || bars.len() != series.len() {
            return Vec::new();
        }
        let ctx = PatternContext::new(bars, series, params);

        let mut matches: Vec<PatternMatch> = self
            .kinds
            .iter()
            .flat_map(|&kind| formations(&ctx, kind))
            .filter_map(|f| finalize(symbol, &ctx, f))
            .collect();

        matches.sort_by_key(|m| (m.confirm_index, m.kind));
        let mut seen = HashSet::new();
        matches.retain(|m| seen.insert((m.kind, m.confirm_index)));
        matches
    }
}

fn formations(ctx: &PatternContext<'_>, kind: PatternKind) -> Vec<Formation> {
    match kind {
        PatternKind::DoubleTop => reversal::tops(ctx, kind, 2),
        PatternKind::TripleTop => reversal::tops(ctx, kind, 3),
        PatternKind::DoubleBottom => reversal::bottoms(ctx, kind, 2),
        PatternKind::TripleBottom => reversal::bottoms(ctx, kind, 3),
        PatternKind::InverseHeadAndShoulders => reversal::inverse_head_and_shoulders(ctx),
        PatternKind::DivergenceBullish => divergence::bullish(ctx),
        PatternKind::DivergenceBearish => divergence::bearish(ctx),
        PatternKind::RetestUptrend => retest::uptrend(ctx),
        PatternKind::RetestDowntrend => retest::downtrend(ctx),
    }
}

/// Run the confirmation checks and derive trade levels.
fn finalize(symbol: &str, ctx: &PatternContext<'_>, f: Formation) -> Option<PatternMatch> {
    let satisfied = checks::evaluate(&f, ctx);
    let required = ctx.params.checks.intersection(checks::applicable(f.kind));
    if !satisfied.is_superset(required) {
        return None;
    }

    let entry_buffer = ctx.params.entry_buffer_pct / 100.0;
    let stop_buffer = ctx.params.stop_buffer_pct / 100.0;
    let bar = &ctx.bars[f.confirm];
    let (entry, stop, target) = match f.kind.direction() {
        Direction::Short => (
            bar.low * (1.0 - entry_buffer),
            f.stop_anchor * (1.0 + stop_buffer),
            f.level - f.height,
        ),
        _ => (
            bar.high * (1.0 + entry_buffer),
            f.stop_anchor * (1.0 - stop_buffer),
            f.level + f.height,
        ),
    };

    Some(PatternMatch {
        symbol: symbol.to_string(),
        kind: f.kind,
        points: f
            .points
            .iter()
            .map(|&(index, price, role)| ExtremumPoint {
                index,
                timestamp: ctx.bars[index].timestamp,
                price,
                role,
            })
            .collect(),
        level: f.level,
        confirm_index: f.confirm,
        confirm_timestamp: bar.timestamp,
        entry,
        stop,
        target,
        confirmations: satisfied,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::{Bar, ConfirmationSet};
    use crate::params::DetectionParams;

    /// Small windows so hand-built fixtures stay short. No checks enabled.
    pub fn params() -> DetectionParams {
        let mut params = DetectionParams {
            lookback: 3,
            volume_window: 3,
            hold_bars: 1,
            ..Default::default()
        };
        params.patterns.min_point_spacing = 2;
        params.patterns.min_span = 2;
        params.patterns.prominence_pct = 0.0;
        params.patterns.oscillator_period = 3;
        params.patterns.oscillator_prominence = 0.0;
        params.patterns.confirmation_window = 10;
        params.patterns.checks = ConfirmationSet::empty();
        params
    }

    /// Bars from closes; open = previous close, wicks of 0.2, volume 1000.
    pub fn bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let open = if i == 0 { close } else { closes[i - 1] };
                Bar {
                    timestamp: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                        .unwrap()
                        .and_hms_opt(0, 0, 0)
                        .unwrap()
                        + chrono::Duration::hours(i as i64),
                    open,
                    high: open.max(close) + 0.2,
                    low: open.min(close) - 0.2,
                    close,
                    volume: 1000.0,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::domain::{ConfirmationCheck, ConfirmationSet};

    /// Warm-up of 3 bars, then a double top at 100/100 with a 95 trough,
    /// broken at bar 11.
    fn double_top_closes() -> Vec<f64> {
        vec![
            90.0, 91.0, 92.0, 95.0, 98.0, 100.0, 97.0, 95.0, 97.0, 100.0, 96.0, 94.0, 93.0, 92.0,
        ]
    }

    fn detect(closes: &[f64], params: &DetectionParams) -> Vec<PatternMatch> {
        let bars = bars(closes);
        let series = IndicatorSeries::compute(&bars, params).unwrap();
        PatternDetector::new(params).detect("TEST", &bars, &series, params)
    }

    fn only(kind: PatternKind) -> DetectionParams {
        let mut p = params();
        p.patterns.kinds = vec![kind];
        p
    }

    #[test]
    fn double_top_detected_with_levels() {
        let found = detect(&double_top_closes(), &only(PatternKind::DoubleTop));
        assert_eq!(found.len(), 1, "{found:?}");
        let m = &found[0];
        assert_eq!(m.kind, PatternKind::DoubleTop);
        assert_eq!(
            m.points.iter().map(|p| p.index).collect::<Vec<_>>(),
            vec![5, 9]
        );
        assert_eq!(m.level, 95.0);
        assert_eq!(m.confirm_index, 11);
        // height = 100 - 95 → target 90; stop beyond the tops
        assert!((m.target - 90.0).abs() < 1e-9);
        assert!((m.stop - 102.0).abs() < 1e-9);
        assert!(m.entry < 94.0);
        assert!(m.confirmations.contains(ConfirmationCheck::PriceSymmetry));
        assert!(m.confirmations.contains(ConfirmationCheck::TimeSpacing));
    }

    #[test]
    fn points_are_time_ordered() {
        let found = detect(&double_top_closes(), &only(PatternKind::DoubleTop));
        for m in &found {
            assert!(m.points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        }
    }

    #[test]
    fn symmetry_boundary_is_inclusive() {
        let mut closes = double_top_closes();
        closes[9] = 102.0; // exactly 2% above the first top
        closes[8] = 98.0;
        let mut params = only(PatternKind::DoubleTop);
        params.patterns.checks = ConfirmationSet::empty().with(ConfirmationCheck::PriceSymmetry);
        assert_eq!(detect(&closes, &params).len(), 1);

        closes[9] = 102.01;
        assert!(detect(&closes, &params).is_empty());
    }

    #[test]
    fn enabled_check_must_pass() {
        let mut params = only(PatternKind::DoubleTop);
        // Flat volume never satisfies a declining-volume requirement.
        params.patterns.checks = ConfirmationSet::empty().with(ConfirmationCheck::VolumeTrend);
        assert!(detect(&double_top_closes(), &params).is_empty());
    }

    #[test]
    fn no_break_no_pattern() {
        let mut closes = double_top_closes();
        closes.truncate(11);
        closes.extend([96.0, 97.0, 96.5]);
        assert!(detect(&closes, &only(PatternKind::DoubleTop)).is_empty());
    }

    #[test]
    fn disabled_kinds_are_skipped() {
        let mut params = params();
        params.patterns.enabled = false;
        assert!(PatternDetector::new(&params).kinds().is_empty());
        assert!(detect(&double_top_closes(), &params).is_empty());
    }

    #[test]
    fn idempotent() {
        let params = params();
        let closes = double_top_closes();
        assert_eq!(detect(&closes, &params), detect(&closes, &params));
    }
}
