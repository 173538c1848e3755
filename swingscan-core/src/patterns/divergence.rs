//! Oscillator divergence.
//!
//! Bullish: two consecutive price troughs where price makes a lower low and
//! the oscillator makes a higher low. Bearish mirrors it at peaks. The
//! oscillator value for a price extremum is the oscillator extremum found in
//! the `divergence_alignment` bars up to and including it.
//!
//! A divergence confirms on the first close back through the highest (or
//! lowest) close between the two extrema, within the confirmation window.

use super::extrema::{find_peaks, find_troughs};
use super::reversal::{max, min, well_spaced};
use super::{Formation, PatternContext};
use crate::domain::{Direction, PatternKind, PointRole};

pub(crate) fn bullish(ctx: &PatternContext<'_>) -> Vec<Formation> {
    let p = ctx.params;
    let osc = &ctx.series.oscillator;
    let osc_troughs = find_troughs(osc, p.min_point_spacing, p.oscillator_prominence);

    let mut out = Vec::new();
    for w in ctx.troughs.windows(2) {
        let (t1, t2) = (w[0], w[1]);
        if !well_spaced(&[t1, t2], p) {
            continue;
        }
        let (p1, p2) = (ctx.closes[t1], ctx.closes[t2]);
        let (Some(o1), Some(o2)) = (
            aligned(osc, &osc_troughs, t1, p.divergence_alignment, f64::min),
            aligned(osc, &osc_troughs, t2, p.divergence_alignment, f64::min),
        ) else {
            continue;
        };
        if !(p2 < p1 && o2 > o1) {
            continue;
        }
        let Some(neckline) = max(ctx.closes_between(t1, t2)) else {
            continue;
        };
        let Some(confirm) = ctx.find_break(t2, neckline, p2, Direction::Long) else {
            continue;
        };
        out.push(Formation {
            kind: PatternKind::DivergenceBullish,
            points: vec![(t1, p1, PointRole::Trough), (t2, p2, PointRole::Trough)],
            level: neckline,
            height: neckline - p2,
            stop_anchor: p2,
            confirm,
            break_bar: Some(confirm),
        });
    }
    out
}

pub(crate) fn bearish(ctx: &PatternContext<'_>) -> Vec<Formation> {
    let p = ctx.params;
    let osc = &ctx.series.oscillator;
    let osc_peaks = find_peaks(osc, p.min_point_spacing, p.oscillator_prominence);

    let mut out = Vec::new();
    for w in ctx.peaks.windows(2) {
        let (t1, t2) = (w[0], w[1]);
        if !well_spaced(&[t1, t2], p) {
            continue;
        }
        let (p1, p2) = (ctx.closes[t1], ctx.closes[t2]);
        let (Some(o1), Some(o2)) = (
            aligned(osc, &osc_peaks, t1, p.divergence_alignment, f64::max),
            aligned(osc, &osc_peaks, t2, p.divergence_alignment, f64::max),
        ) else {
            continue;
        };
        if !(p2 > p1 && o2 < o1) {
            continue;
        }
        let Some(neckline) = min(ctx.closes_between(t1, t2)) else {
            continue;
        };
        let Some(confirm) = ctx.find_break(t2, neckline, p2, Direction::Short) else {
            continue;
        };
        out.push(Formation {
            kind: PatternKind::DivergenceBearish,
            points: vec![(t1, p1, PointRole::Peak), (t2, p2, PointRole::Peak)],
            level: neckline,
            height: p2 - neckline,
            stop_anchor: p2,
            confirm,
            break_bar: Some(confirm),
        });
    }
    out
}

/// Most extreme oscillator extremum within `[index - alignment, index]`.
fn aligned(
    osc: &[f64],
    extrema: &[usize],
    index: usize,
    alignment: usize,
    pick: fn(f64, f64) -> f64,
) -> Option<f64> {
    let from = index.saturating_sub(alignment);
    extrema
        .iter()
        .filter(|&&j| j >= from && j <= index)
        .map(|&j| osc[j])
        .filter(|v| !v.is_nan())
        .reduce(pick)
}
