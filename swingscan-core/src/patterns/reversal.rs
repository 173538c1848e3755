//! Double/triple tops and bottoms, inverse head-and-shoulders.

use super::checks::within_symmetry;
use super::{Formation, PatternContext};
use crate::domain::{Direction, PatternKind, PointRole};
use crate::params::PatternParams;

/// Spacing and span limits between formation points. These hold for every
/// template regardless of which optional checks are enabled.
pub(crate) fn well_spaced(indices: &[usize], params: &PatternParams) -> bool {
    let (Some(&first), Some(&last)) = (indices.first(), indices.last()) else {
        return false;
    };
    let span = last - first;
    indices.windows(2).all(|w| w[1] - w[0] >= params.min_point_spacing)
        && span >= params.min_span
        && span <= params.max_span
}

/// `arity` consecutive peaks confirmed by a close under the lowest close
/// between the first and last peak.
pub(crate) fn tops(ctx: &PatternContext<'_>, kind: PatternKind, arity: usize) -> Vec<Formation> {
    let mut out = Vec::new();
    for w in ctx.peaks.windows(arity) {
        let (first, last) = (w[0], w[arity - 1]);
        let prices: Vec<f64> = w.iter().map(|&i| ctx.closes[i]).collect();
        if !well_spaced(w, ctx.params)
            || !within_symmetry(&prices, ctx.params.symmetry_tolerance_pct)
        {
            continue;
        }
        let Some(neckline) = min(ctx.closes_between(first, last)) else {
            continue;
        };
        let highest = max(&prices).unwrap_or(neckline);
        let Some(confirm) = ctx.find_break(last, neckline, highest, Direction::Short) else {
            continue;
        };
        out.push(Formation {
            kind,
            points: w.iter().zip(&prices).map(|(&i, &p)| (i, p, PointRole::Peak)).collect(),
            level: neckline,
            height: mean(&prices) - neckline,
            stop_anchor: highest,
            confirm,
            break_bar: Some(confirm),
        });
    }
    out
}

/// `arity` consecutive troughs confirmed by a close over the highest close
/// between the first and last trough.
pub(crate) fn bottoms(ctx: &PatternContext<'_>, kind: PatternKind, arity: usize) -> Vec<Formation> {
    let mut out = Vec::new();
    for w in ctx.troughs.windows(arity) {
        let (first, last) = (w[0], w[arity - 1]);
        let prices: Vec<f64> = w.iter().map(|&i| ctx.closes[i]).collect();
        if !well_spaced(w, ctx.params)
            || !within_symmetry(&prices, ctx.params.symmetry_tolerance_pct)
        {
            continue;
        }
        let Some(neckline) = max(ctx.closes_between(first, last)) else {
            continue;
        };
        let lowest = min(&prices).unwrap_or(neckline);
        let Some(confirm) = ctx.find_break(last, neckline, lowest, Direction::Long) else {
            continue;
        };
        out.push(Formation {
            kind,
            points: w.iter().zip(&prices).map(|(&i, &p)| (i, p, PointRole::Trough)).collect(),
            level: neckline,
            height: neckline - mean(&prices),
            stop_anchor: lowest,
            confirm,
            break_bar: Some(confirm),
        });
    }
    out
}

/// Three consecutive troughs with the middle one strictly lowest; the
/// neckline is the highest close between the shoulders.
pub(crate) fn inverse_head_and_shoulders(ctx: &PatternContext<'_>) -> Vec<Formation> {
    let mut out = Vec::new();
    for w in ctx.troughs.windows(3) {
        let (left, head, right) = (w[0], w[1], w[2]);
        let (l, h, r) = (ctx.closes[left], ctx.closes[head], ctx.closes[right]);
        // shoulders are compared with each other, never with the head
        if !(h < l && h < r)
            || !well_spaced(w, ctx.params)
            || !within_symmetry(&[l, r], ctx.params.symmetry_tolerance_pct)
        {
            continue;
        }
        let Some(neckline) = max(ctx.closes_between(left, right)) else {
            continue;
        };
        let Some(confirm) = ctx.find_break(right, neckline, h, Direction::Long) else {
            continue;
        };
        out.push(Formation {
            kind: PatternKind::InverseHeadAndShoulders,
            points: vec![
                (left, l, PointRole::LeftShoulder),
                (head, h, PointRole::Head),
                (right, r, PointRole::RightShoulder),
            ],
            level: neckline,
            height: neckline - h,
            stop_anchor: h,
            confirm,
            break_bar: Some(confirm),
        });
    }
    out
}

pub(crate) fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub(crate) fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
