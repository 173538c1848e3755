//! Confirmation checks, evaluated uniformly for every formation.
//!
//! Each check declares the pattern kinds it applies to. A formation records
//! every applicable check it satisfies; the detector then requires the
//! enabled ∩ applicable subset to be present.
//!
//! Point spacing, span and like-point symmetry are also enforced by the
//! templates themselves, so for reversal kinds `PriceSymmetry` and
//! `TimeSpacing` only report. Likewise every retest carries `ReversalCandle`.

use super::{candle, Formation, PatternContext};
use crate::domain::{ConfirmationCheck, ConfirmationSet, PatternKind, PointRole};
use crate::indicators::defined;

/// Checks that carry meaning for `kind`.
pub fn applicable(kind: PatternKind) -> ConfirmationSet {
    ConfirmationCheck::ALL
        .into_iter()
        .filter(|&check| applies(check, kind))
        .collect()
}

pub fn applies(check: ConfirmationCheck, kind: PatternKind) -> bool {
    use ConfirmationCheck::*;
    use PatternKind::*;

    let reversal = kind.is_top() || kind.is_bottom();
    let divergence = matches!(kind, DivergenceBullish | DivergenceBearish);
    let retest = matches!(kind, RetestUptrend | RetestDowntrend);
    match check {
        PriceSymmetry => reversal,
        TimeSpacing => reversal || divergence,
        VolumeTrend => reversal || retest,
        OscillatorExtreme => reversal || divergence,
        ReversalCandle => true,
        BreakVolume => reversal || retest,
    }
}

/// True if the spread of `prices` is within `tolerance_pct` of the lowest.
/// The boundary is inclusive.
pub fn within_symmetry(prices: &[f64], tolerance_pct: f64) -> bool {
    let (lo, hi) = prices
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &p| (lo.min(p), hi.max(p)));
    if prices.is_empty() || lo <= 0.0 {
        return false;
    }
    (hi - lo) * 100.0 <= tolerance_pct * lo
}

pub(crate) fn evaluate(f: &Formation, ctx: &PatternContext<'_>) -> ConfirmationSet {
    applicable(f.kind)
        .iter()
        .filter(|&check| passes(check, f, ctx))
        .collect()
}

fn passes(check: ConfirmationCheck, f: &Formation, ctx: &PatternContext<'_>) -> bool {
    let p = ctx.params;
    match check {
        ConfirmationCheck::PriceSymmetry => {
            let like: Vec<f64> = f
                .points
                .iter()
                .filter(|(_, _, role)| !matches!(role, PointRole::Head))
                .map(|&(_, price, _)| price)
                .collect();
            within_symmetry(&like, p.symmetry_tolerance_pct)
        }
        ConfirmationCheck::TimeSpacing => {
            let (Some(first), Some(last)) = (f.points.first(), f.points.last()) else {
                return false;
            };
            let span = last.0 - first.0;
            let spaced = f
                .points
                .windows(2)
                .all(|w| w[1].0 - w[0].0 >= p.min_point_spacing);
            spaced && span >= p.min_span && span <= p.max_span
        }
        ConfirmationCheck::VolumeTrend => {
            let volumes: Vec<f64> = f.points.iter().map(|&(i, _, _)| ctx.bars[i].volume).collect();
            if f.kind.is_top() {
                volumes.windows(2).all(|w| w[1] < w[0])
            } else if f.kind.is_bottom() {
                volumes.windows(2).all(|w| w[1] > w[0])
            } else {
                // retest: the pull-back trades lighter than the break
                volumes.len() == 2 && volumes[1] < volumes[0]
            }
        }
        ConfirmationCheck::OscillatorExtreme => {
            let (Some(first), Some(last)) = (f.points.first(), f.points.last()) else {
                return false;
            };
            let osc = &ctx.series.oscillator;
            let (Some(a), Some(b)) = (defined(osc, first.0), defined(osc, last.0)) else {
                return false;
            };
            if f.kind.is_top() || f.kind == PatternKind::DivergenceBearish {
                a >= p.overbought && b >= p.overbought
            } else {
                a <= p.oversold && b <= p.oversold
            }
        }
        ConfirmationCheck::ReversalCandle => {
            candle::is_reversal(ctx.bars, f.confirm, f.kind.direction())
        }
        ConfirmationCheck::BreakVolume => f.break_bar.is_some_and(|b| {
            defined(&ctx.series.vol_ratio, b).is_some_and(|r| r >= p.break_volume_multiplier)
        }),
    }
}
