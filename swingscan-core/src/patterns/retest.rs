//! Support/resistance retests.
//!
//! Uptrend: a close breaks above the prior swing high, then within the retest
//! window a bar's low returns to within tolerance of that level, with no close
//! having fallen through it by more than the tolerance, on a smaller move than
//! the breakout bar's, and the retest bar is a bullish reversal candle.
//! Downtrend mirrors it against the swing low.

use super::{candle, Formation, PatternContext};
use crate::domain::{Direction, PatternKind, PointRole};
use crate::indicators::defined;

pub(crate) fn uptrend(ctx: &PatternContext<'_>) -> Vec<Formation> {
    scan(ctx, Direction::Long)
}

pub(crate) fn downtrend(ctx: &PatternContext<'_>) -> Vec<Formation> {
    scan(ctx, Direction::Short)
}

fn scan(ctx: &PatternContext<'_>, direction: Direction) -> Vec<Formation> {
    let (levels, kind) = match direction {
        Direction::Short => (&ctx.series.swing_low, PatternKind::RetestDowntrend),
        _ => (&ctx.series.swing_high, PatternKind::RetestUptrend),
    };
    let len = ctx.closes.len();
    let mut out = Vec::new();
    let mut b = ctx.series.warmup_end().max(1);

    while b < len {
        let Some(level) = defined(levels, b - 1) else {
            b += 1;
            continue;
        };
        let (prev, close) = (ctx.closes[b - 1], ctx.closes[b]);
        let broke = match direction {
            Direction::Short => prev >= level && close < level,
            _ => prev <= level && close > level,
        };
        if !broke {
            b += 1;
            continue;
        }
        match find_retest(ctx, b, level, (close - prev).abs(), direction) {
            Some(k) => {
                out.push(formation(ctx, kind, direction, b, k, level));
                b = k + 1;
            }
            None => b += 1,
        }
    }
    out
}

fn find_retest(
    ctx: &PatternContext<'_>,
    b: usize,
    level: f64,
    breakout_move: f64,
    direction: Direction,
) -> Option<usize> {
    let tol = ctx.params.retest_tolerance_pct / 100.0;
    let end = (b + ctx.params.retest_window).min(ctx.closes.len() - 1);
    for k in b + 1..=end {
        let bar = &ctx.bars[k];
        let pullback = (ctx.closes[k] - ctx.closes[k - 1]).abs();
        let touched = match direction {
            Direction::Short => {
                if bar.close > level * (1.0 + tol) {
                    return None;
                }
                bar.high >= level * (1.0 - tol)
            }
            _ => {
                if bar.close < level * (1.0 - tol) {
                    return None;
                }
                bar.low <= level * (1.0 + tol)
            }
        };
        if touched && pullback < breakout_move && candle::is_reversal(ctx.bars, k, direction) {
            return Some(k);
        }
    }
    None
}

fn formation(
    ctx: &PatternContext<'_>,
    kind: PatternKind,
    direction: Direction,
    b: usize,
    k: usize,
    level: f64,
) -> Formation {
    let before = &ctx.bars[b.saturating_sub(ctx.lookback)..b];
    let retest_bar = &ctx.bars[k];
    let (retest_price, height, stop_anchor) = match direction {
        Direction::Short => {
            let top = before.iter().map(|bar| bar.high).fold(level, f64::max);
            (retest_bar.high, top - level, retest_bar.high.max(level))
        }
        _ => {
            let bottom = before.iter().map(|bar| bar.low).fold(level, f64::min);
            (retest_bar.low, level - bottom, retest_bar.low.min(level))
        }
    };
    Formation {
        kind,
        points: vec![
            (b, ctx.closes[b], PointRole::Break),
            (k, retest_price, PointRole::Retest),
        ],
        level,
        height,
        stop_anchor,
        confirm: k,
        break_bar: Some(b),
    }
}
