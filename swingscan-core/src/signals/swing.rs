//! Swing breakout / breakdown.
//!
//! Breakout at i: close[i-1] <= swing_high[i-1] < close[i], vol_ratio[i] >= M,
//! and the bar is directionally strong (close > open, or range > avg_range).
//! Breakdown mirrors this against swing_low with the bearish strength test.
//!
//! The level compared is always the one established at i-1; the swing band at
//! i already contains bar i and would let the bar break itself.

use super::{RuleContext, SignalRule};
use crate::domain::{Direction, Signal, SignalKind, SignalSource};
use crate::indicators::defined;

#[derive(Debug, Clone, Copy, Default)]
pub struct SwingBreakout;

#[derive(Debug, Clone, Copy, Default)]
pub struct SwingBreakdown;

impl SignalRule for SwingBreakout {
    fn kind(&self) -> SignalKind {
        SignalKind::Breakout
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, i: usize) -> Option<Signal> {
        if i == 0 {
            return None;
        }
        let level = defined(&ctx.series.swing_high, i - 1)?;
        let ratio = defined(&ctx.series.vol_ratio, i)?;
        let (prev, bar) = (&ctx.bars[i - 1], &ctx.bars[i]);

        let crossed = prev.close <= level && bar.close > level;
        let strong = bar.is_bullish() || expands_range(ctx, i);
        (crossed && ratio >= ctx.volume_multiplier && strong)
            .then(|| build(ctx, i, SignalKind::Breakout, Direction::Long, level, ratio))
    }
}

impl SignalRule for SwingBreakdown {
    fn kind(&self) -> SignalKind {
        SignalKind::Breakdown
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, i: usize) -> Option<Signal> {
        if i == 0 {
            return None;
        }
        let level = defined(&ctx.series.swing_low, i - 1)?;
        let ratio = defined(&ctx.series.vol_ratio, i)?;
        let (prev, bar) = (&ctx.bars[i - 1], &ctx.bars[i]);

        let crossed = prev.close >= level && bar.close < level;
        let strong = bar.is_bearish() || expands_range(ctx, i);
        (crossed && ratio >= ctx.volume_multiplier && strong)
            .then(|| build(ctx, i, SignalKind::Breakdown, Direction::Short, level, ratio))
    }
}

/// Range above its rolling average; false while the average is undefined.
fn expands_range(ctx: &RuleContext<'_>, i: usize) -> bool {
    defined(&ctx.series.avg_range, i).is_some_and(|avg| ctx.series.range[i] > avg)
}

fn build(
    ctx: &RuleContext<'_>,
    i: usize,
    kind: SignalKind,
    direction: Direction,
    level: f64,
    volume_ratio: f64,
) -> Signal {
    let bar = &ctx.bars[i];
    Signal {
        symbol: ctx.symbol.to_string(),
        kind,
        direction,
        bar_index: i,
        timestamp: bar.timestamp,
        price: bar.close,
        volume_ratio,
        level,
        range: Some(ctx.series.range[i]),
        avg_range: defined(&ctx.series.avg_range, i),
        source: SignalSource::Swing,
    }
}
