//! Momentum buildup: pre-breakout acceleration.
//!
//! Fires at i when |ROC(i)| >= the configured minimum, the last N closes move
//! strictly in the ROC's direction, and volume rises strictly across those N
//! bars. Swing levels are not consulted, so this can fire before a breakout.

use super::{RuleContext, SignalRule};
use crate::domain::{Direction, Signal, SignalKind, SignalSource};
use crate::indicators::defined;

#[derive(Debug, Clone, Copy, Default)]
pub struct MomentumBuildup;

impl SignalRule for MomentumBuildup {
    fn kind(&self) -> SignalKind {
        SignalKind::MomentumBuildup
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, i: usize) -> Option<Signal> {
        let settings = &ctx.params.momentum;
        let run = settings.run_length;
        if i < run {
            return None;
        }
        let roc = defined(&ctx.series.roc, i)?;
        if roc.abs() < settings.min_roc_pct {
            return None;
        }
        let direction = if roc > 0.0 {
            Direction::Long
        } else {
            Direction::Short
        };

        let window = &ctx.bars[i - run..=i];
        let one_way = window.windows(2).all(|w| match direction {
            Direction::Long => w[1].close > w[0].close,
            _ => w[1].close < w[0].close,
        });
        let rising_volume = window.windows(2).all(|w| w[1].volume > w[0].volume);
        if !(one_way && rising_volume) {
            return None;
        }

        let bar = &ctx.bars[i];
        Some(Signal {
            symbol: ctx.symbol.to_string(),
            kind: SignalKind::MomentumBuildup,
            direction,
            bar_index: i,
            timestamp: bar.timestamp,
            price: bar.close,
            volume_ratio: ctx.series.vol_ratio[i],
            level: roc,
            range: Some(ctx.series.range[i]),
            avg_range: defined(&ctx.series.avg_range, i),
            source: SignalSource::Momentum,
        })
    }
}
