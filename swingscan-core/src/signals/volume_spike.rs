//! Volume spike: a short-interval bar trading at least the average volume of
//! a longer reference series.
//!
//! The reference is the mean volume of the last `window` coarse bars that
//! had closed when the fine bar opened. A coarse bar still in progress, such
//! as the hour a 15-minute bar sits in, never contributes. Price movement is
//! not considered.

use crate::domain::{Bar, Direction, Interval, Signal, SignalKind, SignalSource};
use crate::indicators::window::RollingMean;

/// Scan `fine` bars against a rolling average of `coarse` bar volume.
///
/// Both sequences must be in increasing timestamp order; `coarse_interval`
/// is the length of one coarse bar. Fine bars without a full reference
/// window are skipped.
pub fn detect_volume_spikes(
    symbol: &str,
    fine: &[Bar],
    coarse: &[Bar],
    coarse_interval: Interval,
    window: usize,
) -> Vec<Signal> {
    if window == 0 {
        return Vec::new();
    }
    let span = coarse_interval.duration();
    let mut mean = RollingMean::new(window);
    let mut reference = None;
    let mut next_coarse = 0;
    let mut signals = Vec::new();

    for (i, bar) in fine.iter().enumerate() {
        while next_coarse < coarse.len() && coarse[next_coarse].timestamp + span <= bar.timestamp {
            reference = mean.push(coarse[next_coarse].volume);
            next_coarse += 1;
        }
        let Some(avg) = reference.filter(|avg| *avg > 0.0) else {
            continue;
        };
        if bar.volume >= avg {
            signals.push(Signal {
                symbol: symbol.to_string(),
                kind: SignalKind::VolumeSpike,
                direction: Direction::Neutral,
                bar_index: i,
                timestamp: bar.timestamp,
                price: bar.close,
                volume_ratio: bar.volume / avg,
                level: avg,
                range: Some(bar.range()),
                avg_range: None,
                source: SignalSource::VolumeSpike,
            });
        }
    }
    signals
}
