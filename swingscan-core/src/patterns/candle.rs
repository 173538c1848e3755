//! Reversal candle shapes.

use crate::domain::{Bar, Direction};

/// Lower (or upper) wick must exceed this multiple of the body for a pin bar.
const PIN_WICK_TO_BODY: f64 = 1.5;

/// True if bar `i` has a reversal shape in `direction`: a pin bar rejecting
/// the opposite side, an engulfing body, or a strong close in the top (or
/// bottom) third of the range.
pub fn is_reversal(bars: &[Bar], i: usize, direction: Direction) -> bool {
    match direction {
        Direction::Long => is_bullish_reversal(bars, i),
        Direction::Short => is_bearish_reversal(bars, i),
        Direction::Neutral => false,
    }
}

pub fn is_bullish_reversal(bars: &[Bar], i: usize) -> bool {
    let Some(bar) = bars.get(i) else {
        return false;
    };
    let pin = bar.lower_wick() > PIN_WICK_TO_BODY * bar.body() && bar.lower_wick() > bar.upper_wick();
    let engulfing = i > 0 && {
        let prev = &bars[i - 1];
        prev.is_bearish() && bar.is_bullish() && bar.close >= prev.open && bar.open <= prev.close
    };
    let strong_close = bar.is_bullish() && bar.range() > 0.0 && (bar.close - bar.low) * 3.0 >= bar.range() * 2.0;
    pin || engulfing || strong_close
}

pub fn is_bearish_reversal(bars: &[Bar], i: usize) -> bool {
    let Some(bar) = bars.get(i) else {
        return false;
    };
    let pin = bar.upper_wick() > PIN_WICK_TO_BODY * bar.body() && bar.upper_wick() > bar.lower_wick();
    let engulfing = i > 0 && {
        let prev = &bars[i - 1];
        prev.is_bullish() && bar.is_bearish() && bar.close <= prev.open && bar.open >= prev.close
    };
    let strong_close = bar.is_bearish() && bar.range() > 0.0 && (bar.high - bar.close) * 3.0 >= bar.range() * 2.0;
    pin || engulfing || strong_close
}
