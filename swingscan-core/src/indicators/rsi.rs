//! Relative Strength Index (RSI) with simple rolling means.
//!
//! avg_gain / avg_loss are plain means of the last `period` close-to-close
//! changes (no Wilder smoothing), so the value depends only on a fixed window.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period.
//! Edge cases: avg_loss == 0 → 100 (50 if avg_gain is also 0); avg_gain == 0 → 0.

use super::window::RollingMean;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut result = vec![f64::NAN; bars.len()];
        let mut gains = RollingMean::new(self.period);
        let mut losses = RollingMean::new(self.period);

        for i in 1..bars.len() {
            let change = bars[i].close - bars[i - 1].close;
            let gain = gains.push(change.max(0.0));
            let loss = losses.push((-change).max(0.0));
            if let (Some(g), Some(l)) = (gain, loss) {
                result[i] = compute_rsi(g, l);
            }
        }
        result
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn rsi_warmup_and_value() {
        // changes: +1, -1, +2, +1
        let bars = make_bars(&[10.0, 11.0, 10.0, 12.0, 13.0]);
        let result = Rsi::new(2).compute(&bars);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        // window (+1, -1): gain 0.5, loss 0.5 → 50
        assert_approx(result[2], 50.0, DEFAULT_EPSILON);
        // window (-1, +2): gain 1.0, loss 0.5 → rs 2 → 66.67
        assert_approx(result[3], 100.0 - 100.0 / 3.0, DEFAULT_EPSILON);
        // window (+2, +1): no losses → 100
        assert_approx(result[4], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_flat_is_neutral() {
        let bars = make_bars(&[10.0; 6]);
        let result = Rsi::new(3).compute(&bars);
        assert_approx(result[5], 50.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_falling_is_zero() {
        let bars = make_bars(&[10.0, 9.0, 8.0, 7.0]);
        let result = Rsi::new(3).compute(&bars);
        assert_approx(result[3], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_bounded() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + ((i * 7) % 11) as f64).collect();
        let result = Rsi::new(14).compute(&make_bars(&closes));
        for v in result.iter().skip(14) {
            assert!((0.0..=100.0).contains(v));
        }
    }
}
