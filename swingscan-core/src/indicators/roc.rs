//! Rate of Change (ROC).
//!
//! ROC = (close[t] - close[t-period]) / close[t-period] × 100
//! Lookback: period.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Roc {
    period: usize,
    name: String,
}

impl Roc {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ROC period must be >= 1");
        Self {
            period,
            name: format!("roc_{period}"),
        }
    }
}

impl Indicator for Roc {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        (0..bars.len())
            .map(|i| {
                if i < self.period {
                    return f64::NAN;
                }
                let prev = bars[i - self.period].close;
                if prev == 0.0 {
                    f64::NAN
                } else {
                    (bars[i].close - prev) / prev * 100.0
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn roc_2() {
        let bars = make_bars(&[100.0, 105.0, 110.0, 99.0]);
        let result = Roc::new(2).compute(&bars);
        assert!(result[1].is_nan());
        assert_approx(result[2], 10.0, DEFAULT_EPSILON);
        assert_approx(result[3], (99.0 - 105.0) / 105.0 * 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn roc_zero_base() {
        let bars = make_bars(&[0.0, 1.0]);
        assert!(Roc::new(1).compute(&bars)[1].is_nan());
    }
}
