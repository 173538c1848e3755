//! Average volume and volume ratio.
//!
//! AvgVolume: simple mean of volume over V bars. Lookback: V - 1.
//! VolRatio: volume / AvgVolume, NaN when the mean is zero or undefined.

use super::window::RollingMean;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct AvgVolume {
    window: usize,
    name: String,
}

impl AvgVolume {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "volume window must be >= 1");
        Self {
            window,
            name: format!("avg_volume_{window}"),
        }
    }
}

impl Indicator for AvgVolume {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut acc = RollingMean::new(self.window);
        bars.iter()
            .map(|bar| acc.push(bar.volume).unwrap_or(f64::NAN))
            .collect()
    }
}

/// Volume divided by its average; undefined mean or zero mean maps to NaN.
pub fn volume_ratio(bars: &[Bar], avg_volume: &[f64]) -> Vec<f64> {
    bars.iter()
        .zip(avg_volume)
        .map(|(bar, &avg)| ratio(bar.volume, avg))
        .collect()
}

pub(crate) fn ratio(volume: f64, avg: f64) -> f64 {
    if avg.is_nan() || avg == 0.0 {
        f64::NAN
    } else {
        volume / avg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars_with_volume, DEFAULT_EPSILON};

    #[test]
    fn avg_volume_3() {
        let bars = make_bars_with_volume(&[10.0, 11.0, 12.0, 13.0], &[100.0, 200.0, 300.0, 700.0]);
        let avg = AvgVolume::new(3).compute(&bars);
        assert!(avg[1].is_nan());
        assert_approx(avg[2], 200.0, DEFAULT_EPSILON);
        assert_approx(avg[3], 400.0, DEFAULT_EPSILON);

        let ratio = volume_ratio(&bars, &avg);
        assert!(ratio[0].is_nan());
        assert_approx(ratio[2], 1.5, DEFAULT_EPSILON);
        assert_approx(ratio[3], 1.75, DEFAULT_EPSILON);
    }

    #[test]
    fn zero_average_is_undefined() {
        let bars = make_bars_with_volume(&[10.0, 11.0], &[0.0, 0.0]);
        let avg = AvgVolume::new(2).compute(&bars);
        assert_eq!(avg[1], 0.0);
        assert!(volume_ratio(&bars, &avg)[1].is_nan());
    }
}
