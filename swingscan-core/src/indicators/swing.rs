//! Swing levels: rolling extrema of high/low pulled inward by a fixed margin.
//!
//! - High: max(high[t-L+1..=t]) × (1 − margin)
//! - Low:  min(low[t-L+1..=t]) × (1 + margin)
//!
//! Lookback: L - 1.

use super::window::RollingExtremum;
use super::Indicator;
use crate::domain::Bar;
use crate::params::SWING_MARGIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwingBand {
    High,
    Low,
}

#[derive(Debug, Clone)]
pub struct SwingLevel {
    lookback: usize,
    band: SwingBand,
    name: String,
}

impl SwingLevel {
    pub fn high(lookback: usize) -> Self {
        assert!(lookback >= 1, "swing lookback must be >= 1");
        Self {
            lookback,
            band: SwingBand::High,
            name: format!("swing_high_{lookback}"),
        }
    }

    pub fn low(lookback: usize) -> Self {
        assert!(lookback >= 1, "swing lookback must be >= 1");
        Self {
            lookback,
            band: SwingBand::Low,
            name: format!("swing_low_{lookback}"),
        }
    }
}

impl Indicator for SwingLevel {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.lookback - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let (mut acc, scale) = match self.band {
            SwingBand::High => (RollingExtremum::max(self.lookback), 1.0 - SWING_MARGIN),
            SwingBand::Low => (RollingExtremum::min(self.lookback), 1.0 + SWING_MARGIN),
        };
        bars.iter()
            .map(|bar| {
                let value = match self.band {
                    SwingBand::High => bar.high,
                    SwingBand::Low => bar.low,
                };
                acc.push(value).map_or(f64::NAN, |extreme| extreme * scale)
            })
            .collect()
    }
}
