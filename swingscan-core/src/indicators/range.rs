//! Bar range (high − low) and its rolling average over L bars.
//!
//! Lookback: L - 1 for the average; the raw range has none.

use super::window::RollingMean;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct AvgRange {
    window: usize,
    name: String,
}

impl AvgRange {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "range window must be >= 1");
        Self {
            window,
            name: format!("avg_range_{window}"),
        }
    }
}

impl Indicator for AvgRange {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut acc = RollingMean::new(self.window);
        bars.iter()
            .map(|bar| acc.push(bar.range()).unwrap_or(f64::NAN))
            .collect()
    }
}

pub fn bar_ranges(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(Bar::range).collect()
}
