//! Shared fixtures for runner integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;
use swingscan_core::data::{BarSource, DataError};
use swingscan_core::domain::{Bar, Interval};
use swingscan_core::DetectionParams;

/// L = 5, V = 10, M = 1.6, H = 3.
pub fn params() -> DetectionParams {
    DetectionParams {
        lookback: 5,
        volume_window: 10,
        volume_multiplier: 1.6,
        hold_bars: 3,
        ..Default::default()
    }
}

/// Hourly bars under a flat swing-high of exactly 100; bar 15 closes at 101
/// on a volume ratio of 2.0. `first` is the timestamp of bar 0.
pub fn breakout_bars(first: NaiveDateTime, len: usize) -> Vec<Bar> {
    (0..len)
        .map(|i| {
            let (open, high, close, volume) = match i {
                15 => (99.0, 101.5, 101.0, 2250.0),
                16.. => (100.8, 101.5, 101.0, 1000.0),
                _ => (98.5, 100.0 / 0.995, 99.0, 1000.0),
            };
            Bar {
                timestamp: first + Duration::hours(i as i64),
                open,
                high,
                low: 98.0,
                close,
                volume,
            }
        })
        .collect()
}

/// Serves fixed bars per symbol; anything else is unavailable.
#[derive(Debug, Default)]
pub struct FixedSource {
    pub bars: HashMap<String, Vec<Bar>>,
}

impl FixedSource {
    pub fn with(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.bars.insert(symbol.to_string(), bars);
        self
    }
}

#[async_trait]
impl BarSource for FixedSource {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn fetch_bars(
        &self,
        symbol: &str,
        _interval: Interval,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, DataError> {
        let bars: Vec<Bar> = self
            .bars
            .get(symbol)
            .ok_or_else(|| DataError::unavailable(symbol, "unknown symbol"))?
            .iter()
            .filter(|b| b.timestamp >= start && b.timestamp < end)
            .cloned()
            .collect();
        if bars.is_empty() {
            return Err(DataError::unavailable(symbol, "no bars in range"));
        }
        Ok(bars)
    }
}
