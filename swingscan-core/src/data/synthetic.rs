//! Deterministic synthetic bar source for offline runs, demos and benches.
//!
//! Each (symbol, trading day, interval) gets its own BLAKE3-derived seed, so
//! any window of bars is identical no matter which range was requested or in
//! which order symbols are fetched.

use super::provider::{BarSource, DataError};
use crate::domain::{Bar, Interval, SessionHours};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    session: SessionHours,
    /// Per-bar return scale.
    volatility: f64,
    /// Probability that a bar carries a volume burst.
    burst_probability: f64,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(SessionHours::default())
    }
}

impl SyntheticSource {
    pub fn new(session: SessionHours) -> Self {
        Self {
            session,
            volatility: 0.004,
            burst_probability: 0.05,
        }
    }

    fn symbol_hash(symbol: &str) -> u64 {
        let hash = blake3::hash(symbol.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }

    fn day_rng(symbol: &str, date: NaiveDate, interval: Interval) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(symbol.as_bytes());
        hasher.update(&date.num_days_from_ce().to_le_bytes());
        hasher.update(&interval.as_minutes().to_le_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    /// Opening price for a day: a slow deterministic drift around the
    /// symbol's base price so consecutive days join up smoothly.
    fn day_anchor(symbol: &str, date: NaiveDate) -> f64 {
        let h = Self::symbol_hash(symbol);
        let base = 100.0 + (h % 1000) as f64;
        let phase = (h >> 16) as f64 % 97.0;
        let day = f64::from(date.num_days_from_ce()) + phase;
        base * (1.0 + 0.12 * (day / 23.0).sin() + 0.04 * (day / 6.0).sin())
    }

    fn base_volume(symbol: &str) -> f64 {
        10_000.0 + (Self::symbol_hash(symbol) >> 32) as f64 % 90_000.0
    }

    fn day_bars(&self, symbol: &str, date: NaiveDate, interval: Interval) -> Vec<Bar> {
        let mut rng = Self::day_rng(symbol, date, interval);
        let base_volume = Self::base_volume(symbol);
        let starts = self.session.bar_starts(date, interval);
        let scale = self.volatility * (starts.len().max(1) as f64).sqrt().recip() * 3.0;

        let mut price = Self::day_anchor(symbol, date);
        starts
            .into_iter()
            .map(|timestamp| {
                let open = price;
                let close = open * (1.0 + rng.gen_range(-1.0..1.0) * scale);
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..scale));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..scale));
                let mut volume = base_volume * rng.gen_range(0.5..1.5);
                if rng.gen_bool(self.burst_probability) {
                    volume *= rng.gen_range(2.0..4.0);
                }
                price = close;
                Bar {
                    timestamp,
                    open,
                    high,
                    low,
                    close,
                    volume: volume.round(),
                }
            })
            .collect()
    }

    /// Bars for `symbol` covering `[start, end)` on weekdays.
    pub fn generate(
        &self,
        symbol: &str,
        interval: Interval,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Vec<Bar> {
        start
            .date()
            .iter_days()
            .take_while(|d| *d <= end.date())
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .flat_map(|d| self.day_bars(symbol, d, interval))
            .filter(|b| b.timestamp >= start && b.timestamp < end)
            .collect()
    }
}

#[async_trait]
impl BarSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn fetch_bars(
        &self,
        symbol: &str,
        interval: Interval,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, DataError> {
        let bars = self.generate(symbol, interval, start, end);
        if bars.is_empty() {
            return Err(DataError::unavailable(symbol, "no session bars in range"));
        }
        Ok(bars)
    }
}
