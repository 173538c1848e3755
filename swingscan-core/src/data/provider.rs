//! Bar-supply trait and structured error types.
//!
//! `BarSource` abstracts over where bars come from (Yahoo chart API, the
//! synthetic generator, test fixtures) so the backtest and the monitor can
//! swap implementations and mock in tests.

use crate::domain::{Bar, Interval};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

/// Failures while obtaining bars. Every variant means the symbol's data is
/// unavailable for this run; callers exclude the symbol and carry on.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error("no data for {symbol}: {reason}")]
    Unavailable { symbol: String, reason: String },

    #[error("http error: {0}")]
    Http(String),

    #[error("unparseable response: {0}")]
    Parse(String),

    #[error("circuit breaker open: provider refused for {remaining_secs}s")]
    CircuitOpen { remaining_secs: u64 },

    #[error("interval {0} not supported by this source")]
    InvalidInterval(Interval),
}

impl DataError {
    pub fn unavailable(symbol: &str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }
}

/// A supplier of OHLCV bars.
///
/// Implementations return bars with timestamps in the exchange's local time,
/// in strictly increasing order, covering `[start, end)`.
#[async_trait]
pub trait BarSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    async fn fetch_bars(
        &self,
        symbol: &str,
        interval: Interval,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, DataError>;
}

#[async_trait]
impl<T: BarSource + ?Sized> BarSource for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch_bars(
        &self,
        symbol: &str,
        interval: Interval,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, DataError> {
        (**self).fetch_bars(symbol, interval, start, end).await
    }
}
