//! Bar Store assembly.
//!
//! A symbol's series is stitched together from a historical fetch and a
//! current-session fetch. Session bars win where the two overlap (the
//! historical provider may hold a stale copy of today's first bars), the
//! result is strictly increasing in time, and bars failing the OHLCV sanity
//! check are dropped rather than repaired.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use swingscan_core::data::{BarSource, DataError};
use swingscan_core::domain::{Bar, Interval};
use tracing::{debug, warn};

/// Merge two bar sequences into one ordered, de-duplicated, sane series.
pub fn assemble(historical: Vec<Bar>, session: Vec<Bar>) -> Vec<Bar> {
    let mut store: BTreeMap<NaiveDateTime, Bar> = BTreeMap::new();
    let mut dropped = 0usize;
    for bar in historical.into_iter().chain(session) {
        if bar.is_sane() {
            store.insert(bar.timestamp, bar);
        } else {
            dropped += 1;
        }
    }
    if dropped > 0 {
        debug!(dropped, "dropped insane bars while assembling");
    }
    store.into_values().collect()
}

/// Where one symbol's bars come from.
#[derive(Debug, Clone, Copy)]
pub struct FetchWindow {
    pub interval: Interval,
    /// Start of history.
    pub start: NaiveDateTime,
    /// Start of the current session; bars from here on come from the
    /// session fetch.
    pub session_start: NaiveDateTime,
    /// Exclusive end.
    pub end: NaiveDateTime,
}

impl FetchWindow {
    /// `history_days` of history before the session containing `end`.
    pub fn for_session(
        interval: Interval,
        session_date: NaiveDate,
        session_open: chrono::NaiveTime,
        history_days: u32,
        end: NaiveDateTime,
    ) -> Self {
        let session_start = session_date.and_time(session_open);
        let start = (session_date - chrono::Duration::days(i64::from(history_days)))
            .and_time(chrono::NaiveTime::MIN);
        Self {
            interval,
            start,
            session_start,
            end,
        }
    }
}

/// Fetch history and the current session and assemble them.
///
/// The historical fetch is required. A failing session fetch only means the
/// current session has no bars yet, so the series ends with history.
pub async fn load_symbol(
    source: &dyn BarSource,
    symbol: &str,
    window: &FetchWindow,
) -> Result<Vec<Bar>, DataError> {
    let historical = source
        .fetch_bars(symbol, window.interval, window.start, window.session_start)
        .await?;
    let session = if window.session_start < window.end {
        match source
            .fetch_bars(symbol, window.interval, window.session_start, window.end)
            .await
        {
            Ok(bars) => bars,
            Err(e) => {
                warn!(symbol, error = %e, "no current-session bars, using history only");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let bars = assemble(historical, session);
    let bars: Vec<Bar> = bars.into_iter().filter(|b| b.timestamp < window.end).collect();
    if bars.is_empty() {
        return Err(DataError::unavailable(symbol, "no bars after assembly"));
    }
    Ok(bars)
}
