//! Yahoo Finance chart provider.
//!
//! Fetches intraday or daily OHLCV bars from Yahoo's v8 chart API. Handles
//! rate limiting, retries with exponential backoff, response parsing, and
//! the circuit breaker. Timestamps are converted from epoch seconds to the
//! exchange's local wall-clock time.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{BarSource, DataError};
use crate::domain::{Bar, Interval};
use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Yahoo Finance bar source.
pub struct YahooSource {
    client: reqwest::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    suffix: String,
    timezone: Tz,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooSource {
    pub fn new(
        circuit_breaker: Arc<CircuitBreaker>,
        suffix: impl Into<String>,
        timezone: Tz,
    ) -> Result<Self, DataError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            suffix: suffix.into(),
            timezone,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    pub fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }

    /// Exchange ticker for a bare symbol. Symbols that already carry an
    /// exchange suffix or index prefix are left alone.
    fn ticker(&self, symbol: &str) -> String {
        if self.suffix.is_empty() || symbol.contains('.') || symbol.starts_with('^') {
            symbol.to_string()
        } else {
            format!("{symbol}{}", self.suffix)
        }
    }

    fn interval_code(interval: Interval) -> Option<&'static str> {
        Some(match interval.as_minutes() {
            1 => "1m",
            2 => "2m",
            5 => "5m",
            15 => "15m",
            30 => "30m",
            60 => "60m",
            90 => "90m",
            1440 => "1d",
            _ => return None,
        })
    }

    fn epoch(&self, local: NaiveDateTime) -> i64 {
        self.timezone
            .from_local_datetime(&local)
            .earliest()
            .map(|dt| dt.timestamp())
            .unwrap_or_else(|| local.and_utc().timestamp())
    }

    fn chart_url(&self, ticker: &str, code: &str, start: NaiveDateTime, end: NaiveDateTime) -> String {
        let start_ts = self.epoch(start);
        let end_ts = self.epoch(end);
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{ticker}\
             ?period1={start_ts}&period2={end_ts}&interval={code}"
        )
    }

    /// Parse the chart response into bars, dropping rows with any missing field.
    fn parse_response(
        symbol: &str,
        timezone: Tz,
        resp: ChartResponse,
    ) -> Result<Vec<Bar>, DataError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => {
                DataError::unavailable(symbol, "symbol not found")
            }
            Some(err) => DataError::Parse(format!("{}: {}", err.code, err.description)),
            None => DataError::Parse("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::Parse("result array is empty".into()))?;

        let Some(timestamps) = data.timestamp else {
            return Err(DataError::unavailable(symbol, "no bars in range"));
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::Parse("no quote data".into()))?;

        let field = |v: &[Option<f64>], i: usize| v.get(i).copied().flatten();
        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let timestamp = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.with_timezone(&timezone).naive_local())
                .ok_or_else(|| DataError::Parse(format!("invalid timestamp: {ts}")))?;

            let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
                field(&quote.open, i),
                field(&quote.high, i),
                field(&quote.low, i),
                field(&quote.close, i),
                field(&quote.volume, i),
            ) else {
                continue;
            };

            bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        if bars.is_empty() {
            return Err(DataError::unavailable(symbol, "no complete bars in range"));
        }
        Ok(bars)
    }

    async fn fetch_with_retry(&self, symbol: &str, url: &str) -> Result<Vec<Bar>, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(symbol, attempt, ?delay, "retrying chart request");
                tokio::time::sleep(delay).await;
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitOpen {
                    remaining_secs: self.circuit_breaker.remaining_cooldown().as_secs(),
                });
            }

            let resp = match self.client.get(url).send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(DataError::Http(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::Http(e.to_string())),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::FORBIDDEN {
                warn!(symbol, "provider returned 403, tripping circuit breaker");
                self.circuit_breaker.trip();
                return Err(DataError::CircuitOpen {
                    remaining_secs: self.circuit_breaker.remaining_cooldown().as_secs(),
                });
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!(symbol, retry_after, "rate limited by provider");
                last_error = Some(DataError::Http(format!(
                    "rate limited (retry after {retry_after}s)"
                )));
                continue;
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(DataError::unavailable(symbol, "symbol not found"));
            }
            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::Http(format!("HTTP {status} for {symbol}")));
                continue;
            }

            let chart: ChartResponse = resp
                .json()
                .await
                .map_err(|e| DataError::Parse(format!("{symbol}: {e}")))?;
            let bars = Self::parse_response(symbol, self.timezone, chart)?;
            self.circuit_breaker.record_success();
            return Ok(bars);
        }

        Err(last_error.unwrap_or_else(|| DataError::Http("max retries exceeded".into())))
    }
}

#[async_trait]
impl BarSource for YahooSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    async fn fetch_bars(
        &self,
        symbol: &str,
        interval: Interval,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, DataError> {
        let code = Self::interval_code(interval).ok_or(DataError::InvalidInterval(interval))?;
        let ticker = self.ticker(symbol);
        let url = self.chart_url(&ticker, code, start, end);
        let mut bars = self.fetch_with_retry(symbol, &url).await?;
        bars.retain(|b| b.timestamp >= start && b.timestamp < end);
        debug!(symbol, bars = bars.len(), %interval, "fetched chart bars");
        Ok(bars)
    }
}
