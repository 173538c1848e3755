//! Continuous Monitor.
//!
//! One cooperative loop per monitor:
//!
//! ```text
//! start ─► pick first slot ─► sleep until slot.at ─► check ─► slot_after ─┐
//!                                  ▲                                      │
//!                                  └──────────────────────────────────────┘
//! ```
//!
//! A check fans the universe out over at most `max_in_flight` concurrent
//! workers. Each worker fetches its symbol's bars up to the slot boundary,
//! runs the detection pipeline in live mode and keeps the detections inside
//! the slot's window that are not in the shared dedup set. The new
//! detections go to the [`AlertSink`]; only a successful delivery records
//! them as emitted. An undelivered batch is carried into the next check.
//!
//! Stop is cooperative: it takes effect while the loop sleeps or right after
//! the running check completes. No error ends the loop.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use swingscan_core::data::{BarSource, DataError};
use swingscan_core::domain::{DetectionKey, Interval};
use swingscan_core::signals::DetectionMode;
use swingscan_core::{DetectionError, DetectionParams};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::alert::{Alert, AlertSink};
use crate::calendar::{CheckSlot, MarketCalendar};
use crate::clock::Clock;
use crate::config::ScanConfig;
use crate::data_loader::{load_symbol, FetchWindow};
use crate::pipeline::{analyze_symbol, Detection, FineBars};

/// Lateness tolerated before a check is reported as overrun.
const OVERRUN_GRACE_SECS: i64 = 5;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("monitor is already running")]
    AlreadyRunning,

    #[error("monitor is not running")]
    NotRunning,

    #[error("monitor task failed: {0}")]
    Join(String),
}

/// Why one symbol produced nothing in a check.
#[derive(Debug, Error)]
pub enum SymbolScanError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Detection(#[from] DetectionError),
}

/// A check that started later than its slot. Logged, never returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingOverrun {
    pub slot: CheckSlot,
    pub late_by: Duration,
}

impl fmt::Display for SchedulingOverrun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "check due at {} started {}s late",
            self.slot.at,
            self.late_by.num_seconds()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Stopped,
    /// Waiting for the next slot while the market is open.
    Idle,
    Checking,
    /// Market closed; waiting for the next session.
    Sleeping,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorStatus {
    pub state: MonitorState,
    /// Exchange-local time of the next scheduled check.
    pub next_check: Option<NaiveDateTime>,
    pub market_open: bool,
    pub last_signal_count: usize,
    pub checks_completed: u64,
    /// Slot time of the last completed check.
    pub last_check: Option<NaiveDateTime>,
}

impl Default for MonitorStatus {
    fn default() -> Self {
        Self {
            state: MonitorState::Stopped,
            next_check: None,
            market_open: false,
            last_signal_count: 0,
            checks_completed: 0,
            last_check: None,
        }
    }
}

/// Result of one detection pass over the universe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub slot: CheckSlot,
    pub started_at: DateTime<Utc>,
    pub market_open: bool,
    pub symbols_processed: usize,
    /// Symbols that produced nothing, with the reason.
    pub failures: BTreeMap<String, String>,
    /// Detections not emitted by any earlier check, ordered by timestamp.
    /// Includes detections carried over from a failed delivery.
    pub detections: Vec<Detection>,
    /// Why the alert for `detections` could not be delivered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_error: Option<String>,
}

/// Everything a monitor needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub universe: Vec<String>,
    pub params: DetectionParams,
    pub calendar: MarketCalendar,
    pub fine_interval: Option<Interval>,
    pub history_days: u32,
    pub max_in_flight: usize,
    /// A slot missed by at most this much at startup runs immediately.
    pub startup_catchup: Duration,
}

impl MonitorSettings {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            universe: config.universe.symbols.clone(),
            params: config.detection.clone(),
            calendar: config.calendar(),
            fine_interval: config.data.fine_interval,
            history_days: config.data.history_days,
            max_in_flight: config.monitor.max_in_flight,
            startup_catchup: Duration::minutes(i64::from(config.monitor.startup_catchup_mins)),
        }
    }
}

struct Shared {
    settings: MonitorSettings,
    source: Arc<dyn BarSource>,
    sink: Arc<dyn AlertSink>,
    clock: Arc<dyn Clock>,
    seen: Mutex<HashSet<DetectionKey>>,
    /// Detections whose alert failed, retried with the next check.
    pending: Mutex<Vec<Detection>>,
    status: Mutex<MonitorStatus>,
    running: Mutex<bool>,
}

/// The Continuous Monitor. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Monitor {
    shared: Arc<Shared>,
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("source", &self.shared.source.name())
            .field("universe", &self.shared.settings.universe.len())
            .field("status", &self.status())
            .finish()
    }
}

impl Monitor {
    pub fn new(
        settings: MonitorSettings,
        source: Arc<dyn BarSource>,
        sink: Arc<dyn AlertSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                settings,
                source,
                sink,
                clock,
                seen: Mutex::new(HashSet::new()),
                pending: Mutex::new(Vec::new()),
                status: Mutex::new(MonitorStatus::default()),
                running: Mutex::new(false),
            }),
        }
    }

    /// Spawn the scheduling loop on the current tokio runtime.
    pub fn start(&self) -> Result<MonitorHandle, MonitorError> {
        {
            let mut running = self.shared.running.lock();
            if *running {
                return Err(MonitorError::AlreadyRunning);
            }
            *running = true;
        }
        let (stop_tx, stop_rx) = watch::channel(false);
        let monitor = self.clone();
        let task = tokio::spawn(async move { monitor.run_loop(stop_rx).await });
        info!(
            symbols = self.shared.settings.universe.len(),
            source = self.shared.source.name(),
            "monitor started"
        );
        Ok(MonitorHandle {
            monitor: self.clone(),
            stop_tx,
            task,
        })
    }

    pub fn status(&self) -> MonitorStatus {
        let mut status = self.shared.status.lock().clone();
        let now = self.local_now();
        status.market_open = self.shared.settings.calendar.is_market_open(now);
        status
    }

    fn local_now(&self) -> NaiveDateTime {
        self.shared
            .settings
            .calendar
            .to_local(self.shared.clock.now())
    }

    /// First slot to run after a start at `now`: the slot just missed if the
    /// market is open and it is within the catch-up window, otherwise the
    /// next slot due.
    fn first_slot(&self, now: NaiveDateTime) -> Option<(CheckSlot, bool)> {
        let settings = &self.shared.settings;
        let calendar = &settings.calendar;
        if calendar.is_market_open(now) {
            if let Some(missed) = calendar.previous_slot_today(now) {
                if now - missed.at <= settings.startup_catchup {
                    return Some((missed, true));
                }
            }
        }
        calendar.next_slot(now).map(|slot| (slot, false))
    }

    async fn run_loop(self, mut stop: watch::Receiver<bool>) {
        let calendar = self.shared.settings.calendar.clone();
        let mut next = self.first_slot(self.local_now());

        loop {
            if *stop.borrow() {
                break;
            }
            let Some((slot, catching_up)) = next else {
                warn!("no trading session within a year; waiting for stop");
                let _ = stop.changed().await;
                break;
            };

            let now = self.local_now();
            self.set_waiting(&slot, calendar.is_market_open(now));

            tokio::select! {
                _ = self.shared.clock.sleep_until(calendar.to_utc(slot.at)) => {}
                _ = stop.changed() => break,
            }
            if *stop.borrow() {
                break;
            }

            let late_by = self.local_now() - slot.at;
            if catching_up {
                info!(slot = %slot.at, "running missed check on startup");
            } else if late_by > Duration::seconds(OVERRUN_GRACE_SECS) {
                warn!("{}", SchedulingOverrun { slot, late_by });
            }

            self.run_check(slot)
                .instrument(info_span!("check", slot = %slot.at))
                .await;

            next = calendar.slot_after(&slot).map(|s| (s, false));
        }

        *self.shared.running.lock() = false;
        let mut status = self.shared.status.lock();
        status.state = MonitorState::Stopped;
        status.next_check = None;
        info!("monitor stopped");
    }

    fn set_waiting(&self, slot: &CheckSlot, market_open: bool) {
        let mut status = self.shared.status.lock();
        status.state = if market_open {
            MonitorState::Idle
        } else {
            MonitorState::Sleeping
        };
        status.next_check = Some(slot.at);
        debug!(next = %slot.at, state = ?status.state, "waiting for next check");
    }

    /// Send `detections` to the sink. On success they are recorded as
    /// emitted; on failure they wait in `pending` for the next check.
    async fn deliver(&self, slot: CheckSlot, detections: &[Detection]) -> Option<String> {
        if detections.is_empty() {
            return None;
        }
        let alert = Alert {
            slot,
            detections: detections.to_vec(),
        };
        match self.shared.sink.deliver(&alert).await {
            Ok(()) => {
                self.shared
                    .seen
                    .lock()
                    .extend(detections.iter().map(Detection::key));
                None
            }
            Err(e) => {
                warn!(
                    error = %e,
                    count = detections.len(),
                    "alert delivery failed, retrying next check"
                );
                *self.shared.pending.lock() = detections.to_vec();
                Some(e.to_string())
            }
        }
    }

    /// One detection pass over the universe for `slot`, delivering any new
    /// detections to the sink.
    ///
    /// Results depend only on the slot and the bar data, not on when the
    /// check actually runs.
    pub async fn run_check(&self, slot: CheckSlot) -> CheckReport {
        let started_at = self.shared.clock.now();
        // the slot's bar, not the wall clock, decides; a late check still
        // belongs to its session
        let market_open = self.shared.settings.calendar.is_market_open(slot.window_start);
        self.shared.status.lock().state = MonitorState::Checking;

        let settings = &self.shared.settings;
        let results: Vec<(String, Result<Vec<Detection>, SymbolScanError>)> =
            stream::iter(settings.universe.clone())
                .map(|symbol| async move {
                    let result = self.scan_symbol(&symbol, &slot).await;
                    (symbol, result)
                })
                .buffer_unordered(settings.max_in_flight.max(1))
                .collect()
                .await;

        let mut failures = BTreeMap::new();
        let mut detections = std::mem::take(&mut *self.shared.pending.lock());
        let mut batched: HashSet<DetectionKey> = detections.iter().map(Detection::key).collect();
        for (symbol, result) in results {
            match result {
                Ok(found) => {
                    detections.extend(found.into_iter().filter(|d| batched.insert(d.key())))
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "symbol skipped");
                    failures.insert(symbol, e.to_string());
                }
            }
        }
        detections.sort_by(|a, b| {
            a.timestamp()
                .cmp(&b.timestamp())
                .then_with(|| a.key().cmp(&b.key()))
        });
        let delivery_error = self.deliver(slot, &detections).await;

        {
            let mut status = self.shared.status.lock();
            status.last_signal_count = detections.len();
            status.checks_completed += 1;
            status.last_check = Some(slot.at);
        }
        info!(
            symbols = settings.universe.len(),
            failed = failures.len(),
            new = detections.len(),
            "check complete"
        );

        CheckReport {
            slot,
            started_at,
            market_open,
            symbols_processed: settings.universe.len(),
            failures,
            detections,
            delivery_error,
        }
    }

    /// Fetch and analyse one symbol, keeping detections in the slot window
    /// that were never emitted.
    async fn scan_symbol(
        &self,
        symbol: &str,
        slot: &CheckSlot,
    ) -> Result<Vec<Detection>, SymbolScanError> {
        let settings = &self.shared.settings;
        let source = self.shared.source.as_ref();
        let window = FetchWindow::for_session(
            settings.calendar.interval(),
            slot.boundary.date(),
            settings.calendar.session().open,
            settings.history_days,
            slot.boundary,
        );
        let bars = load_symbol(source, symbol, &window).await?;

        let fine = match settings.fine_interval {
            Some(interval) => {
                let fine_window = FetchWindow { interval, ..window };
                match load_symbol(source, symbol, &fine_window).await {
                    Ok(fine) => Some(fine),
                    Err(e) => {
                        debug!(symbol, error = %e, "no fine bars, skipping volume spikes");
                        None
                    }
                }
            }
            None => None,
        };

        let fine = fine.as_deref().map(|fine| FineBars {
            bars: fine,
            coarse_interval: settings.calendar.interval(),
        });
        let analysis = analyze_symbol(symbol, &bars, fine, &settings.params, DetectionMode::Live)?;

        let seen = self.shared.seen.lock();
        Ok(analysis
            .detections()
            .into_iter()
            .filter(|d| slot.contains(d.timestamp()) && !seen.contains(&d.key()))
            .collect())
    }
}

/// Control handle returned by [`Monitor::start`]. Dropping it stops the loop.
#[derive(Debug)]
pub struct MonitorHandle {
    monitor: Monitor,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Request a cooperative stop.
    pub fn stop(&self) -> Result<(), MonitorError> {
        if self.stop_tx.send_replace(true) || self.task.is_finished() {
            return Err(MonitorError::NotRunning);
        }
        Ok(())
    }

    pub fn status(&self) -> MonitorStatus {
        self.monitor.status()
    }

    /// Wait for the loop to exit.
    pub async fn join(self) -> Result<(), MonitorError> {
        self.task
            .await
            .map_err(|e| MonitorError::Join(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::LogSink;
    use crate::clock::TokioClock;
    use chrono::{NaiveDate, TimeZone};
    use swingscan_core::data::SyntheticSource;
    use swingscan_core::domain::SessionHours;

    fn settings(universe: &[&str]) -> MonitorSettings {
        MonitorSettings {
            universe: universe.iter().map(|s| s.to_string()).collect(),
            params: DetectionParams::default(),
            calendar: MarketCalendar::new(
                chrono_tz::Asia::Kolkata,
                SessionHours::default(),
                Interval::hourly(),
                Duration::seconds(30),
                [],
            ),
            fine_interval: None,
            history_days: 30,
            max_in_flight: 4,
            startup_catchup: Duration::minutes(60),
        }
    }

    fn monitor_at(local: NaiveDateTime) -> Monitor {
        let settings = settings(&["AAA"]);
        let utc = settings.calendar.to_utc(local);
        Monitor::new(
            settings,
            Arc::new(SyntheticSource::default()),
            Arc::new(LogSink),
            Arc::new(TokioClock::starting_at(utc)),
        )
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn startup_within_catchup_runs_missed_slot() {
        let monitor = monitor_at(at(3, 11, 40));
        let (slot, catching_up) = monitor.first_slot(at(3, 11, 40)).unwrap();
        assert!(catching_up);
        assert_eq!(slot.boundary, at(3, 11, 15));
    }

    #[tokio::test(start_paused = true)]
    async fn startup_after_close_waits_for_next_session() {
        let monitor = monitor_at(at(3, 16, 0));
        let (slot, catching_up) = monitor.first_slot(at(3, 16, 0)).unwrap();
        assert!(!catching_up);
        assert_eq!(slot.boundary, at(4, 10, 15));
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_is_rejected() {
        let monitor = monitor_at(at(3, 16, 0));
        let handle = monitor.start().unwrap();
        assert!(matches!(monitor.start(), Err(MonitorError::AlreadyRunning)));
        handle.stop().unwrap();
        assert!(matches!(handle.stop(), Err(MonitorError::NotRunning)));
        handle.join().await.unwrap();
        assert_eq!(monitor.status().state, MonitorState::Stopped);
    }

    #[test]
    fn overrun_message_names_the_slot() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let overrun = SchedulingOverrun {
            slot: CheckSlot {
                at: day.and_hms_opt(11, 15, 30).unwrap(),
                boundary: day.and_hms_opt(11, 15, 0).unwrap(),
                window_start: day.and_hms_opt(10, 15, 0).unwrap(),
            },
            late_by: Duration::seconds(95),
        };
        assert_eq!(
            overrun.to_string(),
            "check due at 2024-06-03 11:15:30 started 95s late"
        );
    }

    #[test]
    fn utc_clock_base_maps_to_local_session() {
        let base = Utc.with_ymd_and_hms(2024, 6, 3, 10, 30, 0).unwrap();
        let calendar = settings(&[]).calendar;
        assert_eq!(calendar.to_local(base), at(3, 16, 0));
    }
}
