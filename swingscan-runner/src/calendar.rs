//! Market calendar and check slots.
//!
//! A check slot sits a short buffer after each bar boundary of a trading
//! day: every interval from the open, plus the close itself. For an hourly
//! interval over a 09:15–15:30 session the boundaries are 10:15, 11:15,
//! 12:15, 13:15, 14:15, 15:15 and 15:30.
//!
//! All times here are exchange-local wall-clock times; conversion to and
//! from UTC happens only at the clock boundary.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;
use swingscan_core::domain::{Interval, SessionHours};

/// Days scanned forward when looking for the next session.
const MAX_SCAN_DAYS: i64 = 366;

/// One scheduled check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CheckSlot {
    /// When the check is due.
    pub at: NaiveDateTime,
    /// Bar boundary the check follows; only bars before it are evaluated.
    pub boundary: NaiveDateTime,
    /// Start of the bar that closes at `boundary`. Detections in
    /// `[window_start, boundary)` belong to this check.
    pub window_start: NaiveDateTime,
}

impl CheckSlot {
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        timestamp >= self.window_start && timestamp < self.boundary
    }
}

#[derive(Debug, Clone)]
pub struct MarketCalendar {
    timezone: Tz,
    session: SessionHours,
    interval: Interval,
    buffer: Duration,
    holidays: BTreeSet<NaiveDate>,
}

impl MarketCalendar {
    pub fn new(
        timezone: Tz,
        session: SessionHours,
        interval: Interval,
        buffer: Duration,
        holidays: impl IntoIterator<Item = NaiveDate>,
    ) -> Self {
        Self {
            timezone,
            session,
            interval,
            buffer,
            holidays: holidays.into_iter().collect(),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn session(&self) -> SessionHours {
        self.session
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// Whether `local` falls inside a trading session.
    pub fn is_market_open(&self, local: NaiveDateTime) -> bool {
        self.is_trading_day(local.date()) && self.session.contains(local.time())
    }

    pub fn to_local(&self, utc: DateTime<Utc>) -> NaiveDateTime {
        utc.with_timezone(&self.timezone).naive_local()
    }

    /// Exchange-local time to UTC. Times skipped by a DST jump resolve to the
    /// instant the clocks jumped to.
    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        self.timezone
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| {
                self.timezone
                    .from_local_datetime(&(local + Duration::hours(1)))
                    .earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| local.and_utc())
    }

    /// All check slots of `date`, in order. Empty on non-trading days.
    pub fn slots(&self, date: NaiveDate) -> Vec<CheckSlot> {
        if !self.is_trading_day(date) {
            return Vec::new();
        }
        let close = date.and_time(self.session.close);
        let mut slots: Vec<CheckSlot> = self
            .session
            .bar_starts(date, self.interval)
            .into_iter()
            .map(|start| {
                let boundary = (start + self.interval.duration()).min(close);
                CheckSlot {
                    at: boundary + self.buffer,
                    boundary,
                    window_start: start,
                }
            })
            .collect();
        slots.dedup_by_key(|s| s.boundary);
        slots
    }

    /// First slot due at or after `local`.
    pub fn next_slot(&self, local: NaiveDateTime) -> Option<CheckSlot> {
        (0..MAX_SCAN_DAYS)
            .map(|d| local.date() + Duration::days(d))
            .flat_map(|date| self.slots(date))
            .find(|slot| slot.at >= local)
    }

    /// The slot scheduled after `slot`, regardless of the current time.
    pub fn slot_after(&self, slot: &CheckSlot) -> Option<CheckSlot> {
        (0..MAX_SCAN_DAYS)
            .map(|d| slot.at.date() + Duration::days(d))
            .flat_map(|date| self.slots(date))
            .find(|next| next.at > slot.at)
    }

    /// Most recent slot due strictly before `local` on the same day.
    pub fn previous_slot_today(&self, local: NaiveDateTime) -> Option<CheckSlot> {
        self.slots(local.date())
            .into_iter()
            .take_while(|slot| slot.at < local)
            .last()
    }

    /// Most recent slot due at or before `local`, looking back across days.
    pub fn latest_slot(&self, local: NaiveDateTime) -> Option<CheckSlot> {
        (0..MAX_SCAN_DAYS)
            .map(|d| local.date() - Duration::days(d))
            .find_map(|date| {
                self.slots(date)
                    .into_iter()
                    .take_while(|slot| slot.at <= local)
                    .last()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendar() -> MarketCalendar {
        MarketCalendar::new(
            chrono_tz::Asia::Kolkata,
            SessionHours::default(),
            Interval::hourly(),
            Duration::seconds(30),
            [NaiveDate::from_ymd_opt(2024, 8, 15).unwrap()],
        )
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn hourly_slots_follow_boundaries() {
        let slots = calendar().slots(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        let due: Vec<_> = slots.iter().map(|s| s.at).collect();
        assert_eq!(
            due,
            vec![
                at(2024, 6, 3, 10, 15, 30),
                at(2024, 6, 3, 11, 15, 30),
                at(2024, 6, 3, 12, 15, 30),
                at(2024, 6, 3, 13, 15, 30),
                at(2024, 6, 3, 14, 15, 30),
                at(2024, 6, 3, 15, 15, 30),
                at(2024, 6, 3, 15, 30, 30),
            ]
        );
        let last = slots.last().unwrap();
        assert_eq!(last.window_start, at(2024, 6, 3, 15, 15, 0));
        assert_eq!(last.boundary, at(2024, 6, 3, 15, 30, 0));
        assert_eq!(slots[0].window_start, at(2024, 6, 3, 9, 15, 0));
    }

    #[test]
    fn weekends_and_holidays_have_no_slots() {
        let cal = calendar();
        assert!(cal.slots(NaiveDate::from_ymd_opt(2024, 6, 8).unwrap()).is_empty());
        assert!(cal.slots(NaiveDate::from_ymd_opt(2024, 8, 15).unwrap()).is_empty());
        assert!(!cal.is_trading_day(NaiveDate::from_ymd_opt(2024, 8, 15).unwrap()));
    }

    #[test]
    fn after_close_next_check_is_next_trading_day() {
        let cal = calendar();
        // Monday 16:00, thirty minutes after the close
        let next = cal.next_slot(at(2024, 6, 3, 16, 0, 0)).unwrap();
        assert_eq!(next.at, at(2024, 6, 4, 10, 15, 30));

        // Friday after close skips the weekend
        let next = cal.next_slot(at(2024, 6, 7, 16, 0, 0)).unwrap();
        assert_eq!(next.at, at(2024, 6, 10, 10, 15, 30));

        // Wednesday 14 Aug after close skips the holiday on Thursday
        let next = cal.next_slot(at(2024, 8, 14, 16, 0, 0)).unwrap();
        assert_eq!(next.at, at(2024, 8, 16, 10, 15, 30));
    }

    #[test]
    fn next_slot_during_session() {
        let cal = calendar();
        assert_eq!(
            cal.next_slot(at(2024, 6, 3, 11, 0, 0)).unwrap().at,
            at(2024, 6, 3, 11, 15, 30)
        );
        // Exactly on a slot counts as due
        assert_eq!(
            cal.next_slot(at(2024, 6, 3, 11, 15, 30)).unwrap().at,
            at(2024, 6, 3, 11, 15, 30)
        );
        assert_eq!(
            cal.next_slot(at(2024, 6, 3, 8, 0, 0)).unwrap().at,
            at(2024, 6, 3, 10, 15, 30)
        );
    }

    #[test]
    fn slot_after_chains_across_days() {
        let cal = calendar();
        let last = *cal.slots(NaiveDate::from_ymd_opt(2024, 6, 7).unwrap()).last().unwrap();
        assert_eq!(cal.slot_after(&last).unwrap().at, at(2024, 6, 10, 10, 15, 30));
    }

    #[test]
    fn previous_slot_today() {
        let cal = calendar();
        assert_eq!(
            cal.previous_slot_today(at(2024, 6, 3, 11, 40, 0)).unwrap().at,
            at(2024, 6, 3, 11, 15, 30)
        );
        assert!(cal.previous_slot_today(at(2024, 6, 3, 10, 0, 0)).is_none());
    }

    #[test]
    fn market_hours() {
        let cal = calendar();
        assert!(cal.is_market_open(at(2024, 6, 3, 9, 15, 0)));
        assert!(!cal.is_market_open(at(2024, 6, 3, 15, 30, 0)));
        assert!(!cal.is_market_open(at(2024, 6, 8, 11, 0, 0)));
    }

    #[test]
    fn utc_round_trip() {
        let cal = calendar();
        let local = at(2024, 6, 3, 10, 15, 30);
        let utc = cal.to_utc(local);
        assert_eq!(utc.naive_utc(), at(2024, 6, 3, 4, 45, 30));
        assert_eq!(cal.to_local(utc), local);
    }

    #[test]
    fn latest_slot_looks_back_over_the_weekend() {
        let cal = calendar();
        // Saturday morning: last slot was Friday's close
        let slot = cal.latest_slot(at(2024, 6, 8, 9, 0, 0)).unwrap();
        assert_eq!(slot.at, at(2024, 6, 7, 15, 30, 30));
        assert_eq!(slot.window_start, at(2024, 6, 7, 15, 15, 0));
        // Mid-session: the slot just passed
        assert_eq!(
            cal.latest_slot(at(2024, 6, 3, 12, 15, 30)).unwrap().at,
            at(2024, 6, 3, 12, 15, 30)
        );
    }
}
