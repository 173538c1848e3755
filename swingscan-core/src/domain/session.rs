//! Trading session hours and bar intervals.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported interval '{0}' (expected e.g. 15m, 1h, 1d)")]
pub struct IntervalParseError(pub String);

/// Bar interval in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
    minutes: u32,
}

impl Interval {
    pub const DAY_MINUTES: u32 = 24 * 60;

    /// Interval of `minutes`, clamped to at least one minute.
    pub fn minutes(minutes: u32) -> Self {
        Self { minutes: minutes.max(1) }
    }

    pub fn hourly() -> Self {
        Self::minutes(60)
    }

    pub fn as_minutes(self) -> u32 {
        self.minutes
    }

    pub fn duration(self) -> Duration {
        Duration::minutes(i64::from(self.minutes))
    }

    pub fn is_daily(self) -> bool {
        self.minutes >= Self::DAY_MINUTES
    }
}

impl FromStr for Interval {
    type Err = IntervalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let err = || IntervalParseError(s.clone());
        let (digits, unit) = s.split_at(s.find(|c: char| !c.is_ascii_digit()).ok_or_else(err)?);
        let n: u32 = digits.parse().map_err(|_| err())?;
        let minutes = match unit {
            "m" | "min" => n,
            "h" => n * 60,
            "d" => n * Self::DAY_MINUTES,
            _ => return Err(err()),
        };
        if minutes == 0 {
            return Err(err());
        }
        Ok(Self { minutes })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.minutes % Self::DAY_MINUTES == 0 {
            write!(f, "{}d", self.minutes / Self::DAY_MINUTES)
        } else if self.minutes % 60 == 0 {
            write!(f, "{}h", self.minutes / 60)
        } else {
            write!(f, "{}m", self.minutes)
        }
    }
}

impl Serialize for Interval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Regular session hours, local to the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl Default for SessionHours {
    /// NSE cash session, 09:15–15:30.
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(15, 30, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl SessionHours {
    /// Bar start times on `date`: open, open + interval, ... while before close.
    pub fn bar_starts(&self, date: NaiveDate, interval: Interval) -> Vec<NaiveDateTime> {
        let open = date.and_time(self.open);
        let close = date.and_time(self.close);
        if interval.is_daily() {
            return vec![open];
        }
        let step = interval.duration();
        std::iter::successors(Some(open), |t| Some(*t + step))
            .take_while(|t| *t < close)
            .collect()
    }

    /// Times at which a bar closes on `date`: every interval after the open,
    /// plus the close itself when the last bar is short.
    pub fn boundaries(&self, date: NaiveDate, interval: Interval) -> Vec<NaiveDateTime> {
        let close = date.and_time(self.close);
        let mut out: Vec<NaiveDateTime> = self
            .bar_starts(date, interval)
            .into_iter()
            .map(|t| (t + interval.duration()).min(close))
            .collect();
        out.dedup();
        out
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.open && time < self.close
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveDateTime {
        date().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn interval_parsing() {
        assert_eq!("15m".parse::<Interval>().unwrap().as_minutes(), 15);
        assert_eq!("1h".parse::<Interval>().unwrap().as_minutes(), 60);
        assert_eq!("1D".parse::<Interval>().unwrap().as_minutes(), 1440);
        assert!("0m".parse::<Interval>().is_err());
        assert!("h".parse::<Interval>().is_err());
        assert!("5w".parse::<Interval>().is_err());
        assert!("60".parse::<Interval>().is_err());
    }

    #[test]
    fn interval_display_roundtrip() {
        for s in ["15m", "1h", "2h", "1d", "90m"] {
            let interval: Interval = s.parse().unwrap();
            assert_eq!(interval.to_string().parse::<Interval>().unwrap(), interval);
        }
        assert_eq!(Interval::minutes(90).to_string(), "90m");
    }

    #[test]
    fn hourly_session_grid() {
        let session = SessionHours::default();
        let starts = session.bar_starts(date(), Interval::hourly());
        assert_eq!(starts.len(), 7);
        assert_eq!(starts[0], t(9, 15));
        assert_eq!(starts[6], t(15, 15));

        let boundaries = session.boundaries(date(), Interval::hourly());
        assert_eq!(
            boundaries,
            vec![t(10, 15), t(11, 15), t(12, 15), t(13, 15), t(14, 15), t(15, 15), t(15, 30)]
        );
    }

    #[test]
    fn fifteen_minute_grid_ends_at_close() {
        let session = SessionHours::default();
        let starts = session.bar_starts(date(), Interval::minutes(15));
        assert_eq!(starts.len(), 25);
        assert_eq!(*starts.last().unwrap(), t(15, 15));
        assert_eq!(*session.boundaries(date(), Interval::minutes(15)).last().unwrap(), t(15, 30));
    }

    #[test]
    fn session_contains() {
        let session = SessionHours::default();
        assert!(session.contains(NaiveTime::from_hms_opt(9, 15, 0).unwrap()));
        assert!(!session.contains(NaiveTime::from_hms_opt(15, 30, 0).unwrap()));
        assert!(!session.contains(NaiveTime::from_hms_opt(8, 0, 0).unwrap()));
    }
}
