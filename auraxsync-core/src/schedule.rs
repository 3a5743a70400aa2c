use crate::error::ScheduleError;
use chrono::{Duration as ChronoDuration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A wall-clock time of day in the user's local timezone, carried around as
/// the validated form of the "HH:MM" strings the settings UI produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Panics if the components are out of range; use `FromStr` for
    /// untrusted input.
    pub fn new(hour: u8, minute: u8) -> Self {
        assert!(hour < 24 && minute < 60, "time of day out of range");
        Self { hour, minute }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// The next wall-clock instant at this time of day, strictly after
    /// `now`: today if the time is still ahead, otherwise tomorrow. The
    /// result is always within 24 hours of `now`.
    pub fn next_occurrence(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now
            .with_hour(u32::from(self.hour))
            .and_then(|t| t.with_minute(u32::from(self.minute)))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .expect("validated time of day");

        if today > now {
            today
        } else {
            today + ChronoDuration::days(1)
        }
    }

    /// Delay from `now` until the next occurrence, for arming a timer.
    pub fn delay_until_next(&self, now: NaiveDateTime) -> Duration {
        let next = self.next_occurrence(now);
        (next - now).to_std().unwrap_or(Duration::ZERO)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidTimeOfDay {
            value: s.to_string(),
        };

        let (hours, minutes) = s.split_once(':').ok_or_else(invalid)?;
        let hour: u8 = hours.parse().map_err(|_| invalid())?;
        let minute: u8 = minutes.parse().map_err(|_| invalid())?;

        if hour >= 24 || minute >= 60 {
            return Err(invalid());
        }

        Ok(Self { hour, minute })
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 14)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn parses_valid_times() {
        let t: TimeOfDay = "09:00".parse().unwrap();
        assert_eq!((t.hour(), t.minute()), (9, 0));
        assert_eq!(t.to_string(), "09:00");

        let t: TimeOfDay = "23:59".parse().unwrap();
        assert_eq!((t.hour(), t.minute()), (23, 59));
    }

    #[test]
    fn rejects_invalid_times() {
        for raw in ["24:00", "12:60", "9", "ab:cd", "", "12:00:00"] {
            assert!(raw.parse::<TimeOfDay>().is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn time_still_ahead_fires_today() {
        let t = TimeOfDay::new(9, 0);
        let next = t.next_occurrence(at(8, 0));
        assert_eq!(next, at(9, 0));
        assert_eq!(t.delay_until_next(at(8, 0)), Duration::from_secs(3600));
    }

    #[test]
    fn time_already_passed_fires_tomorrow() {
        let t = TimeOfDay::new(9, 0);
        let next = t.next_occurrence(at(10, 30));
        assert_eq!(next, at(9, 0) + ChronoDuration::days(1));

        let delay = t.delay_until_next(at(10, 30));
        assert!(delay < Duration::from_secs(24 * 3600));
        assert_eq!(delay, Duration::from_secs((24 - 1) * 3600 - 1800));
    }

    #[test]
    fn exact_match_fires_tomorrow() {
        // A fire scheduled for "now" has already been consumed; the next
        // occurrence is a full day away.
        let t = TimeOfDay::new(9, 0);
        let next = t.next_occurrence(at(9, 0));
        assert_eq!(next, at(9, 0) + ChronoDuration::days(1));
    }

    #[test]
    fn delay_is_always_under_a_day() {
        let t = TimeOfDay::new(0, 30);
        for hour in 0..24 {
            let delay = t.delay_until_next(at(hour, 0));
            assert!(delay <= Duration::from_secs(24 * 3600));
            assert!(delay > Duration::ZERO);
        }
    }

    #[test]
    fn serde_round_trip() {
        let t = TimeOfDay::new(7, 5);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"07:05\"");
        let back: TimeOfDay = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
