//! Wall-clock time of day with an inclusive end-of-day value.
//!
//! `chrono::NaiveTime` stops at `23:59:59.999…`, which cannot express the
//! exclusive end of a `[start, 24:00)` interval. `TimeOfDay` stores whole
//! seconds since local midnight in `0..=86_400`, so `24:00` is representable and
//! a range reaching the end of the day has no one-second hole.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const SECONDS_PER_DAY: u32 = 86_400;

/// Seconds since local midnight, `00:00` through `24:00` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    pub const END_OF_DAY: TimeOfDay = TimeOfDay(SECONDS_PER_DAY);

    /// Build from hours, minutes and seconds. `24:00:00` is the only valid
    /// value with `hour == 24`.
    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Option<Self> {
        if minute >= 60 || second >= 60 {
            return None;
        }
        Self::from_seconds(hour * 3600 + minute * 60 + second)
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        Self::from_hms(hour, minute, 0)
    }

    pub fn from_seconds(seconds: u32) -> Option<Self> {
        (seconds <= SECONDS_PER_DAY).then_some(Self(seconds))
    }

    pub fn seconds(self) -> u32 {
        self.0
    }

    pub fn hour(self) -> u32 {
        self.0 / 3600
    }

    pub fn minute(self) -> u32 {
        (self.0 % 3600) / 60
    }

    pub fn second(self) -> u32 {
        self.0 % 60
    }

    /// The equivalent `NaiveTime`, or `None` for `24:00`.
    pub fn to_naive_time(self) -> Option<NaiveTime> {
        NaiveTime::from_num_seconds_from_midnight_opt(self.0, 0)
    }

    /// Add whole minutes; `None` when the result would pass `24:00`.
    pub fn checked_add_minutes(self, minutes: u32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(|delta| self.0.checked_add(delta))
            .and_then(Self::from_seconds)
    }

    /// Signed number of whole minutes from `self` to `later`.
    pub fn minutes_until(self, later: TimeOfDay) -> i64 {
        (i64::from(later.0) - i64::from(self.0)) / 60
    }
}

impl From<NaiveTime> for TimeOfDay {
    /// Sub-second precision is truncated.
    fn from(t: NaiveTime) -> Self {
        Self(t.num_seconds_from_midnight())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.second() == 0 {
            write!(f, "{:02}:{:02}", self.hour(), self.minute())
        } else {
            write!(
                f,
                "{:02}:{:02}:{:02}",
                self.hour(),
                self.minute(),
                self.second()
            )
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    /// Accepts `HH:MM` or `HH:MM:SS`, with `24:00` as the end of the day.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedTime(s.to_string());

        let parts: Vec<&str> = s.trim().split(':').collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(malformed());
        }

        let mut fields = [0u32; 3];
        for (slot, part) in fields.iter_mut().zip(&parts) {
            if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            *slot = part.parse().map_err(|_| malformed())?;
        }

        Self::from_hms(fields[0], fields[1], fields[2]).ok_or_else(malformed)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        t.to_string()
    }
}
