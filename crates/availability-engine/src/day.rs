//! Local calendar days in the business timezone, and DST handling at their
//! edges.
//!
//! A [`DayWindow`] pins one date to its absolute `[start, end)` instants. The
//! window is computed per date from the two local midnights, so 23-hour and
//! 25-hour DST days come out exact rather than assuming 24 hours. Absolute
//! intervals (leave, blocks, bookings) are reduced to time-of-day through
//! [`DayWindow::clip`], which is the only absolute-to-local conversion in the
//! resolution path.

use std::cmp::Ordering;

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::interval::TimeRange;
use crate::time_of_day::TimeOfDay;

/// Longest stretch of local time a transition may skip (Samoa skipped a day).
const MAX_GAP_MINUTES: i64 = 26 * 60;

/// Policy for slot start times whose wall-clock value falls in a DST gap
/// (e.g. 02:30 on a spring-forward night). Repeated wall-clock times always
/// resolve to the earlier instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// Do not offer a slot whose start does not exist locally.
    #[default]
    Skip,
    /// Move the start to the first valid instant after the gap.
    ShiftForward,
}

/// Absolute intervals reduced to one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clipped {
    /// At least one interval spans the whole day.
    WholeDay,
    /// Local ranges, unmerged, possibly empty.
    Partial(Vec<TimeRange>),
}

/// One local calendar day as an absolute half-open window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    date: NaiveDate,
    tz: Tz,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DayWindow {
    pub fn new(date: NaiveDate, tz: Tz) -> Self {
        let start = local_day_start(date, tz);
        let end = date
            .succ_opt()
            .map(|next| local_day_start(next, tz))
            .unwrap_or_else(|| start + Duration::days(1));
        Self {
            date,
            tz,
            start,
            end,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Real length of the day in minutes (1380 or 1500 on DST days).
    pub fn length_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && end > self.start
    }

    /// True when `[start, end)` spans the whole day.
    pub fn is_covered_by(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start <= self.start && end >= self.end
    }

    /// Reduce an absolute interval to local time-of-day on this date.
    ///
    /// A start before the day clips to `00:00`; an end after the day clips to
    /// `24:00`. Returns `None` when the interval misses the day. An interval
    /// that crosses a fall-back transition covers both occurrences of the
    /// repeated wall-clock hour, so the result always contains the local time
    /// of every instant in the interval.
    pub fn clip(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<TimeRange> {
        if !self.overlaps(start, end) {
            return None;
        }
        let from = start.max(self.start);
        let to = end.min(self.end);
        let local_start = if start <= self.start {
            TimeOfDay::MIDNIGHT
        } else {
            self.wall_clock(start)
        };
        let local_end = if end >= self.end {
            TimeOfDay::END_OF_DAY
        } else {
            self.wall_clock(end)
        };

        let from_offset = self.offset_seconds(from);
        if self.offset_seconds(to) >= from_offset {
            return Some(TimeRange::new(local_start, local_end));
        }
        let (fold_start, fold_end) = self.fold(from, to, from_offset);
        Some(TimeRange::new(
            local_start.min(fold_start),
            local_end.max(fold_end),
        ))
    }

    fn wall_clock(&self, instant: DateTime<Utc>) -> TimeOfDay {
        TimeOfDay::from(instant.with_timezone(&self.tz).time())
    }

    fn offset_seconds(&self, instant: DateTime<Utc>) -> i32 {
        instant
            .with_timezone(&self.tz)
            .offset()
            .fix()
            .local_minus_utc()
    }

    /// Wall-clock bounds of the repeated hour for a transition in
    /// `(from, to]` that lowers the offset below `from_offset`.
    fn fold(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        from_offset: i32,
    ) -> (TimeOfDay, TimeOfDay) {
        let (mut before, mut after) = (from, to);
        while after - before > Duration::seconds(1) {
            let mid = before + (after - before) / 2;
            if self.offset_seconds(mid) == from_offset {
                before = mid;
            } else {
                after = mid;
            }
        }
        let at = |offset: i32| {
            self.time_on_day(after.naive_utc() + Duration::seconds(i64::from(offset)))
        };
        (at(self.offset_seconds(after)), at(from_offset))
    }

    /// Time of day of a local date-time, saturating at this day's bounds.
    fn time_on_day(&self, local: NaiveDateTime) -> TimeOfDay {
        match local.date().cmp(&self.date) {
            Ordering::Less => TimeOfDay::MIDNIGHT,
            Ordering::Equal => TimeOfDay::from(local.time()),
            Ordering::Greater => TimeOfDay::END_OF_DAY,
        }
    }

    /// Clip every interval to this day, short-circuiting on whole-day cover.
    pub fn clip_all<I>(&self, intervals: I) -> Clipped
    where
        I: IntoIterator<Item = (DateTime<Utc>, DateTime<Utc>)>,
    {
        let mut ranges = Vec::new();
        for (start, end) in intervals {
            if self.is_covered_by(start, end) {
                return Clipped::WholeDay;
            }
            ranges.extend(self.clip(start, end));
        }
        Clipped::Partial(ranges)
    }

    /// The absolute instant of a wall-clock time on this date.
    ///
    /// `24:00` maps to the end of the window. Returns `None` only when the
    /// time falls in a DST gap and the policy is [`DstPolicy::Skip`].
    pub fn instant_at(&self, time: TimeOfDay, policy: DstPolicy) -> Option<DateTime<Tz>> {
        let Some(naive_time) = time.to_naive_time() else {
            return Some(self.end.with_timezone(&self.tz));
        };
        let naive = self.date.and_time(naive_time);
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Some(dt),
            LocalResult::Ambiguous(earliest, _) => Some(earliest),
            LocalResult::None => match policy {
                DstPolicy::Skip => None,
                DstPolicy::ShiftForward => first_after_gap(naive, self.tz),
            },
        }
    }
}

/// Absolute instant of local midnight, or the first instant after a gap
/// that swallows midnight.
fn local_day_start(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    let local = match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => first_after_gap(midnight, tz),
    };
    match local {
        Some(dt) => dt.with_timezone(&Utc),
        // Unreachable for real zone data; treat the wall clock as UTC.
        None => Utc.from_utc_datetime(&midnight),
    }
}

/// Scan forward minute by minute to the first wall-clock time that exists.
fn first_after_gap(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    (1..=MAX_GAP_MINUTES).find_map(|m| {
        let candidate = naive + Duration::minutes(m);
        tz.from_local_datetime(&candidate).earliest()
    })
}
