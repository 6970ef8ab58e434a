//! Interval algebra over time-of-day ranges on a single day.
//!
//! Every function here is pure: no dates, no staff, no I/O. Ranges are
//! half-open `[start, end)`. Functions accept ranges in any order and with any
//! overlap; outputs of [`merge_overlaps`], [`subtract`] and [`union`] are
//! sorted, non-overlapping and non-adjacent.

use serde::{Deserialize, Serialize};

use crate::time_of_day::TimeOfDay;

/// A half-open `[start, end)` span of wall-clock time on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeRange {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// The whole local day, `[00:00, 24:00)`.
    pub fn whole_day() -> Self {
        Self::new(TimeOfDay::MIDNIGHT, TimeOfDay::END_OF_DAY)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.start.minutes_until(self.end)
        }
    }

    /// True when the ranges share at least one instant. Adjacent ranges do not.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_range(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Drop empty or inverted ranges and sort ascending by start (then end).
///
/// Never merges.
pub fn normalize(ranges: &[TimeRange]) -> Vec<TimeRange> {
    let mut out: Vec<TimeRange> = ranges.iter().copied().filter(|r| !r.is_empty()).collect();
    out.sort_by_key(|r| (r.start, r.end));
    out
}

/// Normalize, then fold overlapping or exactly adjacent ranges together.
///
/// `09:00–12:00` and `12:00–17:00` become `09:00–17:00`.
pub fn merge_overlaps(ranges: &[TimeRange]) -> Vec<TimeRange> {
    let mut merged: Vec<TimeRange> = Vec::new();
    for range in normalize(ranges) {
        if let Some(last) = merged.last_mut() {
            if range.start <= last.end {
                last.end = last.end.max(range.end);
                continue;
            }
        }
        merged.push(range);
    }
    merged
}

/// Remove every point covered by `removals` from `base`.
///
/// One base range may come back as zero, one or several pieces.
pub fn subtract(base: &[TimeRange], removals: &[TimeRange]) -> Vec<TimeRange> {
    let base = merge_overlaps(base);
    let removals = merge_overlaps(removals);

    let mut out = Vec::new();
    for range in base {
        let mut cursor = range.start;
        for removal in &removals {
            if removal.end <= cursor {
                continue;
            }
            if removal.start >= range.end {
                break;
            }
            if removal.start > cursor {
                out.push(TimeRange::new(cursor, removal.start));
            }
            cursor = cursor.max(removal.end);
        }
        // Tail after the last removal touching this range.
        if cursor < range.end {
            out.push(TimeRange::new(cursor, range.end));
        }
    }
    out
}

/// Every point present in either input.
pub fn union(a: &[TimeRange], b: &[TimeRange]) -> Vec<TimeRange> {
    let combined: Vec<TimeRange> = a.iter().chain(b).copied().collect();
    merge_overlaps(&combined)
}

/// Total covered minutes, counting overlapping input only once.
pub fn total_minutes(ranges: &[TimeRange]) -> i64 {
    merge_overlaps(ranges)
        .iter()
        .map(TimeRange::duration_minutes)
        .sum()
}
