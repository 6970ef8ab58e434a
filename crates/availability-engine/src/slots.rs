//! Turn resolved availability into offerable appointment slots.
//!
//! Busy intervals from the booking system are clipped to the day and
//! subtracted from resolved availability; each remaining range is walked on a
//! fixed step grid (15 minutes by default) independent of the slot duration,
//! so slots of different lengths share the same start times.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::day::{Clipped, DayWindow};
use crate::interval::{self, TimeRange};
use crate::model::{BusyInterval, StaffId};
use crate::resolver::AvailabilityResolver;
use crate::store::RuleStore;

/// An offerable appointment, as absolute offset-qualified instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// The booking subsystem, seen from the engine.
///
/// Implementations may return intervals outside the requested date or with
/// non-occupying statuses; the slot generator ignores both.
pub trait BookingSource {
    fn busy_intervals(&self, staff_id: &StaffId, date: NaiveDate) -> Vec<BusyInterval>;
}

/// Bookings held in memory, keyed by staff member.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBookingSource {
    bookings: BTreeMap<StaffId, Vec<BusyInterval>>,
}

impl InMemoryBookingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, staff_id: StaffId, busy: BusyInterval) {
        self.bookings.entry(staff_id).or_default().push(busy);
    }

    pub fn len(&self) -> usize {
        self.bookings.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BookingSource for InMemoryBookingSource {
    /// Every interval for the staff member; the generator discards the ones
    /// that miss the day.
    fn busy_intervals(&self, staff_id: &StaffId, _date: NaiveDate) -> Vec<BusyInterval> {
        self.bookings.get(staff_id).cloned().unwrap_or_default()
    }
}

/// Start/end ranges of every slot that fits in `ranges`.
///
/// Each range is walked from its start in `step_minutes` increments; a slot
/// is emitted when `cursor + duration <= range.end`. The cursor always
/// advances by the step, whether or not a slot was emitted. A zero duration
/// or step yields nothing.
pub fn enumerate_slot_ranges(
    ranges: &[TimeRange],
    duration_minutes: u32,
    step_minutes: u32,
) -> Vec<TimeRange> {
    if duration_minutes == 0 || step_minutes == 0 {
        return Vec::new();
    }

    let mut slots = Vec::new();
    for range in ranges {
        let mut cursor = range.start;
        while cursor < range.end {
            match cursor.checked_add_minutes(duration_minutes) {
                Some(end) if end <= range.end => slots.push(TimeRange::new(cursor, end)),
                // Every later cursor ends even further out.
                _ => break,
            }
            match cursor.checked_add_minutes(step_minutes) {
                Some(next) => cursor = next,
                None => break,
            }
        }
    }
    slots
}

/// Generates slots for one staff member and date.
pub struct SlotGenerator<'a, S: RuleStore + ?Sized> {
    resolver: AvailabilityResolver<'a, S>,
}

impl<'a, S: RuleStore + ?Sized> SlotGenerator<'a, S> {
    pub fn new(store: &'a S, config: EngineConfig) -> Self {
        Self {
            resolver: AvailabilityResolver::new(store, config),
        }
    }

    /// Resolved availability minus occupying busy intervals.
    fn free_ranges_in(
        &self,
        staff_id: &StaffId,
        window: &DayWindow,
        busy: &[BusyInterval],
    ) -> Vec<TimeRange> {
        let available = self.resolver.resolve_in(staff_id, window);
        if available.is_empty() {
            return available;
        }

        let occupying = busy
            .iter()
            .filter(|b| b.status.is_occupying())
            .map(|b| (b.start, b.end));
        match window.clip_all(occupying) {
            Clipped::WholeDay => Vec::new(),
            Clipped::Partial(removals) => interval::subtract(&available, &removals),
        }
    }

    /// Offerable slots of `duration_minutes` for `staff_id` on `date`.
    ///
    /// A duration longer than every free range yields no slots; slots are
    /// never truncated.
    pub fn free_slots(
        &self,
        staff_id: &StaffId,
        date: NaiveDate,
        duration_minutes: u32,
        busy: &[BusyInterval],
    ) -> Vec<Slot> {
        let config = self.resolver.config();
        if duration_minutes == 0 || config.slot_step_minutes == 0 {
            return Vec::new();
        }

        let window = self.resolver.window(date);
        let free = self.free_ranges_in(staff_id, &window, busy);
        let duration = Duration::minutes(i64::from(duration_minutes));

        let mut slots: Vec<Slot> = Vec::new();
        for range in &free {
            let candidates =
                enumerate_slot_ranges(&[*range], duration_minutes, config.slot_step_minutes);
            for candidate in candidates {
                let Some(start) = window.instant_at(candidate.start, config.dst_policy) else {
                    continue;
                };
                let end = start + duration;
                // Wall-clock fit can misstate real time on a DST day, so the
                // slot's absolute span must map back inside the free range.
                let covered = window.clip(start.with_timezone(&Utc), end.with_timezone(&Utc));
                if !covered.is_some_and(|c| range.contains_range(&c)) {
                    continue;
                }
                let slot = Slot {
                    start: start.fixed_offset(),
                    end: end.fixed_offset(),
                };
                // Shifted gap starts collapse onto one instant.
                if slots.last().is_some_and(|last| last.start == slot.start) {
                    continue;
                }
                slots.push(slot);
            }
        }

        debug!(staff = %staff_id, %date, duration_minutes, slots = slots.len(), "generated slots");
        slots
    }

    /// [`free_slots`](Self::free_slots) with busy intervals fetched from a
    /// booking source.
    pub fn free_slots_from_source<B: BookingSource + ?Sized>(
        &self,
        staff_id: &StaffId,
        date: NaiveDate,
        duration_minutes: u32,
        source: &B,
    ) -> Vec<Slot> {
        let busy = source.busy_intervals(staff_id, date);
        self.free_slots(staff_id, date, duration_minutes, &busy)
    }
}
