//! Resolve one staff member's availability on one date.
//!
//! The four rule sources are applied as a fixed sequence of pure steps:
//!
//! 1. base ranges from the active working pattern for the weekday;
//! 2. the date's override (`CLOSED` ends resolution with no availability);
//! 3. minus approved leave;
//! 4. minus blocked time (staff-specific and global);
//! 5. merged.
//!
//! Later steps only shrink the running set, except an `ADD` override. The
//! order is part of the contract, so it lives here as straight-line code
//! rather than behind a trait per rule source.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::config::EngineConfig;
use crate::day::{Clipped, DayWindow};
use crate::interval::{self, TimeRange};
use crate::model::{AvailabilityOverride, OverrideMode, StaffId, WorkingPattern};
use crate::store::RuleStore;

/// Outcome of one pipeline step.
enum Step {
    Continue(Vec<TimeRange>),
    /// Nothing later can add time back.
    Empty,
}

/// Resolves availability against a store snapshot.
///
/// Holds only a shared borrow of the store, so any number of resolvers may
/// run over the same snapshot at once.
pub struct AvailabilityResolver<'a, S: RuleStore + ?Sized> {
    store: &'a S,
    config: EngineConfig,
}

impl<'a, S: RuleStore + ?Sized> AvailabilityResolver<'a, S> {
    pub fn new(store: &'a S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The day window of `date` in the business timezone.
    pub fn window(&self, date: NaiveDate) -> DayWindow {
        DayWindow::new(date, self.config.business_timezone)
    }

    /// Free time ranges for `staff_id` on `date`, sorted and merged.
    ///
    /// Never fails: an unknown staff member or a day without rules simply has
    /// no availability.
    pub fn resolve(&self, staff_id: &StaffId, date: NaiveDate) -> Vec<TimeRange> {
        self.resolve_in(staff_id, &self.window(date))
    }

    /// As [`resolve`](Self::resolve), for a window the caller already built.
    pub fn resolve_in(&self, staff_id: &StaffId, window: &DayWindow) -> Vec<TimeRange> {
        let date = window.date();
        if !self.store.is_known_staff(staff_id) {
            debug!(staff = %staff_id, %date, "unknown staff member");
            return Vec::new();
        }
        let base = self.base_ranges(staff_id, date);
        debug!(staff = %staff_id, %date, ranges = base.len(), "base ranges");

        let override_rule = self.store.override_on(staff_id, date);
        let ranges = match apply_override(base, override_rule.as_ref()) {
            Step::Continue(ranges) => ranges,
            Step::Empty => {
                debug!(staff = %staff_id, %date, "closed by override");
                return Vec::new();
            }
        };

        let ranges = match self.subtract_leave(staff_id, window, ranges) {
            Step::Continue(ranges) => ranges,
            Step::Empty => {
                debug!(staff = %staff_id, %date, "whole day on leave");
                return Vec::new();
            }
        };

        let ranges = match self.subtract_blocks(staff_id, window, ranges) {
            Step::Continue(ranges) => ranges,
            Step::Empty => {
                debug!(staff = %staff_id, %date, "whole day blocked");
                return Vec::new();
            }
        };

        let resolved = interval::merge_overlaps(&ranges);
        debug!(staff = %staff_id, %date, ranges = resolved.len(), "resolved availability");
        resolved
    }

    /// Step 1: the weekday's rules from the active pattern, unmerged.
    fn base_ranges(&self, staff_id: &StaffId, date: NaiveDate) -> Vec<TimeRange> {
        let patterns = self.store.patterns_for(staff_id);
        select_active_pattern(&patterns, date)
            .map(|pattern| {
                pattern
                    .rules_for(date)
                    .into_iter()
                    .map(|rule| rule.range())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Step 3.
    fn subtract_leave(
        &self,
        staff_id: &StaffId,
        window: &DayWindow,
        ranges: Vec<TimeRange>,
    ) -> Step {
        let leave = self
            .store
            .approved_leave_between(staff_id, window.start(), window.end());
        subtract_clipped(window, leave.iter().map(|l| (l.start, l.end)), ranges)
    }

    /// Step 4.
    fn subtract_blocks(
        &self,
        staff_id: &StaffId,
        window: &DayWindow,
        ranges: Vec<TimeRange>,
    ) -> Step {
        let blocks = self
            .store
            .blocks_between(staff_id, window.start(), window.end());
        subtract_clipped(window, blocks.iter().map(|b| (b.start, b.end)), ranges)
    }
}

/// The most recently created active pattern whose effective window contains
/// `date`. Creation-time ties go to the higher id.
pub fn select_active_pattern(patterns: &[WorkingPattern], date: NaiveDate) -> Option<&WorkingPattern> {
    patterns
        .iter()
        .filter(|p| p.active && p.is_effective_on(date))
        .max_by_key(|p| (p.created_at, p.id))
}

/// Step 2.
fn apply_override(base: Vec<TimeRange>, override_rule: Option<&AvailabilityOverride>) -> Step {
    let Some(rule) = override_rule else {
        return Step::Continue(interval::merge_overlaps(&base));
    };
    let periods = rule.ranges();
    match rule.mode {
        OverrideMode::Closed => Step::Empty,
        OverrideMode::Replace => Step::Continue(interval::merge_overlaps(&periods)),
        OverrideMode::Add => Step::Continue(interval::union(&base, &periods)),
        OverrideMode::Remove => Step::Continue(interval::subtract(&base, &periods)),
    }
}

fn subtract_clipped<I>(window: &DayWindow, intervals: I, ranges: Vec<TimeRange>) -> Step
where
    I: IntoIterator<Item = (DateTime<Utc>, DateTime<Utc>)>,
{
    match window.clip_all(intervals) {
        Clipped::WholeDay => Step::Empty,
        Clipped::Partial(removals) if removals.is_empty() => Step::Continue(ranges),
        Clipped::Partial(removals) => {
            let removals = interval::merge_overlaps(&removals);
            Step::Continue(interval::subtract(&ranges, &removals))
        }
    }
}
