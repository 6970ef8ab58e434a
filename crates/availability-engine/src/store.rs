//! Rule storage.
//!
//! [`RuleStore`] is the read path the resolver depends on. [`RuleTables`] is
//! the in-memory data set and implements it directly; [`InMemoryRuleStore`]
//! wraps the tables in a `RwLock` so many readers can resolve concurrently
//! while each mutation validates and commits under a single write guard.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, NaiveDate, Utc};

use crate::model::{
    AvailabilityOverride, BlockId, BlockedTime, LeaveId, LeaveRequest, LeaveStatus, OverrideId,
    PatternId, Shift, ShiftId, StaffId, StaffMember, TimesheetEntry, TimesheetId, WorkingPattern,
};

/// Read access to the four rule families for one staff member.
///
/// Implementations must be side-effect free; the resolver may call them from
/// any number of threads.
pub trait RuleStore {
    /// Whether the staff member is registered; unknown staff resolve to
    /// nothing.
    fn is_known_staff(&self, staff_id: &StaffId) -> bool;

    /// Every pattern owned by the staff member, active or not.
    fn patterns_for(&self, staff_id: &StaffId) -> Vec<WorkingPattern>;

    /// The single override for `(staff, date)`, if any.
    fn override_on(&self, staff_id: &StaffId, date: NaiveDate) -> Option<AvailabilityOverride>;

    /// APPROVED leave overlapping `[from, to)`.
    fn approved_leave_between(
        &self,
        staff_id: &StaffId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<LeaveRequest>;

    /// Blocks owned by the staff member or global, overlapping `[from, to)`.
    fn blocks_between(
        &self,
        staff_id: &StaffId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<BlockedTime>;
}

/// The in-memory data set. Ids come from one increasing sequence.
#[derive(Debug, Default, Clone)]
pub struct RuleTables {
    pub(crate) staff: BTreeMap<StaffId, StaffMember>,
    pub(crate) patterns: BTreeMap<PatternId, WorkingPattern>,
    pub(crate) overrides: BTreeMap<OverrideId, AvailabilityOverride>,
    pub(crate) leave: BTreeMap<LeaveId, LeaveRequest>,
    pub(crate) blocks: BTreeMap<BlockId, BlockedTime>,
    pub(crate) shifts: BTreeMap<ShiftId, Shift>,
    pub(crate) timesheets: BTreeMap<TimesheetId, TimesheetEntry>,
    next_id: u64,
}

impl RuleTables {
    pub(crate) fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn staff_member(&self, staff_id: &StaffId) -> Option<&StaffMember> {
        self.staff.get(staff_id)
    }

    pub fn pattern(&self, id: PatternId) -> Option<&WorkingPattern> {
        self.patterns.get(&id)
    }

    pub fn availability_override(&self, id: OverrideId) -> Option<&AvailabilityOverride> {
        self.overrides.get(&id)
    }

    pub fn leave_request(&self, id: LeaveId) -> Option<&LeaveRequest> {
        self.leave.get(&id)
    }

    pub fn blocked_time(&self, id: BlockId) -> Option<&BlockedTime> {
        self.blocks.get(&id)
    }

    pub fn shift(&self, id: ShiftId) -> Option<&Shift> {
        self.shifts.get(&id)
    }

    pub fn timesheet(&self, id: TimesheetId) -> Option<&TimesheetEntry> {
        self.timesheets.get(&id)
    }

    pub fn overrides(&self) -> impl Iterator<Item = &AvailabilityOverride> {
        self.overrides.values()
    }

    pub fn leave_requests(&self) -> impl Iterator<Item = &LeaveRequest> {
        self.leave.values()
    }

    pub fn blocked_times(&self) -> impl Iterator<Item = &BlockedTime> {
        self.blocks.values()
    }

    pub fn shifts(&self) -> impl Iterator<Item = &Shift> {
        self.shifts.values()
    }

    pub fn timesheets(&self) -> impl Iterator<Item = &TimesheetEntry> {
        self.timesheets.values()
    }

    /// Id of the override occupying `(staff, date)`, if one exists.
    pub(crate) fn override_id_on(&self, staff_id: &StaffId, date: NaiveDate) -> Option<OverrideId> {
        self.overrides
            .values()
            .find(|o| &o.staff_id == staff_id && o.date == date)
            .map(|o| o.id)
    }

    /// Record counts per family, in snapshot order.
    pub fn counts(&self) -> TableCounts {
        TableCounts {
            staff: self.staff.len(),
            patterns: self.patterns.len(),
            overrides: self.overrides.len(),
            leave: self.leave.len(),
            blocks: self.blocks.len(),
            shifts: self.shifts.len(),
            timesheets: self.timesheets.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct TableCounts {
    pub staff: usize,
    pub patterns: usize,
    pub overrides: usize,
    pub leave: usize,
    pub blocks: usize,
    pub shifts: usize,
    pub timesheets: usize,
}

impl RuleStore for RuleTables {
    fn is_known_staff(&self, staff_id: &StaffId) -> bool {
        self.staff.contains_key(staff_id)
    }

    fn patterns_for(&self, staff_id: &StaffId) -> Vec<WorkingPattern> {
        self.patterns
            .values()
            .filter(|p| &p.staff_id == staff_id)
            .cloned()
            .collect()
    }

    fn override_on(&self, staff_id: &StaffId, date: NaiveDate) -> Option<AvailabilityOverride> {
        self.override_id_on(staff_id, date)
            .and_then(|id| self.overrides.get(&id))
            .cloned()
    }

    fn approved_leave_between(
        &self,
        staff_id: &StaffId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<LeaveRequest> {
        self.leave
            .values()
            .filter(|l| &l.staff_id == staff_id && l.status == LeaveStatus::Approved)
            .filter(|l| l.start < to && l.end > from)
            .cloned()
            .collect()
    }

    fn blocks_between(
        &self,
        staff_id: &StaffId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<BlockedTime> {
        self.blocks
            .values()
            .filter(|b| b.applies_to(staff_id))
            .filter(|b| b.start < to && b.end > from)
            .cloned()
            .collect()
    }
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    tables: RwLock<RuleTables>,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A consistent read snapshot. Hold the guard for the whole resolution.
    ///
    /// Writers never leave the tables half-updated (they validate before
    /// touching anything), so a poisoned lock is still safe to read.
    pub fn read(&self) -> RwLockReadGuard<'_, RuleTables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, RuleTables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}
