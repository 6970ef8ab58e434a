//! Rule records and their value objects.
//!
//! Ownership is tree-shaped: a [`WorkingPattern`] owns its
//! [`WorkingPatternRule`]s and an [`AvailabilityOverride`] owns its
//! [`OverridePeriod`]s as plain `Vec`s, so replacing every child is a single
//! assignment and dropping the parent drops the children.
//!
//! Rules, overrides and shifts hold wall-clock [`TimeOfDay`] values. Leave,
//! blocks, timesheets and bookings hold absolute UTC instants.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::interval::TimeRange;
use crate::time_of_day::TimeOfDay;

pub type PatternId = u64;
pub type OverrideId = u64;
pub type LeaveId = u64;
pub type BlockId = u64;
pub type ShiftId = u64;
pub type TimesheetId = u64;

/// Opaque identifier of a staff member, owned by the surrounding platform.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffId(String);

impl StaffId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StaffId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The engine only needs to know a staff member exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: StaffId,
    #[serde(default)]
    pub display_name: String,
}

/// Monday-based weekday index (0 = Monday … 6 = Sunday) of a date.
pub fn weekday_index(date: NaiveDate) -> u8 {
    // num_days_from_monday is always 0..=6.
    date.weekday().num_days_from_monday() as u8
}

// ── Working patterns ────────────────────────────────────────────────────────

/// A named, dated weekly template for one staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingPattern {
    pub id: PatternId,
    pub staff_id: StaffId,
    pub name: String,
    /// IANA name the administrator entered the template in.
    pub timezone: String,
    pub active: bool,
    pub effective_from: Option<NaiveDate>,
    pub effective_to: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub rules: Vec<WorkingPatternRule>,
}

impl WorkingPattern {
    /// Inclusive on both bounds; a missing bound is open.
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.effective_from.is_none_or(|from| from <= date)
            && self.effective_to.is_none_or(|to| date <= to)
    }

    /// Rules for the weekday of `date`, ordered by `(sort_order, start)`.
    pub fn rules_for(&self, date: NaiveDate) -> Vec<&WorkingPatternRule> {
        let weekday = weekday_index(date);
        let mut rules: Vec<&WorkingPatternRule> =
            self.rules.iter().filter(|r| r.weekday == weekday).collect();
        rules.sort_by_key(|r| (r.sort_order, r.start));
        rules
    }
}

/// One contiguous working segment. Several per weekday model split shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingPatternRule {
    pub weekday: u8,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    #[serde(default)]
    pub sort_order: i32,
}

impl WorkingPatternRule {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}

// ── Overrides ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverrideMode {
    /// Discard the weekly template and use the periods instead.
    Replace,
    /// Union the periods with the weekly template.
    Add,
    /// Subtract the periods from the weekly template.
    Remove,
    /// No availability at all on this date.
    Closed,
}

impl fmt::Display for OverrideMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Replace => "REPLACE",
            Self::Add => "ADD",
            Self::Remove => "REMOVE",
            Self::Closed => "CLOSED",
        };
        f.write_str(s)
    }
}

/// A one-off exception to the weekly template, unique per staff and date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityOverride {
    pub id: OverrideId,
    pub staff_id: StaffId,
    pub date: NaiveDate,
    pub mode: OverrideMode,
    pub reason: String,
    pub periods: Vec<OverridePeriod>,
}

impl AvailabilityOverride {
    /// Period ranges ordered by `(sort_order, start)`.
    pub fn ranges(&self) -> Vec<TimeRange> {
        let mut periods = self.periods.clone();
        periods.sort_by_key(|p| (p.sort_order, p.start));
        periods.iter().map(OverridePeriod::range).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverridePeriod {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    #[serde(default)]
    pub sort_order: i32,
}

impl OverridePeriod {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}

// ── Leave ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveType {
    Annual,
    Sick,
    Unpaid,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveStatus {
    Requested,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    /// Whether a request in this status may still be approved or rejected.
    pub fn is_reviewable(self) -> bool {
        self == Self::Requested
    }

    /// Requested leave can be withdrawn, and so can approved leave.
    pub fn is_cancellable(self) -> bool {
        matches!(self, Self::Requested | Self::Approved)
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Requested => "REQUESTED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for LeaveStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "REQUESTED" => Ok(Self::Requested),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(ValidationError::UnknownLeaveStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub id: LeaveId,
    pub staff_id: StaffId,
    pub leave_type: LeaveType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: LeaveStatus,
    pub reason: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

// ── Blocks, shifts, timesheets ──────────────────────────────────────────────

/// Ad-hoc unavailability. `staff_id: None` applies to every staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedTime {
    pub id: BlockId,
    pub staff_id: Option<StaffId>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub reason: String,
}

impl BlockedTime {
    pub fn applies_to(&self, staff_id: &StaffId) -> bool {
        self.staff_id.as_ref().is_none_or(|owner| owner == staff_id)
    }
}

/// A rostered shift. Shares the store but plays no part in resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub id: ShiftId,
    pub staff_id: StaffId,
    pub date: NaiveDate,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub role: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimesheetEntry {
    pub id: TimesheetId,
    pub staff_id: StaffId,
    pub shift_id: Option<ShiftId>,
    pub clock_in: DateTime<Utc>,
    pub clock_out: Option<DateTime<Utc>>,
    pub break_minutes: u32,
    pub notes: String,
}

// ── Bookings (external) ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    NoShow,
    Completed,
}

impl BookingStatus {
    /// Pending and confirmed bookings hold the staff member's time.
    pub fn is_occupying(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

/// A booking as seen by the engine: an opaque busy span with a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: BookingStatus,
}

impl BusyInterval {
    pub fn confirmed(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            status: BookingStatus::Confirmed,
        }
    }
}
