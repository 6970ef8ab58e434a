//! Error types for rule mutation and snapshot loading.
//!
//! The resolver and slot generator never fail: missing rules simply mean no
//! availability. Errors only arise at the mutation boundary, where they fall
//! into three families callers need to tell apart: bad input
//! ([`ValidationError`]), stale references ([`RuleError::NotFound`]) and
//! uniqueness clashes ([`ConflictError`]).

use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{LeaveStatus, OverrideMode, StaffId};
use crate::time_of_day::TimeOfDay;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error("Invalid snapshot: {0}")]
    Snapshot(String),
}

impl RuleError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable category name, used as the `kind` field of HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Snapshot(_) => "snapshot",
        }
    }
}

/// Structured reasons a mutation was rejected as bad input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: end {end} must be after start {start}")]
    EmptyRange {
        field: &'static str,
        start: String,
        end: String,
    },

    #[error("rules {first} and {second} overlap on weekday {weekday}")]
    OverlappingRules {
        weekday: u8,
        first: String,
        second: String,
    },

    #[error("weekday must be 0 (Monday) to 6 (Sunday), got {0}")]
    InvalidWeekday(u8),

    #[error("effective_to {to} is before effective_from {from}")]
    EffectiveWindowInverted { from: NaiveDate, to: NaiveDate },

    #[error("{0} must not be empty")]
    EmptyName(&'static str),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("a CLOSED override cannot carry periods ({0} supplied)")]
    ClosedOverrideWithPeriods(usize),

    #[error("a {0} override needs at least one period")]
    MissingPeriods(OverrideMode),

    #[error("leave request was already reviewed (status {0})")]
    AlreadyReviewed(LeaveStatus),

    #[error("leave request cannot move from {from} to {to}")]
    InvalidTransition { from: LeaveStatus, to: LeaveStatus },

    #[error("break of {break_minutes} minutes does not fit in a {worked_minutes}-minute span")]
    InvalidBreak {
        break_minutes: u32,
        worked_minutes: i64,
    },

    #[error("unknown leave status: {0:?}")]
    UnknownLeaveStatus(String),

    #[error("malformed time of day: {0:?}")]
    MalformedTime(String),

    #[error("malformed date: {0:?}")]
    MalformedDate(String),

    #[error("slot duration must be positive, got {0}")]
    InvalidDuration(u32),
}

impl ValidationError {
    pub(crate) fn empty_range(field: &'static str, start: TimeOfDay, end: TimeOfDay) -> Self {
        Self::EmptyRange {
            field,
            start: start.to_string(),
            end: end.to_string(),
        }
    }
}

/// Uniqueness violations detected while committing a mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    #[error("staff member {staff_id} already has an override on {date}")]
    OverrideExists { staff_id: StaffId, date: NaiveDate },

    #[error("staff member {0} is already registered")]
    StaffExists(StaffId),
}

pub type Result<T> = std::result::Result<T, RuleError>;
