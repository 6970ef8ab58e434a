//! CRUD surface over the rule families.
//!
//! Every operation takes the store's write guard once, validates against the
//! guarded tables, and only then mutates, so a rejected operation leaves the
//! store exactly as it was. Nested children (pattern rules, override periods)
//! are replaced wholesale when supplied on update.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::day::DayWindow;
use crate::error::{ConflictError, Result, RuleError, ValidationError};
use crate::model::{
    AvailabilityOverride, BlockId, BlockedTime, LeaveId, LeaveRequest, LeaveStatus, LeaveType,
    OverrideId, OverrideMode, OverridePeriod, PatternId, Shift, ShiftId, StaffId, StaffMember,
    TimesheetEntry, TimesheetId, WorkingPattern, WorkingPatternRule,
};
use crate::store::{InMemoryRuleStore, RuleTables};
use crate::time_of_day::TimeOfDay;
use crate::validation;

fn default_true() -> bool {
    true
}

// ── Inputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPattern {
    pub staff_id: StaffId,
    pub name: String,
    pub timezone: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub effective_from: Option<NaiveDate>,
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    #[serde(default)]
    pub rules: Vec<WorkingPatternRule>,
}

/// Full replacement of a pattern's attributes. When `rules` is `Some`, the
/// rule set is replaced; when `None`, the existing rules are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternUpdate {
    pub name: String,
    pub timezone: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub effective_from: Option<NaiveDate>,
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    #[serde(default)]
    pub rules: Option<Vec<WorkingPatternRule>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyPattern {
    pub target_staff_id: StaffId,
    #[serde(default)]
    pub new_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicatePattern {
    #[serde(default)]
    pub new_name: Option<String>,
    /// When set, the copy starts on this date and has no end date.
    #[serde(default)]
    pub new_effective_from: Option<NaiveDate>,
    #[serde(default)]
    pub deactivate_source: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOverride {
    pub staff_id: StaffId,
    pub date: NaiveDate,
    pub mode: OverrideMode,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub periods: Vec<OverridePeriod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideUpdate {
    /// Move the override to another date; must not collide with an existing one.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub mode: OverrideMode,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub periods: Option<Vec<OverridePeriod>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLeave {
    pub staff_id: StaffId,
    pub leave_type: LeaveType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBlock {
    #[serde(default)]
    pub staff_id: Option<StaffId>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShift {
    pub staff_id: StaffId,
    pub date: NaiveDate,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTimesheet {
    pub staff_id: StaffId,
    #[serde(default)]
    pub shift_id: Option<ShiftId>,
    pub clock_in: DateTime<Utc>,
    #[serde(default)]
    pub clock_out: Option<DateTime<Utc>>,
    #[serde(default)]
    pub break_minutes: u32,
    #[serde(default)]
    pub notes: String,
}

// ── Filters ─────────────────────────────────────────────────────────────────

/// Staff and inclusive local date range; every field optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordFilter {
    #[serde(default, rename = "staff")]
    pub staff_id: Option<StaffId>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaveFilter {
    #[serde(default, rename = "staff")]
    pub staff_id: Option<StaffId>,
    #[serde(default)]
    pub status: Option<LeaveStatus>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockFilter {
    #[serde(default, rename = "staff")]
    pub staff_id: Option<StaffId>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    /// With a staff filter, also return blocks that apply to everyone.
    #[serde(default)]
    pub include_global: bool,
}

/// Absolute bounds of an inclusive local date range.
struct InstantRange {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

impl InstantRange {
    fn new(config: &EngineConfig, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        let tz = config.business_timezone;
        Self {
            from: from.map(|d| DayWindow::new(d, tz).start()),
            to: to.map(|d| DayWindow::new(d, tz).end()),
        }
    }

    fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| end > from) && self.to.is_none_or(|to| start < to)
    }
}

fn date_in(date: NaiveDate, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
    from.is_none_or(|f| date >= f) && to.is_none_or(|t| date <= t)
}

// ── Service ─────────────────────────────────────────────────────────────────

/// The mutation API over an [`InMemoryRuleStore`].
#[derive(Debug, Clone)]
pub struct RuleService {
    store: Arc<InMemoryRuleStore>,
    config: EngineConfig,
}

impl RuleService {
    pub fn new(store: Arc<InMemoryRuleStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<InMemoryRuleStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Staff registry ──────────────────────────────────────────────────────

    pub fn register_staff(&self, member: StaffMember) -> Result<StaffMember> {
        let mut tables = self.store.write();
        if member.id.as_str().trim().is_empty() {
            warn!("rejected staff member with an empty id");
            return Err(ValidationError::EmptyName("staff id").into());
        }
        if tables.staff.contains_key(&member.id) {
            warn!(staff = %member.id, "staff member already registered");
            return Err(ConflictError::StaffExists(member.id).into());
        }
        tables.staff.insert(member.id.clone(), member.clone());
        info!(staff = %member.id, "registered staff member");
        Ok(member)
    }

    pub fn staff_member(&self, staff_id: &StaffId) -> Result<StaffMember> {
        self.store
            .read()
            .staff_member(staff_id)
            .cloned()
            .ok_or_else(|| RuleError::not_found("staff member", staff_id))
    }

    // ── Working patterns ────────────────────────────────────────────────────

    /// Create a pattern with its inline rule set.
    ///
    /// # Errors
    /// `NotFound` for an unknown staff member; `Validation` for an empty name,
    /// unknown timezone, inverted effective window or invalid/overlapping
    /// rules.
    pub fn create_pattern(&self, input: NewPattern) -> Result<WorkingPattern> {
        let mut tables = self.store.write();
        require_staff(&tables, &input.staff_id)?;
        validation::require_name("pattern name", &input.name)
            .and_then(|_| validation::require_timezone(&input.timezone))
            .and_then(|_| validation::require_effective_window(input.effective_from, input.effective_to))
            .and_then(|_| validation::require_rules(&input.rules))
            .inspect_err(|e| warn!(staff = %input.staff_id, error = %e, "rejected pattern"))?;

        let pattern = WorkingPattern {
            id: tables.allocate_id(),
            staff_id: input.staff_id,
            name: input.name,
            timezone: input.timezone,
            active: input.active,
            effective_from: input.effective_from,
            effective_to: input.effective_to,
            created_at: Utc::now(),
            rules: input.rules,
        };
        tables.patterns.insert(pattern.id, pattern.clone());
        info!(pattern = pattern.id, staff = %pattern.staff_id, rules = pattern.rules.len(), "created working pattern");
        Ok(pattern)
    }

    pub fn get_pattern(&self, id: PatternId) -> Result<WorkingPattern> {
        self.store
            .read()
            .pattern(id)
            .cloned()
            .ok_or_else(|| RuleError::not_found("working pattern", id))
    }

    /// Patterns ordered by id; all staff when `staff_id` is `None`.
    pub fn list_patterns(&self, staff_id: Option<&StaffId>) -> Vec<WorkingPattern> {
        self.store
            .read()
            .patterns
            .values()
            .filter(|p| staff_id.is_none_or(|s| &p.staff_id == s))
            .cloned()
            .collect()
    }

    pub fn update_pattern(&self, id: PatternId, update: PatternUpdate) -> Result<WorkingPattern> {
        let mut tables = self.store.write();
        if !tables.patterns.contains_key(&id) {
            return Err(RuleError::not_found("working pattern", id));
        }
        validation::require_name("pattern name", &update.name)
            .and_then(|_| validation::require_timezone(&update.timezone))
            .and_then(|_| validation::require_effective_window(update.effective_from, update.effective_to))
            .and_then(|_| update.rules.as_deref().map_or(Ok(()), validation::require_rules))
            .inspect_err(|e| warn!(pattern = id, error = %e, "rejected pattern update"))?;

        let pattern = tables
            .patterns
            .get_mut(&id)
            .ok_or_else(|| RuleError::not_found("working pattern", id))?;
        pattern.name = update.name;
        pattern.timezone = update.timezone;
        pattern.active = update.active;
        pattern.effective_from = update.effective_from;
        pattern.effective_to = update.effective_to;
        if let Some(rules) = update.rules {
            pattern.rules = rules;
        }
        info!(pattern = id, "updated working pattern");
        Ok(pattern.clone())
    }

    pub fn delete_pattern(&self, id: PatternId) -> Result<WorkingPattern> {
        let removed = self
            .store
            .write()
            .patterns
            .remove(&id)
            .ok_or_else(|| RuleError::not_found("working pattern", id))?;
        info!(pattern = id, "deleted working pattern");
        Ok(removed)
    }

    /// Deep-copy a pattern and its rules to another staff member.
    pub fn copy_pattern_to(&self, id: PatternId, request: CopyPattern) -> Result<WorkingPattern> {
        let mut tables = self.store.write();
        let source = tables
            .pattern(id)
            .cloned()
            .ok_or_else(|| RuleError::not_found("working pattern", id))?;
        require_staff(&tables, &request.target_staff_id)?;
        let name = request.new_name.unwrap_or_else(|| source.name.clone());
        validation::require_name("pattern name", &name)
            .inspect_err(|e| warn!(source = id, error = %e, "rejected pattern copy"))?;

        let copy = WorkingPattern {
            id: tables.allocate_id(),
            staff_id: request.target_staff_id,
            name,
            created_at: Utc::now(),
            ..source
        };
        tables.patterns.insert(copy.id, copy.clone());
        info!(source = id, pattern = copy.id, staff = %copy.staff_id, "copied working pattern");
        Ok(copy)
    }

    /// Deep-copy a pattern for the same staff member, optionally retiring the
    /// source in the same write.
    pub fn duplicate_pattern(
        &self,
        id: PatternId,
        request: DuplicatePattern,
    ) -> Result<WorkingPattern> {
        let mut tables = self.store.write();
        let source = tables
            .pattern(id)
            .cloned()
            .ok_or_else(|| RuleError::not_found("working pattern", id))?;
        let name = request
            .new_name
            .unwrap_or_else(|| format!("{} (copy)", source.name));
        validation::require_name("pattern name", &name)
            .inspect_err(|e| warn!(source = id, error = %e, "rejected pattern duplicate"))?;

        let (effective_from, effective_to) = match request.new_effective_from {
            Some(from) => (Some(from), None),
            None => (source.effective_from, source.effective_to),
        };

        let duplicate = WorkingPattern {
            id: tables.allocate_id(),
            name,
            active: true,
            effective_from,
            effective_to,
            created_at: Utc::now(),
            ..source
        };
        if request.deactivate_source {
            if let Some(source) = tables.patterns.get_mut(&id) {
                source.active = false;
            }
        }
        tables.patterns.insert(duplicate.id, duplicate.clone());
        info!(
            source = id,
            pattern = duplicate.id,
            deactivated_source = request.deactivate_source,
            "duplicated working pattern"
        );
        Ok(duplicate)
    }

    // ── Overrides ───────────────────────────────────────────────────────────

    /// # Errors
    /// `Conflict` when the staff member already has an override on the date.
    pub fn create_override(&self, input: NewOverride) -> Result<AvailabilityOverride> {
        let mut tables = self.store.write();
        require_staff(&tables, &input.staff_id)?;
        validation::require_periods(input.mode, &input.periods)
            .inspect_err(|e| warn!(staff = %input.staff_id, date = %input.date, error = %e, "rejected override"))?;
        if tables.override_id_on(&input.staff_id, input.date).is_some() {
            warn!(staff = %input.staff_id, date = %input.date, "override already exists");
            return Err(ConflictError::OverrideExists {
                staff_id: input.staff_id,
                date: input.date,
            }
            .into());
        }

        let record = AvailabilityOverride {
            id: tables.allocate_id(),
            staff_id: input.staff_id,
            date: input.date,
            mode: input.mode,
            reason: input.reason,
            periods: input.periods,
        };
        tables.overrides.insert(record.id, record.clone());
        info!(override_id = record.id, staff = %record.staff_id, date = %record.date, mode = %record.mode, "created override");
        Ok(record)
    }

    pub fn get_override(&self, id: OverrideId) -> Result<AvailabilityOverride> {
        self.store
            .read()
            .availability_override(id)
            .cloned()
            .ok_or_else(|| RuleError::not_found("availability override", id))
    }

    pub fn list_overrides(&self, filter: &RecordFilter) -> Vec<AvailabilityOverride> {
        let tables = self.store.read();
        let mut out: Vec<AvailabilityOverride> = tables
            .overrides()
            .filter(|o| filter.staff_id.as_ref().is_none_or(|s| &o.staff_id == s))
            .filter(|o| date_in(o.date, filter.from, filter.to))
            .cloned()
            .collect();
        out.sort_by(|a, b| (a.date, a.id).cmp(&(b.date, b.id)));
        out
    }

    /// Replace mode and reason; replace periods when supplied. A `CLOSED`
    /// result always ends up with no periods, any other mode with at least one.
    pub fn update_override(
        &self,
        id: OverrideId,
        update: OverrideUpdate,
    ) -> Result<AvailabilityOverride> {
        let mut tables = self.store.write();
        let current = tables
            .availability_override(id)
            .cloned()
            .ok_or_else(|| RuleError::not_found("availability override", id))?;

        let periods = match (update.mode, update.periods) {
            (_, Some(periods)) => periods,
            (OverrideMode::Closed, None) => Vec::new(),
            (_, None) => current.periods.clone(),
        };
        validation::require_periods(update.mode, &periods)
            .inspect_err(|e| warn!(override_id = id, error = %e, "rejected override update"))?;

        let date = update.date.unwrap_or(current.date);
        if date != current.date && tables.override_id_on(&current.staff_id, date).is_some() {
            warn!(override_id = id, %date, "override already exists");
            return Err(ConflictError::OverrideExists {
                staff_id: current.staff_id,
                date,
            }
            .into());
        }

        let record = AvailabilityOverride {
            date,
            mode: update.mode,
            reason: update.reason,
            periods,
            ..current
        };
        tables.overrides.insert(id, record.clone());
        info!(override_id = id, mode = %record.mode, "updated override");
        Ok(record)
    }

    pub fn delete_override(&self, id: OverrideId) -> Result<AvailabilityOverride> {
        let removed = self
            .store
            .write()
            .overrides
            .remove(&id)
            .ok_or_else(|| RuleError::not_found("availability override", id))?;
        info!(override_id = id, "deleted override");
        Ok(removed)
    }

    // ── Leave ───────────────────────────────────────────────────────────────

    /// New requests start as `REQUESTED` and do not affect availability until
    /// approved.
    pub fn create_leave(&self, input: NewLeave) -> Result<LeaveRequest> {
        let mut tables = self.store.write();
        require_staff(&tables, &input.staff_id)?;
        validation::require_instants("leave", input.start, input.end)
            .inspect_err(|e| warn!(staff = %input.staff_id, error = %e, "rejected leave request"))?;

        let request = LeaveRequest {
            id: tables.allocate_id(),
            staff_id: input.staff_id,
            leave_type: input.leave_type,
            start: input.start,
            end: input.end,
            status: LeaveStatus::Requested,
            reason: input.reason,
            reviewed_by: None,
            reviewed_at: None,
        };
        tables.leave.insert(request.id, request.clone());
        info!(leave = request.id, staff = %request.staff_id, "created leave request");
        Ok(request)
    }

    pub fn get_leave(&self, id: LeaveId) -> Result<LeaveRequest> {
        self.store
            .read()
            .leave_request(id)
            .cloned()
            .ok_or_else(|| RuleError::not_found("leave request", id))
    }

    pub fn list_leave(&self, filter: &LeaveFilter) -> Vec<LeaveRequest> {
        let range = InstantRange::new(&self.config, filter.from, filter.to);
        let tables = self.store.read();
        let mut out: Vec<LeaveRequest> = tables
            .leave_requests()
            .filter(|l| filter.staff_id.as_ref().is_none_or(|s| &l.staff_id == s))
            .filter(|l| filter.status.is_none_or(|s| l.status == s))
            .filter(|l| range.overlaps(l.start, l.end))
            .cloned()
            .collect();
        out.sort_by(|a, b| (a.start, a.id).cmp(&(b.start, b.id)));
        out
    }

    /// # Errors
    /// `Validation(AlreadyReviewed)` unless the request is still `REQUESTED`.
    pub fn approve_leave(&self, id: LeaveId, reviewer: &str) -> Result<LeaveRequest> {
        self.review_leave(id, reviewer, LeaveStatus::Approved)
    }

    pub fn reject_leave(&self, id: LeaveId, reviewer: &str) -> Result<LeaveRequest> {
        self.review_leave(id, reviewer, LeaveStatus::Rejected)
    }

    fn review_leave(&self, id: LeaveId, reviewer: &str, outcome: LeaveStatus) -> Result<LeaveRequest> {
        validation::require_name("reviewer", reviewer)
            .inspect_err(|e| warn!(leave = id, error = %e, "rejected leave review"))?;
        let mut tables = self.store.write();
        let request = tables
            .leave
            .get_mut(&id)
            .ok_or_else(|| RuleError::not_found("leave request", id))?;
        if !request.status.is_reviewable() {
            warn!(leave = id, status = %request.status, "leave already reviewed");
            return Err(ValidationError::AlreadyReviewed(request.status).into());
        }
        request.status = outcome;
        request.reviewed_by = Some(reviewer.to_string());
        request.reviewed_at = Some(Utc::now());
        info!(leave = id, status = %outcome, reviewer, "reviewed leave request");
        Ok(request.clone())
    }

    /// Withdraw a requested or approved leave request.
    pub fn cancel_leave(&self, id: LeaveId) -> Result<LeaveRequest> {
        let mut tables = self.store.write();
        let request = tables
            .leave
            .get_mut(&id)
            .ok_or_else(|| RuleError::not_found("leave request", id))?;
        if !request.status.is_cancellable() {
            warn!(leave = id, status = %request.status, "leave cannot be cancelled");
            return Err(ValidationError::InvalidTransition {
                from: request.status,
                to: LeaveStatus::Cancelled,
            }
            .into());
        }
        request.status = LeaveStatus::Cancelled;
        info!(leave = id, "cancelled leave request");
        Ok(request.clone())
    }

    // ── Blocked time ────────────────────────────────────────────────────────

    pub fn create_block(&self, input: NewBlock) -> Result<BlockedTime> {
        let mut tables = self.store.write();
        let block = build_block(&tables, 0, input)
            .inspect_err(|e| warn!(error = %e, "rejected blocked time"))?;
        let block = BlockedTime {
            id: tables.allocate_id(),
            ..block
        };
        tables.blocks.insert(block.id, block.clone());
        info!(block = block.id, global = block.staff_id.is_none(), "created blocked time");
        Ok(block)
    }

    pub fn get_block(&self, id: BlockId) -> Result<BlockedTime> {
        self.store
            .read()
            .blocked_time(id)
            .cloned()
            .ok_or_else(|| RuleError::not_found("blocked time", id))
    }

    pub fn update_block(&self, id: BlockId, input: NewBlock) -> Result<BlockedTime> {
        let mut tables = self.store.write();
        if !tables.blocks.contains_key(&id) {
            return Err(RuleError::not_found("blocked time", id));
        }
        let block = build_block(&tables, id, input)
            .inspect_err(|e| warn!(block = id, error = %e, "rejected blocked time update"))?;
        tables.blocks.insert(id, block.clone());
        info!(block = id, "updated blocked time");
        Ok(block)
    }

    pub fn delete_block(&self, id: BlockId) -> Result<BlockedTime> {
        let removed = self
            .store
            .write()
            .blocks
            .remove(&id)
            .ok_or_else(|| RuleError::not_found("blocked time", id))?;
        info!(block = id, "deleted blocked time");
        Ok(removed)
    }

    pub fn list_blocks(&self, filter: &BlockFilter) -> Vec<BlockedTime> {
        let range = InstantRange::new(&self.config, filter.from, filter.to);
        let tables = self.store.read();
        let mut out: Vec<BlockedTime> = tables
            .blocked_times()
            .filter(|b| match (&filter.staff_id, &b.staff_id) {
                (None, _) => true,
                (Some(wanted), Some(owner)) => wanted == owner,
                (Some(_), None) => filter.include_global,
            })
            .filter(|b| range.overlaps(b.start, b.end))
            .cloned()
            .collect();
        out.sort_by(|a, b| (a.start, a.id).cmp(&(b.start, b.id)));
        out
    }

    // ── Shifts ──────────────────────────────────────────────────────────────

    pub fn create_shift(&self, input: NewShift) -> Result<Shift> {
        let mut tables = self.store.write();
        let shift = build_shift(&tables, 0, input)
            .inspect_err(|e| warn!(error = %e, "rejected shift"))?;
        let shift = Shift {
            id: tables.allocate_id(),
            ..shift
        };
        tables.shifts.insert(shift.id, shift.clone());
        info!(shift = shift.id, staff = %shift.staff_id, "created shift");
        Ok(shift)
    }

    pub fn get_shift(&self, id: ShiftId) -> Result<Shift> {
        self.store
            .read()
            .shift(id)
            .cloned()
            .ok_or_else(|| RuleError::not_found("shift", id))
    }

    pub fn update_shift(&self, id: ShiftId, input: NewShift) -> Result<Shift> {
        let mut tables = self.store.write();
        if !tables.shifts.contains_key(&id) {
            return Err(RuleError::not_found("shift", id));
        }
        let shift = build_shift(&tables, id, input)
            .inspect_err(|e| warn!(shift = id, error = %e, "rejected shift update"))?;
        tables.shifts.insert(id, shift.clone());
        info!(shift = id, "updated shift");
        Ok(shift)
    }

    pub fn delete_shift(&self, id: ShiftId) -> Result<Shift> {
        let removed = self
            .store
            .write()
            .shifts
            .remove(&id)
            .ok_or_else(|| RuleError::not_found("shift", id))?;
        info!(shift = id, "deleted shift");
        Ok(removed)
    }

    pub fn list_shifts(&self, filter: &RecordFilter) -> Vec<Shift> {
        let tables = self.store.read();
        let mut out: Vec<Shift> = tables
            .shifts()
            .filter(|s| filter.staff_id.as_ref().is_none_or(|id| &s.staff_id == id))
            .filter(|s| date_in(s.date, filter.from, filter.to))
            .cloned()
            .collect();
        out.sort_by(|a, b| (a.date, a.start, a.id).cmp(&(b.date, b.start, b.id)));
        out
    }

    // ── Timesheets ──────────────────────────────────────────────────────────

    pub fn create_timesheet(&self, input: NewTimesheet) -> Result<TimesheetEntry> {
        let mut tables = self.store.write();
        let entry = build_timesheet(&tables, 0, input)
            .inspect_err(|e| warn!(error = %e, "rejected timesheet entry"))?;
        let entry = TimesheetEntry {
            id: tables.allocate_id(),
            ..entry
        };
        tables.timesheets.insert(entry.id, entry.clone());
        info!(timesheet = entry.id, staff = %entry.staff_id, "created timesheet entry");
        Ok(entry)
    }

    pub fn get_timesheet(&self, id: TimesheetId) -> Result<TimesheetEntry> {
        self.store
            .read()
            .timesheet(id)
            .cloned()
            .ok_or_else(|| RuleError::not_found("timesheet entry", id))
    }

    pub fn update_timesheet(&self, id: TimesheetId, input: NewTimesheet) -> Result<TimesheetEntry> {
        let mut tables = self.store.write();
        if !tables.timesheets.contains_key(&id) {
            return Err(RuleError::not_found("timesheet entry", id));
        }
        let entry = build_timesheet(&tables, id, input)
            .inspect_err(|e| warn!(timesheet = id, error = %e, "rejected timesheet update"))?;
        tables.timesheets.insert(id, entry.clone());
        info!(timesheet = id, "updated timesheet entry");
        Ok(entry)
    }

    pub fn delete_timesheet(&self, id: TimesheetId) -> Result<TimesheetEntry> {
        let removed = self
            .store
            .write()
            .timesheets
            .remove(&id)
            .ok_or_else(|| RuleError::not_found("timesheet entry", id))?;
        info!(timesheet = id, "deleted timesheet entry");
        Ok(removed)
    }

    pub fn list_timesheets(&self, filter: &RecordFilter) -> Vec<TimesheetEntry> {
        let range = InstantRange::new(&self.config, filter.from, filter.to);
        let tables = self.store.read();
        let mut out: Vec<TimesheetEntry> = tables
            .timesheets()
            .filter(|t| filter.staff_id.as_ref().is_none_or(|s| &t.staff_id == s))
            // An open entry counts as running until now.
            .filter(|t| range.overlaps(t.clock_in, t.clock_out.unwrap_or_else(Utc::now)))
            .cloned()
            .collect();
        out.sort_by(|a, b| (a.clock_in, a.id).cmp(&(b.clock_in, b.id)));
        out
    }
}

fn require_staff(tables: &RuleTables, staff_id: &StaffId) -> Result<()> {
    if tables.staff_member(staff_id).is_none() {
        return Err(RuleError::not_found("staff member", staff_id));
    }
    Ok(())
}

fn build_block(tables: &RuleTables, id: BlockId, input: NewBlock) -> Result<BlockedTime> {
    if let Some(staff_id) = &input.staff_id {
        require_staff(tables, staff_id)?;
    }
    validation::require_instants("blocked time", input.start, input.end)?;
    Ok(BlockedTime {
        id,
        staff_id: input.staff_id,
        start: input.start,
        end: input.end,
        reason: input.reason,
    })
}

fn build_shift(tables: &RuleTables, id: ShiftId, input: NewShift) -> Result<Shift> {
    require_staff(tables, &input.staff_id)?;
    validation::require_range("shift", input.start, input.end)?;
    Ok(Shift {
        id,
        staff_id: input.staff_id,
        date: input.date,
        start: input.start,
        end: input.end,
        role: input.role,
        notes: input.notes,
    })
}

fn build_timesheet(tables: &RuleTables, id: TimesheetId, input: NewTimesheet) -> Result<TimesheetEntry> {
    require_staff(tables, &input.staff_id)?;
    if let Some(shift_id) = input.shift_id {
        if tables.shift(shift_id).is_none() {
            return Err(RuleError::not_found("shift", shift_id));
        }
    }
    validation::require_timesheet(input.clock_in, input.clock_out, input.break_minutes)?;
    Ok(TimesheetEntry {
        id,
        staff_id: input.staff_id,
        shift_id: input.shift_id,
        clock_in: input.clock_in,
        clock_out: input.clock_out,
        break_minutes: input.break_minutes,
        notes: input.notes,
    })
}
