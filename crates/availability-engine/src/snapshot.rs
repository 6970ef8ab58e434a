//! JSON snapshots of a complete rule data set.
//!
//! A snapshot is replayed through [`RuleService`] in dependency order (staff,
//! patterns, overrides, leave, blocks, shifts, timesheets), so every
//! invariant the mutation API enforces also holds for loaded data. Ids are
//! assigned during replay in that order, starting at 1.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EngineConfig;
use crate::error::{Result, RuleError};
use crate::model::{BusyInterval, LeaveStatus, StaffId, StaffMember};
use crate::mutation::{NewBlock, NewLeave, NewOverride, NewPattern, NewShift, NewTimesheet, RuleService};
use crate::slots::InMemoryBookingSource;
use crate::store::InMemoryRuleStore;

/// Reviewer recorded for leave that arrives already reviewed.
const SNAPSHOT_REVIEWER: &str = "snapshot";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub config: Option<EngineConfig>,
    pub staff: Vec<StaffMember>,
    pub patterns: Vec<NewPattern>,
    pub overrides: Vec<NewOverride>,
    pub leave: Vec<SnapshotLeave>,
    pub blocks: Vec<NewBlock>,
    pub shifts: Vec<NewShift>,
    pub timesheets: Vec<NewTimesheet>,
    pub bookings: Vec<SnapshotBooking>,
}

/// A leave request together with the status it should end up in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotLeave {
    #[serde(flatten)]
    pub request: NewLeave,
    #[serde(default = "requested")]
    pub status: LeaveStatus,
    #[serde(default)]
    pub reviewed_by: Option<String>,
}

fn requested() -> LeaveStatus {
    LeaveStatus::Requested
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotBooking {
    pub staff_id: StaffId,
    #[serde(flatten)]
    pub busy: BusyInterval,
}

/// A replayed snapshot: the populated mutation API and the bookings.
#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub service: RuleService,
    pub bookings: InMemoryBookingSource,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RuleError::Snapshot(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| RuleError::Snapshot(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// The snapshot's own config, or the defaults.
    pub fn engine_config(&self) -> EngineConfig {
        self.config.unwrap_or_default()
    }

    /// Replay every record into a fresh store.
    ///
    /// `config` overrides the snapshot's own settings when given.
    ///
    /// # Errors
    /// `RuleError::Snapshot` naming the first record the mutation API
    /// rejected, e.g. `"overrides[2]: Conflict: …"`.
    pub fn load(self, config: Option<EngineConfig>) -> Result<LoadedSnapshot> {
        let config = config.unwrap_or_else(|| self.engine_config());
        let service = RuleService::new(Arc::new(InMemoryRuleStore::new()), config);

        for (i, member) in self.staff.into_iter().enumerate() {
            service.register_staff(member).map_err(|e| at("staff", i, e))?;
        }
        for (i, pattern) in self.patterns.into_iter().enumerate() {
            service.create_pattern(pattern).map_err(|e| at("patterns", i, e))?;
        }
        for (i, record) in self.overrides.into_iter().enumerate() {
            service.create_override(record).map_err(|e| at("overrides", i, e))?;
        }
        for (i, leave) in self.leave.into_iter().enumerate() {
            replay_leave(&service, leave).map_err(|e| at("leave", i, e))?;
        }
        for (i, block) in self.blocks.into_iter().enumerate() {
            service.create_block(block).map_err(|e| at("blocks", i, e))?;
        }
        for (i, shift) in self.shifts.into_iter().enumerate() {
            service.create_shift(shift).map_err(|e| at("shifts", i, e))?;
        }
        for (i, entry) in self.timesheets.into_iter().enumerate() {
            service.create_timesheet(entry).map_err(|e| at("timesheets", i, e))?;
        }

        let mut bookings = InMemoryBookingSource::new();
        for booking in self.bookings {
            bookings.add(booking.staff_id, booking.busy);
        }

        let counts = service.store().read().counts();
        info!(?counts, bookings = bookings.len(), "loaded snapshot");
        Ok(LoadedSnapshot { service, bookings })
    }
}

fn replay_leave(service: &RuleService, leave: SnapshotLeave) -> Result<()> {
    let created = service.create_leave(leave.request)?;
    let reviewer = leave.reviewed_by.as_deref().unwrap_or(SNAPSHOT_REVIEWER);
    match leave.status {
        LeaveStatus::Requested => {}
        LeaveStatus::Approved => {
            service.approve_leave(created.id, reviewer)?;
        }
        LeaveStatus::Rejected => {
            service.reject_leave(created.id, reviewer)?;
        }
        LeaveStatus::Cancelled => {
            service.cancel_leave(created.id)?;
        }
    }
    Ok(())
}

fn at(section: &str, index: usize, err: RuleError) -> RuleError {
    RuleError::Snapshot(format!("{section}[{index}]: {err}"))
}
