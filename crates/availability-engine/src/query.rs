//! The two read-only queries, in the response shapes the front end consumes.
//!
//! ```json
//! { "staff_id": "s1", "date": "2026-03-16",
//!   "ranges": [ { "start": "09:00", "end": "12:00" } ] }
//!
//! { "staff_id": "s1", "date": "2026-03-16", "duration_minutes": 60,
//!   "slots": [ { "start": "2026-03-16T09:00:00+00:00", "end": "2026-03-16T10:00:00+00:00" } ] }
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::interval::TimeRange;
use crate::model::StaffId;
use crate::resolver::AvailabilityResolver;
use crate::slots::{BookingSource, Slot, SlotGenerator};
use crate::store::RuleStore;
use crate::validation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub staff_id: StaffId,
    pub date: NaiveDate,
    pub ranges: Vec<TimeRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotsResponse {
    pub staff_id: StaffId,
    pub date: NaiveDate,
    pub duration_minutes: u32,
    pub slots: Vec<Slot>,
}

pub fn availability<S: RuleStore + ?Sized>(
    store: &S,
    config: EngineConfig,
    staff_id: &StaffId,
    date: NaiveDate,
) -> AvailabilityResponse {
    let ranges = AvailabilityResolver::new(store, config).resolve(staff_id, date);
    AvailabilityResponse {
        staff_id: staff_id.clone(),
        date,
        ranges,
    }
}

/// # Errors
/// Returns `Validation(InvalidDuration)` for a zero duration; the query is
/// otherwise infallible.
pub fn slots<S, B>(
    store: &S,
    config: EngineConfig,
    staff_id: &StaffId,
    date: NaiveDate,
    duration_minutes: u32,
    bookings: &B,
) -> Result<SlotsResponse>
where
    S: RuleStore + ?Sized,
    B: BookingSource + ?Sized,
{
    validation::require_duration(duration_minutes)?;
    let slots = SlotGenerator::new(store, config).free_slots_from_source(
        staff_id,
        date,
        duration_minutes,
        bookings,
    );
    Ok(SlotsResponse {
        staff_id: staff_id.clone(),
        date,
        duration_minutes,
        slots,
    })
}
