//! # availability-engine
//!
//! Resolves when a staff member can be booked on a given date, and which
//! appointment slots to offer.
//!
//! Availability is layered from four rule sources, applied in a fixed order:
//! the weekly working pattern, a one-off date override, approved leave, and
//! blocked time. Existing bookings are then subtracted and the remainder is
//! cut into fixed-duration slots on a 15-minute grid.
//!
//! ## Modules
//!
//! - [`interval`]: normalize / merge / subtract / union over time-of-day ranges
//! - [`time_of_day`]: wall-clock time with a representable `24:00`
//! - [`day`]: local day windows and DST handling
//! - [`model`]: rule records and value objects
//! - [`store`]: read path and the in-memory store
//! - [`resolver`]: the layered resolution pipeline
//! - [`slots`]: slot generation and the booking-source seam
//! - [`mutation`]: CRUD and state transitions over the rule families
//! - [`validation`]: input checks used by the mutation API
//! - [`query`]: availability and slot query responses
//! - [`snapshot`]: JSON snapshots replayed through the mutation API
//! - [`config`]: business timezone and slot grid settings
//! - [`error`]: error types

pub mod config;
pub mod day;
pub mod error;
pub mod interval;
pub mod model;
pub mod mutation;
pub mod query;
pub mod resolver;
pub mod slots;
pub mod snapshot;
pub mod store;
pub mod time_of_day;
pub mod validation;

pub use config::EngineConfig;
pub use day::{DayWindow, DstPolicy};
pub use error::{ConflictError, RuleError, ValidationError};
pub use interval::{merge_overlaps, normalize, subtract, union, TimeRange};
pub use model::StaffId;
pub use mutation::RuleService;
pub use resolver::AvailabilityResolver;
pub use slots::{BookingSource, InMemoryBookingSource, Slot, SlotGenerator};
pub use snapshot::Snapshot;
pub use store::{InMemoryRuleStore, RuleStore};
pub use time_of_day::TimeOfDay;
