//! Tests for slot generation on top of resolved availability.

use std::sync::Arc;

use availability_engine::model::{
    AvailabilityOverride, BlockedTime, BookingStatus, BusyInterval, LeaveRequest, StaffMember,
    WorkingPattern, WorkingPatternRule,
};
use availability_engine::mutation::NewPattern;
use availability_engine::query;
use availability_engine::{
    DstPolicy, EngineConfig, InMemoryBookingSource, InMemoryRuleStore, RuleError, RuleService,
    RuleStore, Slot, SlotGenerator, StaffId, TimeOfDay, ValidationError,
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn t(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn rule(weekday: u8, start: &str, end: &str) -> WorkingPatternRule {
    WorkingPatternRule {
        weekday,
        start: t(start),
        end: t(end),
        sort_order: 0,
    }
}

fn service_with_rules(config: EngineConfig, rules: Vec<WorkingPatternRule>) -> RuleService {
    let service = RuleService::new(Arc::new(InMemoryRuleStore::new()), config);
    service
        .register_staff(StaffMember {
            id: StaffId::new("s1"),
            display_name: "Sam".to_string(),
        })
        .unwrap();
    service
        .create_pattern(NewPattern {
            staff_id: StaffId::new("s1"),
            name: "Mornings".to_string(),
            timezone: "UTC".to_string(),
            active: true,
            effective_from: None,
            effective_to: None,
            rules,
        })
        .unwrap();
    service
}

/// Staff "s1" working Monday 09:00–12:00 in UTC.
fn monday_mornings() -> RuleService {
    service_with_rules(EngineConfig::default(), vec![rule(0, "09:00", "12:00")])
}

fn slots(service: &RuleService, on: NaiveDate, duration: u32, busy: &[BusyInterval]) -> Vec<Slot> {
    let tables = service.store().read();
    SlotGenerator::new(&*tables, *service.config()).free_slots(&StaffId::new("s1"), on, duration, busy)
}

fn starts(slots: &[Slot]) -> Vec<String> {
    slots.iter().map(|s| s.start.to_rfc3339()).collect()
}

fn monday() -> NaiveDate {
    date("2026-03-16")
}

// ── Scenario 5: hourly slots on a 15-minute grid ────────────────────────────

#[test]
fn hourly_slots_step_every_quarter_hour() {
    let service = monday_mornings();
    let result = slots(&service, monday(), 60, &[]);

    assert_eq!(result.len(), 9);
    assert_eq!(result[0].start.to_rfc3339(), "2026-03-16T09:00:00+00:00");
    assert_eq!(result[0].end.to_rfc3339(), "2026-03-16T10:00:00+00:00");
    assert_eq!(result[8].start.to_rfc3339(), "2026-03-16T11:00:00+00:00");
    assert_eq!(result[8].end.to_rfc3339(), "2026-03-16T12:00:00+00:00");
}

#[test]
fn confirmed_booking_removes_overlapping_slots() {
    let service = monday_mornings();
    let busy = [BusyInterval::confirmed(
        utc("2026-03-16T10:00:00Z"),
        utc("2026-03-16T10:30:00Z"),
    )];
    let result = slots(&service, monday(), 60, &busy);

    assert_eq!(
        starts(&result),
        vec![
            "2026-03-16T09:00:00+00:00",
            "2026-03-16T10:30:00+00:00",
            "2026-03-16T10:45:00+00:00",
            "2026-03-16T11:00:00+00:00",
        ]
    );
}

#[test]
fn pending_booking_also_occupies_time() {
    let service = monday_mornings();
    let busy = [BusyInterval {
        start: utc("2026-03-16T09:00:00Z"),
        end: utc("2026-03-16T11:00:00Z"),
        status: BookingStatus::Pending,
    }];
    assert_eq!(slots(&service, monday(), 60, &busy).len(), 1);
}

#[test]
fn cancelled_and_completed_bookings_are_ignored() {
    let service = monday_mornings();
    let busy: Vec<BusyInterval> = [
        BookingStatus::Cancelled,
        BookingStatus::NoShow,
        BookingStatus::Completed,
    ]
    .into_iter()
    .map(|status| BusyInterval {
        start: utc("2026-03-16T09:00:00Z"),
        end: utc("2026-03-16T12:00:00Z"),
        status,
    })
    .collect();
    assert_eq!(slots(&service, monday(), 60, &busy).len(), 9);
}

#[test]
fn booking_on_another_day_is_ignored() {
    let service = monday_mornings();
    let busy = [BusyInterval::confirmed(
        utc("2026-03-17T09:00:00Z"),
        utc("2026-03-17T12:00:00Z"),
    )];
    assert_eq!(slots(&service, monday(), 60, &busy).len(), 9);
}

#[test]
fn booking_covering_whole_day_leaves_nothing() {
    let service = monday_mornings();
    let busy = [BusyInterval::confirmed(
        utc("2026-03-15T00:00:00Z"),
        utc("2026-03-17T00:00:00Z"),
    )];
    assert!(slots(&service, monday(), 15, &busy).is_empty());
}

#[test]
fn duration_longer_than_any_free_range_yields_nothing() {
    let service = monday_mornings();
    assert!(slots(&service, monday(), 240, &[]).is_empty());
}

#[test]
fn duration_equal_to_range_yields_exactly_one_slot() {
    let service = monday_mornings();
    let result = slots(&service, monday(), 180, &[]);
    assert_eq!(starts(&result), vec!["2026-03-16T09:00:00+00:00"]);
}

#[test]
fn zero_duration_yields_no_slots() {
    let service = monday_mornings();
    assert!(slots(&service, monday(), 0, &[]).is_empty());
}

#[test]
fn query_rejects_zero_duration() {
    let service = monday_mornings();
    let tables = service.store().read();
    let err = query::slots(
        &*tables,
        *service.config(),
        &StaffId::new("s1"),
        monday(),
        0,
        &InMemoryBookingSource::new(),
    )
    .unwrap_err();
    assert_eq!(err, RuleError::Validation(ValidationError::InvalidDuration(0)));
}

#[test]
fn query_reads_bookings_from_source() {
    let service = monday_mornings();
    let mut bookings = InMemoryBookingSource::new();
    bookings.add(
        StaffId::new("s1"),
        BusyInterval::confirmed(utc("2026-03-16T09:00:00Z"), utc("2026-03-16T11:00:00Z")),
    );
    bookings.add(
        StaffId::new("s2"),
        BusyInterval::confirmed(utc("2026-03-16T11:00:00Z"), utc("2026-03-16T12:00:00Z")),
    );

    let tables = service.store().read();
    let response = query::slots(
        &*tables,
        *service.config(),
        &StaffId::new("s1"),
        monday(),
        30,
        &bookings,
    )
    .unwrap();
    assert_eq!(response.duration_minutes, 30);
    assert_eq!(
        starts(&response.slots),
        vec![
            "2026-03-16T11:00:00+00:00",
            "2026-03-16T11:15:00+00:00",
            "2026-03-16T11:30:00+00:00",
        ]
    );
}

#[test]
fn custom_step_changes_grid() {
    let config = EngineConfig::default().with_slot_step(30);
    let service = service_with_rules(config, vec![rule(0, "09:00", "12:00")]);
    assert_eq!(slots(&service, monday(), 60, &[]).len(), 5);
}

#[test]
fn slots_carry_business_timezone_offset() {
    let config = EngineConfig::from_timezone_name("America/New_York").unwrap();
    let service = service_with_rules(config, vec![rule(0, "09:00", "10:00")]);
    let result = slots(&service, monday(), 30, &[]);
    assert_eq!(
        starts(&result),
        vec!["2026-03-16T09:00:00-04:00", "2026-03-16T09:15:00-04:00", "2026-03-16T09:30:00-04:00"]
    );
}

// ── DST ─────────────────────────────────────────────────────────────────────

/// 2026-03-08 is a Sunday; New York skips 02:00–03:00 that night.
fn spring_forward(policy: DstPolicy) -> Vec<Slot> {
    let config = EngineConfig::from_timezone_name("America/New_York")
        .unwrap()
        .with_dst_policy(policy);
    let service = service_with_rules(config, vec![rule(6, "01:00", "04:00")]);
    slots(&service, date("2026-03-08"), 60, &[])
}

#[test]
fn spring_forward_skips_starts_in_the_gap() {
    let result = spring_forward(DstPolicy::Skip);
    assert_eq!(
        starts(&result),
        vec![
            "2026-03-08T01:00:00-05:00",
            "2026-03-08T01:15:00-05:00",
            "2026-03-08T01:30:00-05:00",
            "2026-03-08T01:45:00-05:00",
            "2026-03-08T03:00:00-04:00",
        ]
    );
    for slot in &result {
        assert_eq!(slot.end - slot.start, Duration::minutes(60));
    }
}

#[test]
fn spring_forward_shift_policy_never_duplicates_a_start() {
    let result = spring_forward(DstPolicy::ShiftForward);
    let mut seen = starts(&result);
    let total = seen.len();
    seen.dedup();
    assert_eq!(seen.len(), total);
    assert_eq!(seen.last().map(String::as_str), Some("2026-03-08T03:00:00-04:00"));
    let close = utc("2026-03-08T08:00:00Z");
    assert!(result.iter().all(|s| s.end.with_timezone(&Utc) <= close));
}

#[test]
fn fall_back_offers_only_the_first_occurrence() {
    // 2026-11-01 is a Sunday; 01:00–02:00 happens twice in New York.
    let config = EngineConfig::from_timezone_name("America/New_York").unwrap();
    let service = service_with_rules(config, vec![rule(6, "01:00", "02:00")]);
    let result = slots(&service, date("2026-11-01"), 30, &[]);
    assert_eq!(
        starts(&result),
        vec![
            "2026-11-01T01:00:00-04:00",
            "2026-11-01T01:15:00-04:00",
            "2026-11-01T01:30:00-04:00",
        ]
    );
}

#[test]
fn booking_across_fall_back_hour_blocks_both_occurrences() {
    // 2026-10-25 is a Sunday; London repeats 01:00–02:00. The booking runs
    // from 01:00 BST to 01:00 GMT, i.e. the whole first occurrence.
    let config = EngineConfig::from_timezone_name("Europe/London").unwrap();
    let service = service_with_rules(config, vec![rule(6, "00:00", "04:00")]);
    let busy = [BusyInterval::confirmed(
        utc("2026-10-25T00:00:00Z"),
        utc("2026-10-25T01:00:00Z"),
    )];
    let result = slots(&service, date("2026-10-25"), 30, &busy);

    assert_eq!(
        starts(&result),
        vec![
            "2026-10-25T00:00:00+01:00",
            "2026-10-25T00:15:00+01:00",
            "2026-10-25T00:30:00+01:00",
            "2026-10-25T02:00:00+00:00",
            "2026-10-25T02:15:00+00:00",
            "2026-10-25T02:30:00+00:00",
            "2026-10-25T02:45:00+00:00",
            "2026-10-25T03:00:00+00:00",
            "2026-10-25T03:15:00+00:00",
            "2026-10-25T03:30:00+00:00",
        ]
    );
}

#[test]
fn slot_spanning_fall_back_keeps_clear_of_second_occurrence_booking() {
    // 01:15–01:30 GMT is the second pass through the repeated hour.
    let config = EngineConfig::from_timezone_name("Europe/London").unwrap();
    let service = service_with_rules(config, vec![rule(6, "00:00", "04:00")]);
    let booking = BusyInterval::confirmed(utc("2026-10-25T01:15:00Z"), utc("2026-10-25T01:30:00Z"));
    let result = slots(&service, date("2026-10-25"), 60, &[booking.clone()]);

    assert!(!result.is_empty());
    for slot in &result {
        let (start, end) = (slot.start.with_timezone(&Utc), slot.end.with_timezone(&Utc));
        assert!(end <= booking.start || start >= booking.end, "{slot:?}");
    }
}

// ── Custom rule stores ──────────────────────────────────────────────────────

/// A store with one fixed all-week pattern and nothing else.
struct FixedWeek {
    pattern: WorkingPattern,
}

impl FixedWeek {
    fn new(start: &str, end: &str) -> Self {
        Self {
            pattern: WorkingPattern {
                id: 1,
                staff_id: StaffId::new("s1"),
                name: "Every day".to_string(),
                timezone: "UTC".to_string(),
                active: true,
                effective_from: None,
                effective_to: None,
                created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
                rules: (0..7).map(|day| rule(day, start, end)).collect(),
            },
        }
    }
}

impl RuleStore for FixedWeek {
    fn is_known_staff(&self, staff_id: &StaffId) -> bool {
        staff_id.as_str() == "s1"
    }

    /// Hands out the pattern to anyone; registration gates resolution.
    fn patterns_for(&self, _: &StaffId) -> Vec<WorkingPattern> {
        vec![self.pattern.clone()]
    }

    fn override_on(&self, _: &StaffId, _: NaiveDate) -> Option<AvailabilityOverride> {
        None
    }

    fn approved_leave_between(
        &self,
        _: &StaffId,
        _: DateTime<Utc>,
        _: DateTime<Utc>,
    ) -> Vec<LeaveRequest> {
        Vec::new()
    }

    fn blocks_between(&self, _: &StaffId, _: DateTime<Utc>, _: DateTime<Utc>) -> Vec<BlockedTime> {
        Vec::new()
    }
}

#[test]
fn generator_works_over_any_rule_store() {
    let store = FixedWeek::new("08:00", "09:00");
    let generator = SlotGenerator::new(&store, EngineConfig::default());
    let result = generator.free_slots(&StaffId::new("s1"), date("2026-03-18"), 30, &[]);
    assert_eq!(result.len(), 3);
    assert!(generator
        .free_slots(&StaffId::new("s2"), date("2026-03-18"), 30, &[])
        .is_empty());
}

fn arb_busy() -> impl Strategy<Value = Vec<BusyInterval>> {
    let day_start = utc("2026-03-16T00:00:00Z");
    prop::collection::vec(
        (0i64..1440, 1i64..240, prop::bool::ANY).prop_map(move |(offset, length, pending)| {
            let start = day_start + Duration::minutes(offset);
            BusyInterval {
                start,
                end: start + Duration::minutes(length),
                status: if pending {
                    BookingStatus::Pending
                } else {
                    BookingStatus::Cancelled
                },
            }
        }),
        0..8,
    )
}

/// Bookings scattered around the London fall-back night of 2026-10-25.
fn arb_fall_back_busy() -> impl Strategy<Value = Vec<BusyInterval>> {
    let day_start = utc("2026-10-24T23:00:00Z");
    prop::collection::vec(
        (0i64..420, 1i64..120).prop_map(move |(offset, length)| {
            let start = day_start + Duration::minutes(offset);
            BusyInterval::confirmed(start, start + Duration::minutes(length))
        }),
        0..6,
    )
}

proptest! {
    #[test]
    fn fall_back_slots_never_overlap_bookings(
        busy in arb_fall_back_busy(),
        duration in prop_oneof![Just(15u32), Just(30), Just(60), Just(90)],
    ) {
        let store = FixedWeek::new("00:00", "06:00");
        let config = EngineConfig::from_timezone_name("Europe/London").unwrap();
        let generator = SlotGenerator::new(&store, config);
        let result = generator.free_slots(&StaffId::new("s1"), date("2026-10-25"), duration, &busy);

        for slot in &result {
            let (start, end) = (slot.start.with_timezone(&Utc), slot.end.with_timezone(&Utc));
            prop_assert_eq!(end - start, Duration::minutes(i64::from(duration)));
            for b in &busy {
                prop_assert!(end <= b.start || start >= b.end, "slot {:?} overlaps {:?}", slot, b);
            }
        }
        for pair in result.windows(2) {
            prop_assert!(pair[0].start < pair[1].start);
        }
    }

    #[test]
    fn slots_never_overlap_occupying_bookings(
        busy in arb_busy(),
        duration in prop_oneof![Just(15u32), Just(30), Just(45), Just(60), Just(90)],
    ) {
        let store = FixedWeek::new("08:00", "18:00");
        let generator = SlotGenerator::new(&store, EngineConfig::default());
        let result = generator.free_slots(&StaffId::new("s1"), date("2026-03-16"), duration, &busy);

        let open = utc("2026-03-16T08:00:00Z");
        let close = utc("2026-03-16T18:00:00Z");
        for slot in &result {
            let (start, end) = (slot.start.with_timezone(&Utc), slot.end.with_timezone(&Utc));
            prop_assert_eq!(end - start, Duration::minutes(i64::from(duration)));
            prop_assert!(start >= open && end <= close);
            prop_assert_eq!((start - open).num_minutes() % 15, 0);
            for b in busy.iter().filter(|b| b.status.is_occupying()) {
                prop_assert!(end <= b.start || start >= b.end, "slot {:?} overlaps {:?}", slot, b);
            }
        }
        for pair in result.windows(2) {
            prop_assert!(pair[0].start < pair[1].start);
        }
    }
}
