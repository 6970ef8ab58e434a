//! Tests for local day windows, clipping and DST edge handling.

use availability_engine::day::Clipped;
use availability_engine::{DayWindow, DstPolicy, TimeOfDay, TimeRange};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

fn t(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn window(d: &str, tz: Tz) -> DayWindow {
    DayWindow::new(d.parse::<NaiveDate>().unwrap(), tz)
}

// ── Window length ───────────────────────────────────────────────────────────

#[test]
fn ordinary_day_is_24_hours() {
    let day = window("2026-03-16", Tz::America__New_York);
    assert_eq!(day.length_minutes(), 1440);
    assert_eq!(day.start(), utc("2026-03-16T04:00:00Z"));
    assert_eq!(day.end(), utc("2026-03-17T04:00:00Z"));
}

#[test]
fn spring_forward_day_is_23_hours() {
    assert_eq!(window("2026-03-08", Tz::America__New_York).length_minutes(), 1380);
    assert_eq!(window("2026-03-29", Tz::Europe__London).length_minutes(), 1380);
}

#[test]
fn fall_back_day_is_25_hours() {
    assert_eq!(window("2026-11-01", Tz::America__New_York).length_minutes(), 1500);
    assert_eq!(window("2026-10-25", Tz::Europe__London).length_minutes(), 1500);
}

#[test]
fn utc_day_starts_at_midnight() {
    let day = window("2026-03-16", Tz::UTC);
    assert_eq!(day.start(), utc("2026-03-16T00:00:00Z"));
    assert_eq!(day.timezone(), Tz::UTC);
}

// ── Clipping ────────────────────────────────────────────────────────────────

#[test]
fn clip_inside_day_keeps_local_times() {
    let day = window("2026-07-13", Tz::Europe__London);
    let clipped = day.clip(utc("2026-07-13T08:00:00Z"), utc("2026-07-13T10:30:00Z"));
    assert_eq!(clipped, Some(TimeRange::new(t("09:00"), t("11:30"))));
}

#[test]
fn clip_extends_to_midnight_and_end_of_day() {
    let day = window("2026-03-16", Tz::UTC);
    assert_eq!(
        day.clip(utc("2026-03-15T20:00:00Z"), utc("2026-03-16T06:00:00Z")),
        Some(TimeRange::new(TimeOfDay::MIDNIGHT, t("06:00")))
    );
    assert_eq!(
        day.clip(utc("2026-03-16T18:00:00Z"), utc("2026-03-18T00:00:00Z")),
        Some(TimeRange::new(t("18:00"), TimeOfDay::END_OF_DAY))
    );
}

#[test]
fn clip_misses_other_days() {
    let day = window("2026-03-16", Tz::UTC);
    assert_eq!(day.clip(utc("2026-03-15T10:00:00Z"), utc("2026-03-16T00:00:00Z")), None);
    assert_eq!(day.clip(utc("2026-03-17T00:00:00Z"), utc("2026-03-17T01:00:00Z")), None);
}

#[test]
fn clip_all_short_circuits_on_whole_day() {
    let day = window("2026-03-16", Tz::UTC);
    let intervals = vec![
        (utc("2026-03-16T09:00:00Z"), utc("2026-03-16T10:00:00Z")),
        (utc("2026-03-16T00:00:00Z"), utc("2026-03-17T00:00:00Z")),
    ];
    assert_eq!(day.clip_all(intervals), Clipped::WholeDay);
}

#[test]
fn clip_all_collects_partial_ranges() {
    let day = window("2026-03-16", Tz::UTC);
    let intervals = vec![
        (utc("2026-03-16T09:00:00Z"), utc("2026-03-16T10:00:00Z")),
        (utc("2026-03-20T09:00:00Z"), utc("2026-03-20T10:00:00Z")),
        (utc("2026-03-16T13:00:00Z"), utc("2026-03-16T14:00:00Z")),
    ];
    assert_eq!(
        day.clip_all(intervals),
        Clipped::Partial(vec![
            TimeRange::new(t("09:00"), t("10:00")),
            TimeRange::new(t("13:00"), t("14:00")),
        ])
    );
}

#[test]
fn clip_across_fall_back_covers_the_repeated_hour() {
    // London repeats 01:00–02:00 on 2026-10-25; the switch is at 01:00Z.
    let day = window("2026-10-25", Tz::Europe__London);
    let repeated = TimeRange::new(t("01:00"), t("02:00"));

    // 01:00 BST to 01:00 GMT would otherwise collapse to an empty range.
    assert_eq!(day.clip(utc("2026-10-25T00:00:00Z"), utc("2026-10-25T01:00:00Z")), Some(repeated));
    // 01:45 BST to 01:15 GMT would otherwise come out inverted.
    assert_eq!(day.clip(utc("2026-10-25T00:45:00Z"), utc("2026-10-25T01:15:00Z")), Some(repeated));
    assert_eq!(
        day.clip(utc("2026-10-25T00:30:00Z"), utc("2026-10-26T10:00:00Z")),
        Some(TimeRange::new(t("01:00"), TimeOfDay::END_OF_DAY))
    );
}

#[test]
fn clip_within_one_occurrence_is_unchanged() {
    let day = window("2026-10-25", Tz::Europe__London);
    assert_eq!(
        day.clip(utc("2026-10-25T01:15:00Z"), utc("2026-10-25T01:30:00Z")),
        Some(TimeRange::new(t("01:15"), t("01:30")))
    );
    assert_eq!(
        day.clip(utc("2026-10-24T23:30:00Z"), utc("2026-10-25T00:15:00Z")),
        Some(TimeRange::new(t("00:30"), t("01:15")))
    );
}

// ── Wall-clock to instant ───────────────────────────────────────────────────

#[test]
fn instant_in_gap_depends_on_policy() {
    let day = window("2026-03-08", Tz::America__New_York);
    assert_eq!(day.instant_at(t("02:30"), DstPolicy::Skip), None);

    let shifted = day.instant_at(t("02:30"), DstPolicy::ShiftForward).unwrap();
    assert_eq!(shifted.with_timezone(&Utc), utc("2026-03-08T07:00:00Z"));
    assert_eq!(shifted.to_rfc3339(), "2026-03-08T03:00:00-04:00");
}

#[test]
fn ambiguous_instant_resolves_to_earliest() {
    let day = window("2026-11-01", Tz::America__New_York);
    let instant = day.instant_at(t("01:30"), DstPolicy::Skip).unwrap();
    assert_eq!(instant.with_timezone(&Utc), utc("2026-11-01T05:30:00Z"));
}

#[test]
fn end_of_day_maps_to_window_end() {
    let day = window("2026-03-08", Tz::America__New_York);
    let end = day.instant_at(TimeOfDay::END_OF_DAY, DstPolicy::Skip).unwrap();
    assert_eq!(end.with_timezone(&Utc), day.end());
}

#[test]
fn overlap_is_half_open() {
    let day = window("2026-03-16", Tz::UTC);
    assert!(!day.overlaps(utc("2026-03-15T00:00:00Z"), utc("2026-03-16T00:00:00Z")));
    assert!(day.overlaps(utc("2026-03-15T00:00:00Z"), utc("2026-03-16T00:00:01Z")));
    assert!(day.is_covered_by(day.start(), day.end()));
}
