//! Integration tests for the `avail` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to run the resolve, slots and
//! check subcommands against the clinic fixture, covering file and stdin
//! input, output flags and error reporting.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};

/// Helper: path to the clinic.json fixture.
fn clinic_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/clinic.json")
}

fn clinic_json() -> String {
    std::fs::read_to_string(clinic_path()).expect("clinic.json fixture must exist")
}

fn avail() -> Command {
    Command::cargo_bin("avail").unwrap()
}

/// Helper: run `avail` with `args` and parse stdout as JSON.
fn run_json(args: &[&str]) -> Value {
    let output = avail().args(args).output().expect("avail should run");
    assert!(
        output.status.success(),
        "avail {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ─────────────────────────────────────────────────────────────────────────────
// resolve
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn resolve_applies_every_rule_layer() {
    let value = run_json(&[
        "resolve", "-s", clinic_path(), "--staff", "s1", "--date", "2026-03-16",
    ]);
    assert_eq!(
        value,
        json!({
            "staff_id": "s1",
            "date": "2026-03-16",
            "ranges": [
                { "start": "09:00", "end": "10:00" },
                { "start": "11:30", "end": "12:00" },
                { "start": "13:00", "end": "16:00" }
            ]
        })
    );
}

#[test]
fn resolve_reads_snapshot_from_stdin() {
    avail()
        .args(["resolve", "--staff", "s2", "--date", "2026-03-16"])
        .write_stdin(clinic_json())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""start": "11:30""#));
}

#[test]
fn resolve_unconfigured_day_is_empty() {
    let value = run_json(&[
        "resolve", "-s", clinic_path(), "--staff", "s1", "--date", "2026-03-15",
    ]);
    assert_eq!(value["ranges"], json!([]));
}

#[test]
fn resolve_unknown_staff_is_empty_not_an_error() {
    let value = run_json(&[
        "resolve", "-s", clinic_path(), "--staff", "nobody", "--date", "2026-03-16",
    ]);
    assert_eq!(value["ranges"], json!([]));
}

#[test]
fn timezone_flag_overrides_snapshot_config() {
    // In New York the UTC leave and block fall outside working hours.
    let value = run_json(&[
        "--timezone",
        "America/New_York",
        "resolve",
        "-s",
        clinic_path(),
        "--staff",
        "s1",
        "--date",
        "2026-03-16",
    ]);
    assert_eq!(
        value["ranges"],
        json!([
            { "start": "09:00", "end": "10:00" },
            { "start": "11:00", "end": "12:00" },
            { "start": "13:00", "end": "17:00" }
        ])
    );
}

#[test]
fn resolve_rejects_malformed_date() {
    avail()
        .args(["resolve", "-s", clinic_path(), "--staff", "s1", "--date", "16/03/2026"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --date"));
}

#[test]
fn unknown_timezone_fails() {
    avail()
        .args([
            "--timezone", "Mars/Base", "resolve", "-s", clinic_path(), "--staff", "s1", "--date",
            "2026-03-16",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --timezone"));
}

// ─────────────────────────────────────────────────────────────────────────────
// slots
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn slots_skip_confirmed_bookings_only() {
    let value = run_json(&[
        "slots", "-s", clinic_path(), "--staff", "s2", "--date", "2026-03-16", "--duration", "30",
    ]);
    let starts: Vec<&str> = value["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["start"].as_str().unwrap())
        .collect();
    assert_eq!(
        starts,
        vec![
            "2026-03-16T10:00:00+00:00",
            "2026-03-16T10:15:00+00:00",
            "2026-03-16T10:30:00+00:00",
            "2026-03-16T11:30:00+00:00",
        ]
    );
    assert_eq!(value["duration_minutes"], json!(30));
}

#[test]
fn slots_longer_than_any_gap_are_empty() {
    let value = run_json(&[
        "slots", "-s", clinic_path(), "--staff", "s2", "--date", "2026-03-16", "--duration",
        "120",
    ]);
    assert_eq!(value["slots"], json!([]));
}

#[test]
fn zero_duration_fails() {
    avail()
        .args([
            "slots", "-s", clinic_path(), "--staff", "s2", "--date", "2026-03-16", "--duration",
            "0",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("slot duration must be positive"));
}

#[test]
fn compact_output_is_single_line() {
    avail()
        .args([
            "--compact", "slots", "-s", clinic_path(), "--staff", "s2", "--date", "2026-03-16",
            "--duration", "60",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(r#"{"staff_id":"s2","date":"2026-03-16""#))
        .stdout(predicate::str::contains(r#""start":"2026-03-16T10:00:00+00:00""#));
}

#[test]
fn output_flag_writes_file() {
    let output_path = "/tmp/avail-test-slots-output.json";
    let _ = std::fs::remove_file(output_path);

    avail()
        .args([
            "slots", "-s", clinic_path(), "--staff", "s2", "--date", "2026-03-16", "--duration",
            "60", "-o", output_path,
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let content = std::fs::read_to_string(output_path).expect("output file must exist");
    let value: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["slots"].as_array().map(Vec::len), Some(1));

    let _ = std::fs::remove_file(output_path);
}

// ─────────────────────────────────────────────────────────────────────────────
// check
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn check_reports_record_counts() {
    let value = run_json(&["check", "-s", clinic_path()]);
    assert_eq!(value["ok"], json!(true));
    assert_eq!(value["business_timezone"], json!("Europe/London"));
    assert_eq!(
        value["counts"],
        json!({
            "staff": 2,
            "patterns": 2,
            "overrides": 1,
            "leave": 1,
            "blocks": 1,
            "shifts": 1,
            "timesheets": 1
        })
    );
    assert_eq!(value["bookings"], json!(2));
}

#[test]
fn check_names_first_failing_record() {
    let snapshot = r#"{
      "staff": [ { "id": "s1", "display_name": "A" } ],
      "patterns": [
        {
          "staff_id": "s1",
          "name": "Broken",
          "timezone": "UTC",
          "rules": [
            { "weekday": 0, "start": "09:00", "end": "12:00" },
            { "weekday": 0, "start": "11:00", "end": "13:00" }
          ]
        }
      ]
    }"#;
    avail()
        .arg("check")
        .write_stdin(snapshot)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load snapshot"))
        .stderr(predicate::str::contains("patterns[0]"));
}

#[test]
fn check_rejects_invalid_json() {
    avail()
        .arg("check")
        .write_stdin("this is not a snapshot {{{")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse snapshot"));
}

#[test]
fn missing_snapshot_file_fails() {
    avail()
        .args(["check", "-s", "/tmp/avail-test-does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn missing_subcommand_prints_usage() {
    avail()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
