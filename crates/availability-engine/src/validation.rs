//! Input checks run by the mutation API before anything is committed.

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::parse_timezone;
use crate::error::ValidationError;
use crate::model::{OverrideMode, OverridePeriod, WorkingPatternRule};
use crate::time_of_day::TimeOfDay;

type Result<T> = std::result::Result<T, ValidationError>;

pub fn require_name(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyName(field));
    }
    Ok(())
}

pub fn require_timezone(name: &str) -> Result<()> {
    parse_timezone(name).map(|_| ())
}

pub fn require_range(field: &'static str, start: TimeOfDay, end: TimeOfDay) -> Result<()> {
    if end <= start {
        return Err(ValidationError::empty_range(field, start, end));
    }
    Ok(())
}

pub fn require_instants(
    field: &'static str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<()> {
    if end <= start {
        return Err(ValidationError::EmptyRange {
            field,
            start: start.to_rfc3339(),
            end: end.to_rfc3339(),
        });
    }
    Ok(())
}

pub fn require_effective_window(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<()> {
    if let (Some(from), Some(to)) = (from, to) {
        if to < from {
            return Err(ValidationError::EffectiveWindowInverted { from, to });
        }
    }
    Ok(())
}

/// Weekday in range, `end > start`, and no overlap between rules sharing a
/// weekday. Touching rules (`09:00–12:00`, `12:00–17:00`) are fine.
pub fn require_rules(rules: &[WorkingPatternRule]) -> Result<()> {
    for rule in rules {
        if rule.weekday > 6 {
            return Err(ValidationError::InvalidWeekday(rule.weekday));
        }
        require_range("rule", rule.start, rule.end)?;
    }

    let mut sorted: Vec<&WorkingPatternRule> = rules.iter().collect();
    sorted.sort_by_key(|r| (r.weekday, r.start, r.end));
    for pair in sorted.windows(2) {
        let (first, second) = (pair[0], pair[1]);
        if first.weekday == second.weekday && first.range().overlaps(&second.range()) {
            return Err(ValidationError::OverlappingRules {
                weekday: first.weekday,
                first: format!("{}-{}", first.start, first.end),
                second: format!("{}-{}", second.start, second.end),
            });
        }
    }
    Ok(())
}

/// `CLOSED` owns no periods; every other mode needs at least one.
pub fn require_periods(mode: OverrideMode, periods: &[OverridePeriod]) -> Result<()> {
    match mode {
        OverrideMode::Closed if !periods.is_empty() => {
            return Err(ValidationError::ClosedOverrideWithPeriods(periods.len()));
        }
        OverrideMode::Closed => {}
        _ if periods.is_empty() => {
            return Err(ValidationError::MissingPeriods(mode));
        }
        _ => {}
    }
    for period in periods {
        require_range("period", period.start, period.end)?;
    }
    Ok(())
}

/// A closed entry must end after it starts, with the break inside the span.
pub fn require_timesheet(
    clock_in: DateTime<Utc>,
    clock_out: Option<DateTime<Utc>>,
    break_minutes: u32,
) -> Result<()> {
    let Some(clock_out) = clock_out else {
        return Ok(());
    };
    require_instants("timesheet", clock_in, clock_out)?;
    let worked_minutes = (clock_out - clock_in).num_minutes();
    if i64::from(break_minutes) >= worked_minutes {
        return Err(ValidationError::InvalidBreak {
            break_minutes,
            worked_minutes,
        });
    }
    Ok(())
}

pub fn require_duration(minutes: u32) -> Result<()> {
    if minutes == 0 {
        return Err(ValidationError::InvalidDuration(minutes));
    }
    Ok(())
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::MalformedDate(s.to_string()))
}
