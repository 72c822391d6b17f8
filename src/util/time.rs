//! Time parsing and formatting.

use crate::error::{Result, SplitError};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};

/// Display format for split timestamps.
pub const SPLIT_TIME_FORMAT: &str = "%Y/%m/%d - %H:%M:%S";

/// Render a split timestamp in local time.
#[must_use]
pub fn format_split_time(at: DateTime<Utc>) -> String {
    format_split_time_in(at, &Local)
}

/// Render a split timestamp in the given zone.
#[must_use]
pub fn format_split_time_in<Tz>(at: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.with_timezone(tz).format(SPLIT_TIME_FORMAT).to_string()
}

/// Parse a milestone due date.
///
/// Supports:
/// - RFC3339: `2025-01-15T12:00:00Z`
/// - Simple date: `2025-01-15` (midnight local time)
/// - Relative offset from now: `+3d`, `+2w`
///
/// # Errors
///
/// Returns a validation error on `field_name` if the value matches none of
/// these forms or the local time is ambiguous.
pub fn parse_due_date(s: &str, field_name: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let naive_dt = date.and_time(NaiveTime::MIN);
        let local_dt = Local
            .from_local_datetime(&naive_dt)
            .earliest()
            .ok_or_else(|| SplitError::validation(field_name, "ambiguous local time"))?;
        return Ok(local_dt.with_timezone(&Utc));
    }

    if let Some(rest) = s.strip_prefix('+') {
        if let Some(unit_char) = rest.chars().last() {
            let amount_str = &rest[..rest.len() - unit_char.len_utf8()];
            if let Ok(amount) = amount_str.parse::<i64>() {
                let duration = match unit_char {
                    'd' => Duration::days(amount),
                    'w' => Duration::weeks(amount),
                    _ => {
                        return Err(SplitError::validation(
                            field_name,
                            "invalid unit (use d, w)",
                        ));
                    }
                };
                return Ok(Utc::now() + duration);
            }
        }
    }

    Err(SplitError::validation(
        field_name,
        format!("unrecognized date '{s}' (use YYYY-MM-DD, RFC3339 or +Nd)"),
    ))
}
