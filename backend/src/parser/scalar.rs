//! Locale-aware scalar parsing for EDC exports.
//!
//! All three reshaping paths read the same exported number and date format:
//!
//! | Kind         | Example        | Result                         |
//! |--------------|----------------|--------------------------------|
//! | date         | `21.06.2025`   | `NaiveDate`                    |
//! | optional end | `31.12.9999`   | `None` (open-ended)            |
//! | fraction     | `12,5` / `0.4` | `Decimal`                      |
//! | time of day  | `00:15`        | `Duration` since midnight      |

use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{FormatError, FormatResult};

/// End date used by the exports to mean "no end".
pub const OPEN_END_SENTINEL: &str = "31.12.9999";

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})\.(\d{2})\.(\d{4})$").expect("valid date regex"));

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?$").expect("valid time regex")
});

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-]?)(\d*)(?:\.(\d+))?$").expect("valid number regex")
});

/// Parse a `dd.MM.yyyy` date.
pub fn parse_date(text: &str) -> FormatResult<NaiveDate> {
    let trimmed = text.trim();
    let caps = DATE_RE
        .captures(trimmed)
        .ok_or_else(|| FormatError::new(text, "date dd.MM.yyyy"))?;

    let day: u32 = caps[1].parse().map_err(|_| FormatError::new(text, "date dd.MM.yyyy"))?;
    let month: u32 = caps[2].parse().map_err(|_| FormatError::new(text, "date dd.MM.yyyy"))?;
    let year: i32 = caps[3].parse().map_err(|_| FormatError::new(text, "date dd.MM.yyyy"))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| FormatError::new(text, "existing calendar date"))
}

/// Parse an end date, mapping [`OPEN_END_SENTINEL`] to `None`.
pub fn parse_optional_date(text: &str) -> FormatResult<Option<NaiveDate>> {
    if text.trim() == OPEN_END_SENTINEL {
        return Ok(None);
    }
    parse_date(text).map(Some)
}

/// Parse a decimal number written with either `,` or `.` as separator.
///
/// Spaces and no-break spaces (thousands grouping in Czech locale) are ignored.
/// Blank input is an error; callers that treat blank as "absent" check first.
pub fn parse_fraction(text: &str) -> FormatResult<Decimal> {
    let normalized: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    let err = || FormatError::new(text, "decimal number");

    let caps = NUMBER_RE.captures(&normalized).ok_or_else(err)?;
    let sign = if &caps[1] == "-" { "-" } else { "" };
    let int_part = &caps[2];
    let frac_part = caps.get(3).map(|m| m.as_str());

    let canonical = match (int_part.is_empty(), frac_part) {
        (true, None) => return Err(err()),
        (true, Some(frac)) => format!("{}0.{}", sign, frac),
        (false, Some(frac)) => format!("{}{}.{}", sign, int_part, frac),
        (false, None) => format!("{}{}", sign, int_part),
    };

    Decimal::from_str(&canonical).map_err(|_| err())
}

/// Parse an `HH:MM[:SS]` offset from midnight.
///
/// `24:00` is accepted as the end of the day, which is how the last quarter
/// hour of a day is closed in the transfer exports.
pub fn parse_time_of_day(text: &str) -> FormatResult<Duration> {
    let err = || FormatError::new(text, "time of day HH:MM[:SS]");

    let trimmed = text.trim();
    let caps = TIME_RE.captures(trimmed).ok_or_else(err)?;

    let hours: i64 = caps[1].parse().map_err(|_| err())?;
    let minutes: i64 = caps[2].parse().map_err(|_| err())?;
    let seconds: i64 = match caps.get(3) {
        Some(s) => s.as_str().parse().map_err(|_| err())?,
        None => 0,
    };

    if minutes > 59 || seconds > 59 {
        return Err(err());
    }
    if hours > 24 || (hours == 24 && (minutes > 0 || seconds > 0)) {
        return Err(err());
    }

    Ok(Duration::seconds(hours * 3600 + minutes * 60 + seconds))
}
