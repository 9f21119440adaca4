//! Civil calendar conversions and ISO 8601 parsing/formatting.
//!
//! Converts between ISO 8601 strings and the stored representations:
//! - Date: days since Unix epoch (1970-01-01)
//! - Time: milliseconds since midnight
//! - DateTime: milliseconds since Unix epoch, UTC

pub(crate) const MILLIS_PER_SECOND: i64 = 1_000;
pub(crate) const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
pub(crate) const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
pub(crate) const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// Error type for ISO 8601 parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeParseError {
    pub message: String,
}

impl std::fmt::Display for DateTimeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DateTimeParseError {}

fn parse_error(kind: &str, input: &str) -> DateTimeParseError {
    DateTimeParseError {
        message: format!("Invalid {}: {}", kind, input),
    }
}

/// Returns true if the given year is a leap year.
fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Returns the number of days in a given month (1-indexed).
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Calculates days since Unix epoch for a civil date (Howard Hinnant's algorithm).
pub fn date_to_days(year: i32, month: u32, day: u32) -> i32 {
    let y = if month <= 2 { year - 1 } else { year } as i64;
    let m = if month <= 2 {
        month as i64 + 9
    } else {
        month as i64 - 3
    };

    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u32;
    let doy = (153 * m as u32 + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;

    (era * 146097 + doe as i64 - 719468) as i32
}

/// Converts days since Unix epoch to (year, month, day).
pub fn days_to_date(days: i32) -> (i32, u32, u32) {
    let z = days as i64 + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };

    let year = if m <= 2 { y + 1 } else { y } as i32;
    (year, m, d)
}

/// Milliseconds since midnight for a wall clock time.
pub fn time_to_millis(hour: u32, minute: u32, second: u32, milli: u32) -> u32 {
    ((hour as i64 * MILLIS_PER_HOUR
        + minute as i64 * MILLIS_PER_MINUTE
        + second as i64 * MILLIS_PER_SECOND)
        + milli as i64) as u32
}

/// Splits milliseconds since midnight into (hour, minute, second, milli).
pub fn millis_to_time(millis: u32) -> (u32, u32, u32, u32) {
    let millis = millis as i64;
    (
        (millis / MILLIS_PER_HOUR) as u32,
        ((millis % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE) as u32,
        ((millis % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND) as u32,
        (millis % MILLIS_PER_SECOND) as u32,
    )
}

fn parse_number<T: std::str::FromStr>(s: &str, kind: &str, input: &str) -> Result<T, DateTimeParseError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(parse_error(kind, input));
    }
    s.parse().map_err(|_| parse_error(kind, input))
}

// =====================
// DATE
// =====================

/// Parses `YYYY-MM-DD` and returns days since Unix epoch.
pub fn parse_date(date_str: &str) -> Result<i32, DateTimeParseError> {
    let bytes = date_str.as_bytes();
    if !date_str.is_ascii() || bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(parse_error("date", date_str));
    }

    let year: i32 = parse_number(&date_str[..4], "year in date", date_str)?;
    let month: u32 = parse_number(&date_str[5..7], "month in date", date_str)?;
    let day: u32 = parse_number(&date_str[8..10], "day in date", date_str)?;

    if !(1..=12).contains(&month) {
        return Err(parse_error("month in date", date_str));
    }
    if day < 1 || day > days_in_month(year, month) {
        return Err(parse_error("day in date", date_str));
    }

    Ok(date_to_days(year, month, day))
}

/// Formats days since Unix epoch as `YYYY-MM-DD`.
pub fn format_date(days: i32) -> String {
    let (year, month, day) = days_to_date(days);
    format!("{:04}-{:02}-{:02}", year, month, day)
}

// =====================
// TIME
// =====================

/// Parses `HH:MM:SS[.mmm]` and returns milliseconds since midnight.
pub fn parse_time(time_str: &str) -> Result<u32, DateTimeParseError> {
    let bytes = time_str.as_bytes();
    if !time_str.is_ascii() || bytes.len() < 8 || bytes[2] != b':' || bytes[5] != b':' {
        return Err(parse_error("time", time_str));
    }

    let hour: u32 = parse_number(&time_str[..2], "hour in time", time_str)?;
    let minute: u32 = parse_number(&time_str[3..5], "minute in time", time_str)?;
    let second: u32 = parse_number(&time_str[6..8], "second in time", time_str)?;
    if hour > 23 || minute > 59 || second > 59 {
        return Err(parse_error("time", time_str));
    }

    let milli = match &time_str[8..] {
        "" => 0,
        frac if frac.starts_with('.') && frac.len() <= 4 && frac.len() > 1 => {
            let digits = &frac[1..];
            let value: u32 = parse_number(digits, "fraction in time", time_str)?;
            value * 10u32.pow(3 - digits.len() as u32)
        }
        _ => return Err(parse_error("time", time_str)),
    };

    Ok(time_to_millis(hour, minute, second, milli))
}

/// Formats milliseconds since midnight as `HH:MM:SS[.mmm]`.
pub fn format_time(millis: u32) -> String {
    let (hour, minute, second, milli) = millis_to_time(millis);
    if milli == 0 {
        format!("{:02}:{:02}:{:02}", hour, minute, second)
    } else {
        format!("{:02}:{:02}:{:02}.{:03}", hour, minute, second, milli)
    }
}

// =====================
// DATETIME
// =====================

/// Parses `YYYY-MM-DDTHH:MM:SS[.mmm][Z]` (UTC) and returns epoch milliseconds.
pub fn parse_datetime(datetime_str: &str) -> Result<i64, DateTimeParseError> {
    let trimmed = datetime_str.strip_suffix('Z').unwrap_or(datetime_str);
    if !trimmed.is_ascii() || trimmed.len() < 19 || trimmed.as_bytes()[10] != b'T' {
        return Err(parse_error("datetime", datetime_str));
    }
    let days = parse_date(&trimmed[..10])?;
    let millis = parse_time(&trimmed[11..])?;
    Ok(days as i64 * MILLIS_PER_DAY + millis as i64)
}

/// Formats epoch milliseconds as `YYYY-MM-DDTHH:MM:SS[.mmm]Z`.
pub fn format_datetime(epoch_millis: i64) -> String {
    let days = epoch_millis.div_euclid(MILLIS_PER_DAY) as i32;
    let millis = epoch_millis.rem_euclid(MILLIS_PER_DAY) as u32;
    format!("{}T{}Z", format_date(days), format_time(millis))
}
