//! Civil date/time arithmetic for timestamp properties.
//!
//! The wire format carries one primitive for all time-like values: signed
//! microseconds since the Unix epoch, UTC. This module converts between
//! that representation and civil (year, month, day) / time-of-day parts,
//! and formats values as RFC 3339 for display.

use std::time::{SystemTime, UNIX_EPOCH};

pub const MICROS_PER_SECOND: i64 = 1_000_000;
pub const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SECOND;
pub const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;
pub const MICROS_PER_DAY: i64 = 24 * MICROS_PER_HOUR;

/// Returns true if the given year is a leap year.
pub fn is_leap_year(year: i32) -> bool {
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

/// Calculates days since the Unix epoch for a civil date.
///
/// Based on Howard Hinnant's days-from-civil algorithm.
pub fn civil_to_days(year: i32, month: u32, day: u32) -> i32 {
    let y = if month <= 2 { year - 1 } else { year } as i64;
    let m = if month <= 2 {
        month as i64 + 9
    } else {
        month as i64 - 3
    };

    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u32; // year of era
    let doy = (153 * m as u32 + 2) / 5 + day - 1; // day of year
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy; // day of era

    (era * 146097 + doe as i64 - 719468) as i32
}

/// Converts days since the Unix epoch to (year, month, day).
pub fn days_to_civil(days: i32) -> (i32, u32, u32) {
    let z = days as i64 + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u32; // day of era
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365; // year of era
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // day of year
    let mp = (5 * doy + 2) / 153; // month index
    let d = doy - (153 * mp + 2) / 5 + 1; // day
    let m = if mp < 10 { mp + 3 } else { mp - 9 }; // month

    let year = if m <= 2 { y + 1 } else { y } as i32;
    (year, m, d)
}

/// Splits epoch microseconds into whole days and the in-day remainder.
///
/// The remainder is always in `[0, MICROS_PER_DAY)`, also for timestamps
/// before the epoch.
pub fn split_epoch_micros(micros: i64) -> (i32, i64) {
    let days = micros.div_euclid(MICROS_PER_DAY);
    let rem = micros.rem_euclid(MICROS_PER_DAY);
    (days as i32, rem)
}

/// Current time as microseconds since the Unix epoch.
pub fn now_micros() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_micros() as i64,
        // Clock before 1970: express it as a negative offset.
        Err(e) => -(e.duration().as_micros() as i64),
    }
}

/// Formats microseconds since midnight as `HH:MM:SS[.ffffff]`.
pub fn format_time_of_day(micros: i64) -> String {
    let hours = micros / MICROS_PER_HOUR;
    let minutes = (micros % MICROS_PER_HOUR) / MICROS_PER_MINUTE;
    let seconds = (micros % MICROS_PER_MINUTE) / MICROS_PER_SECOND;
    let frac = micros % MICROS_PER_SECOND;

    if frac == 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        let digits = format!("{:06}", frac);
        format!(
            "{:02}:{:02}:{:02}.{}",
            hours,
            minutes,
            seconds,
            digits.trim_end_matches('0')
        )
    }
}

/// Formats epoch microseconds as an RFC 3339 UTC timestamp.
pub fn format_rfc3339(micros: i64) -> String {
    let (days, rem) = split_epoch_micros(micros);
    let (year, month, day) = days_to_civil(days);
    format!(
        "{:04}-{:02}-{:02}T{}Z",
        year,
        month,
        day,
        format_time_of_day(rem)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_civil_roundtrip() {
        let cases = [
            (1970, 1, 1),
            (1969, 12, 31),
            (2000, 2, 29),
            (2017, 8, 26),
            (1600, 3, 1),
            (2400, 12, 31),
        ];
        for (y, m, d) in cases {
            let days = civil_to_days(y, m, d);
            assert_eq!(days_to_civil(days), (y, m, d), "failed for {}-{}-{}", y, m, d);
        }
    }

    #[test]
    fn test_epoch_is_day_zero() {
        assert_eq!(civil_to_days(1970, 1, 1), 0);
        assert_eq!(civil_to_days(1970, 1, 2), 1);
        assert_eq!(civil_to_days(1969, 12, 31), -1);
    }

    #[test]
    fn test_split_negative_micros() {
        // One microsecond before the epoch is the last microsecond of
        // 1969-12-31.
        let (days, rem) = split_epoch_micros(-1);
        assert_eq!(days, -1);
        assert_eq!(rem, MICROS_PER_DAY - 1);
    }

    #[test]
    fn test_leap_years() {
        assert!(is_leap_year(2000));
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2023));
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
    }

    #[test]
    fn test_format_rfc3339() {
        // 2017-08-26T15:10:42.123456Z
        let days = civil_to_days(2017, 8, 26);
        let micros = days as i64 * MICROS_PER_DAY
            + 15 * MICROS_PER_HOUR
            + 10 * MICROS_PER_MINUTE
            + 42 * MICROS_PER_SECOND
            + 123_456;
        assert_eq!(format_rfc3339(micros), "2017-08-26T15:10:42.123456Z");
        assert_eq!(format_rfc3339(0), "1970-01-01T00:00:00Z");
    }
}
