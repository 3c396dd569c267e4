//! Trip date and time parsing.
//!
//! Trip records carry dates as `MM/DD/YYYY` (or `MM/DD/YY`) strings and times
//! as free-form 12-hour or 24-hour strings. This module turns such a pair into
//! a local-calendar `NaiveDateTime`. No timezone conversion is performed.
//!
//! Parsing never fails. An unrecognised date falls back to one month after
//! `now` at noon, and an unrecognised time falls back to noon on the parsed
//! date, so downstream arithmetic always has a well-defined instant.

use chrono::{Months, NaiveDate, NaiveDateTime, NaiveTime};

/// Hour used when a time string cannot be understood.
const DEFAULT_HOUR: u32 = 12;

/// Two-digit years are mapped into this century.
const TWO_DIGIT_YEAR_BASE: i32 = 2000;

/// Noon, the time of day used for every fallback.
pub fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(DEFAULT_HOUR, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// The instant substituted for an unparseable date: one calendar month after
/// `now`, at noon.
///
/// Days past the end of the target month clamp to its last day
/// (January 31st becomes February 28th or 29th).
pub fn fallback_instant(now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date();
    today
        .checked_add_months(Months::new(1))
        .unwrap_or(today)
        .and_time(noon())
}

/// Parse a `(date, time)` pair from a trip record into an instant.
///
/// `now` is only consulted when the date is unrecognised, which keeps the
/// function pure: the same inputs always give the same instant.
///
/// # Examples
///
/// ```
/// use trip_server::domain::parse_trip_instant;
/// use chrono::NaiveDate;
///
/// let now = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
///
/// let at = parse_trip_instant("03/15/2026", "2:30 PM", now);
/// assert_eq!(at.to_string(), "2026-03-15 14:30:00");
///
/// // Unknown time: noon on the parsed date
/// let at = parse_trip_instant("03/15/26", "soon", now);
/// assert_eq!(at.to_string(), "2026-03-15 12:00:00");
///
/// // Unknown date: a month from now at noon
/// let at = parse_trip_instant("next tuesday", "14:30", now);
/// assert_eq!(at.to_string(), "2026-04-01 12:00:00");
/// ```
pub fn parse_trip_instant(date: &str, time: &str, now: NaiveDateTime) -> NaiveDateTime {
    match parse_trip_date(date) {
        Some(day) => day.and_time(parse_clock_time(time).unwrap_or_else(noon)),
        None => fallback_instant(now),
    }
}

/// Parse a `MM/DD/YYYY` or `MM/DD/YY` date.
///
/// Month and day may have one or two digits. A one- or two-digit year is
/// read as `2000 + YY`; there is no windowing into the 1900s. Returns `None`
/// for anything else, including impossible calendar dates such as `02/30`.
///
/// # Examples
///
/// ```
/// use trip_server::domain::parse_trip_date;
/// use chrono::NaiveDate;
///
/// assert_eq!(parse_trip_date("03/15/2026"), NaiveDate::from_ymd_opt(2026, 3, 15));
/// assert_eq!(parse_trip_date("3/5/99"), NaiveDate::from_ymd_opt(2099, 3, 5));
/// assert_eq!(parse_trip_date("13/45/99"), None);
/// assert_eq!(parse_trip_date("2026-03-15"), None);
/// ```
pub fn parse_trip_date(s: &str) -> Option<NaiveDate> {
    let mut parts = s.trim().split('/');
    let (month, day, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let month = parse_digits(month, 1, 2)?;
    let day = parse_digits(day, 1, 2)?;
    let year = match year.len() {
        1 | 2 => TWO_DIGIT_YEAR_BASE + parse_digits(year, 1, 2)? as i32,
        4 => parse_digits(year, 4, 4)? as i32,
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a clock time written in 12-hour or 24-hour form.
///
/// Tries `H:MM AM|PM` first (case-insensitive, whitespace before the
/// meridiem optional, hour 1-12), then a bare `H:MM`/`HH:MM` with hour 0-23.
/// 12 AM is midnight and 12 PM is noon.
///
/// # Examples
///
/// ```
/// use trip_server::domain::parse_clock_time;
/// use chrono::NaiveTime;
///
/// assert_eq!(parse_clock_time("12:05 am"), NaiveTime::from_hms_opt(0, 5, 0));
/// assert_eq!(parse_clock_time("7:45PM"), NaiveTime::from_hms_opt(19, 45, 0));
/// assert_eq!(parse_clock_time("23:10"), NaiveTime::from_hms_opt(23, 10, 0));
/// assert_eq!(parse_clock_time("25:00"), None);
/// ```
pub fn parse_clock_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    parse_twelve_hour(s).or_else(|| parse_twenty_four_hour(s))
}

fn parse_twelve_hour(s: &str) -> Option<NaiveTime> {
    let upper = s.to_ascii_uppercase();
    let (clock, pm) = if let Some(rest) = upper.strip_suffix("PM") {
        (rest, true)
    } else if let Some(rest) = upper.strip_suffix("AM") {
        (rest, false)
    } else {
        return None;
    };

    let (hour, minute) = split_clock(clock.trim_end())?;
    if !(1..=12).contains(&hour) {
        return None;
    }

    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn parse_twenty_four_hour(s: &str) -> Option<NaiveTime> {
    let (hour, minute) = split_clock(s)?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Split `H:MM` or `HH:MM` into hour and minute, rejecting minutes over 59.
fn split_clock(s: &str) -> Option<(u32, u32)> {
    let (hour, minute) = s.split_once(':')?;
    let hour = parse_digits(hour, 1, 2)?;
    let minute = parse_digits(minute, 2, 2)?;
    (minute <= 59).then_some((hour, minute))
}

/// Parse an all-ASCII-digit string whose length lies in `min..=max`.
fn parse_digits(s: &str, min: usize, max: usize) -> Option<u32> {
    if s.len() < min || s.len() > max || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
