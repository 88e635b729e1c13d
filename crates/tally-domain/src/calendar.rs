//! Calendar arithmetic used to advance recurrence schedules.
//!
//! Every function here is total: month-length overflow is clamped to the last
//! valid day of the target month, and dates beyond chrono's representable range
//! saturate at [`NaiveDate::MAX`].

use chrono::{Datelike, Days, NaiveDate};

use crate::Interval;

/// Gregorian leap-year rule.
pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Number of days in `month` (1-12) of `year`.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

/// Moves `date` forward by whole calendar months, keeping the day-of-month
/// where it exists and clamping to the month's last day where it does not.
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let index = i64::from(date.month0()) + i64::from(months);
    let year = i64::from(date.year()) + index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    let Ok(year) = i32::try_from(year) else {
        return NaiveDate::MAX;
    };
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MAX)
}

pub fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

pub fn day_after(date: NaiveDate) -> NaiveDate {
    add_days(date, 1)
}

/// Returns the next occurrence after `date` for the given cadence.
///
/// The result is strictly later than `date` except within one interval of
/// [`NaiveDate::MAX`], where it saturates and `advance(NaiveDate::MAX, _)`
/// returns `NaiveDate::MAX` itself.
pub fn advance(date: NaiveDate, interval: Interval) -> NaiveDate {
    match interval {
        Interval::Daily => add_days(date, 1),
        Interval::Weekly => add_days(date, 7),
        Interval::Biweekly => add_days(date, 14),
        Interval::Monthly => add_months(date, 1),
        Interval::Quarterly => add_months(date, 3),
        Interval::Yearly => add_months(date, 12),
    }
}

/// First and last day of a calendar month, or `None` when `month` is not 1-12.
pub fn month_range(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = NaiveDate::from_ymd_opt(year, month, days_in_month(year, month))?;
    Some((start, end))
}
