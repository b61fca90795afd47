//! Month-end date grid and month arithmetic shared by every projection table
//!
//! All tables are keyed by month. Month ends follow a fixed convention:
//! February on the 28th, April/June/September/November on the 30th, all
//! other months on the 31st. There is no leap-year correction.

use chrono::{Datelike, NaiveDate};

/// Number of months covered by a projection grid
pub const GRID_MONTHS: usize = 60;

/// A (year, month) key used to address rate paths
pub type MonthKey = (i32, u32);

/// Convention day of the last day of `month`
pub fn month_end_day(month: u32) -> u32 {
    match month {
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Convention month-end date for `year`/`month`
///
/// # Panics
/// Panics if `month` is not in `1..=12` or the year is outside chrono's range.
pub fn month_end(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, month_end_day(month))
        .unwrap_or_else(|| panic!("month {month} of {year} has no convention month end"))
}

/// Key of the month containing `date`
pub fn month_key(date: NaiveDate) -> MonthKey {
    (date.year(), date.month())
}

/// Shift a month key by `n` months (negative moves backwards)
pub fn shift_month(key: MonthKey, n: i32) -> MonthKey {
    let index = key.0 * 12 + key.1 as i32 - 1 + n;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// Number of whole months from `from` to `to` (negative if `to` is earlier)
pub fn months_between(from: MonthKey, to: MonthKey) -> i32 {
    (to.0 - from.0) * 12 + to.1 as i32 - from.1 as i32
}

/// Move `date` by `n` months, clamping the day to the convention month end
pub fn add_months(date: NaiveDate, n: i32) -> NaiveDate {
    let (year, month) = shift_month(month_key(date), n);
    let day = date.day().min(month_end_day(month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| month_end(year, month))
}

/// Month-end grid of [`GRID_MONTHS`] dates starting in January of `start_year`
///
/// Callers filter to "from the valuation date forward" themselves.
pub fn month_end_grid(start_year: i32) -> Vec<NaiveDate> {
    (0..GRID_MONTHS as i32)
        .map(|offset| {
            let (year, month) = shift_month((start_year, 1), offset);
            month_end(year, month)
        })
        .collect()
}

/// Month-end grid dates on or after `valuation_date`, starting in its year
pub fn month_ends_from(valuation_date: NaiveDate) -> Vec<NaiveDate> {
    month_end_grid(valuation_date.year())
        .into_iter()
        .filter(|d| *d >= valuation_date)
        .collect()
}
