//! Event matching: does an occasion fall on today?

use chrono::{Datelike, NaiveDate};

/// True if the occasion's (month, day) matches today. The stored year is
/// ignored; it may be a placeholder when the source data had no year.
///
/// Feb-29 occasions fire on Feb-28 in non-leap years, so they are greeted
/// exactly once every year.
pub fn occurs_on(occasion_date: NaiveDate, today: NaiveDate) -> bool {
    if occasion_date.month() == today.month() && occasion_date.day() == today.day() {
        return true;
    }
    occasion_date.month() == 2
        && occasion_date.day() == 29
        && today.month() == 2
        && today.day() == 28
        && !is_leap_year(today.year())
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_year_is_ignored() {
        assert!(occurs_on(d(1985, 3, 15), d(2024, 3, 15)));
        assert!(occurs_on(d(2024, 3, 15), d(1985, 3, 15)));
        assert!(occurs_on(d(1900, 3, 15), d(2024, 3, 15)));
    }

    #[test]
    fn test_month_or_day_mismatch() {
        assert!(!occurs_on(d(1985, 3, 15), d(2024, 4, 15)));
        assert!(!occurs_on(d(1985, 3, 15), d(2024, 3, 16)));
    }

    #[test]
    fn test_feb29_fires_on_feb29_in_leap_years() {
        assert!(occurs_on(d(2000, 2, 29), d(2024, 2, 29)));
        assert!(!occurs_on(d(2000, 2, 29), d(2024, 2, 28)));
    }

    #[test]
    fn test_feb29_fires_on_feb28_in_non_leap_years() {
        assert!(occurs_on(d(2000, 2, 29), d(2023, 2, 28)));
        assert!(!occurs_on(d(2000, 2, 29), d(2023, 3, 1)));
    }

    #[test]
    fn test_feb28_occasions_unaffected_by_policy() {
        assert!(occurs_on(d(1990, 2, 28), d(2023, 2, 28)));
        assert!(occurs_on(d(1990, 2, 28), d(2024, 2, 28)));
        assert!(!occurs_on(d(1990, 2, 28), d(2024, 2, 29)));
    }
}
