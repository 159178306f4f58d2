//! Business-day calendar arithmetic
//!
//! Weekends are Saturday and Sunday, fixed. All scheduling math advances one
//! calendar day at a time; only non-weekend days count toward a duration.

use chrono::{Datelike, NaiveDate, Weekday};

/// Returns true if the date is not a Saturday or Sunday
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Advances to the next calendar day, saturating at the calendar boundary
fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

/// Returns `date` if it is a business day, otherwise the next one that is
pub fn next_business_day(mut date: NaiveDate) -> NaiveDate {
    while !is_business_day(date) {
        date = next_day(date);
    }
    date
}

/// Adds `n` business days to `start`
///
/// Advances one calendar day at a time; each advance landing on a non-weekend
/// day decrements the counter. `n = 0` returns `start` unchanged, so callers
/// passing `duration - 1` get a 1-day task ending on its own start date.
pub fn add_business_days(start: NaiveDate, n: u32) -> NaiveDate {
    let mut date = start;
    let mut remaining = n;

    while remaining > 0 {
        date = next_day(date);
        if is_business_day(date) {
            remaining -= 1;
        }
    }

    date
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn weekends_are_not_business_days() {
        assert!(is_business_day(date("2024-01-01"))); // Monday
        assert!(is_business_day(date("2024-01-05"))); // Friday
        assert!(!is_business_day(date("2024-01-06"))); // Saturday
        assert!(!is_business_day(date("2024-01-07"))); // Sunday
    }

    #[test]
    fn next_business_day_is_identity_on_weekdays() {
        assert_eq!(next_business_day(date("2024-01-03")), date("2024-01-03"));
    }

    #[test]
    fn next_business_day_skips_weekend() {
        assert_eq!(next_business_day(date("2024-01-06")), date("2024-01-08"));
        assert_eq!(next_business_day(date("2024-01-07")), date("2024-01-08"));
    }

    #[test]
    fn add_zero_returns_start_unchanged() {
        // Holds even when the start itself is a weekend
        assert_eq!(add_business_days(date("2024-01-06"), 0), date("2024-01-06"));
        assert_eq!(add_business_days(date("2024-01-01"), 0), date("2024-01-01"));
    }

    #[test]
    fn add_within_week() {
        // Monday + 3 business days = Thursday
        assert_eq!(add_business_days(date("2024-01-01"), 3), date("2024-01-04"));
    }

    #[test]
    fn add_across_weekend() {
        // Friday + 1 business day = Monday
        assert_eq!(add_business_days(date("2024-01-05"), 1), date("2024-01-08"));
        // Friday + 4 business days = Thursday next week
        assert_eq!(add_business_days(date("2024-01-05"), 4), date("2024-01-11"));
    }

    #[test]
    fn add_across_multiple_weekends() {
        // Monday + 10 business days = two full weeks
        assert_eq!(
            add_business_days(date("2024-01-01"), 10),
            date("2024-01-15")
        );
    }
}
