//! Calendar helpers for picking which report dates to reload.
use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;

/// Calendar date of `now` as observed in `zone`.
pub fn today_in(now: DateTime<Utc>, zone: Tz) -> NaiveDate {
    now.with_timezone(&zone).date_naive()
}

/// Dates from yesterday back to `days_back` days ago, most recent first.
pub fn lookback_dates(today: NaiveDate, days_back: u32) -> Vec<NaiveDate> {
    (1..=u64::from(days_back))
        .filter_map(|i| today.checked_sub_days(Days::new(i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn moscow_is_ahead_of_utc_near_midnight() {
        // 22:30 UTC is already 01:30 the next day in Moscow (UTC+3).
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 22, 30, 0).unwrap();
        assert_eq!(today_in(now, chrono_tz::Europe::Moscow), ymd(2024, 5, 11));
        assert_eq!(today_in(now, chrono_tz::UTC), ymd(2024, 5, 10));
    }

    #[test]
    fn lookback_starts_at_yesterday() {
        let dates = lookback_dates(ymd(2024, 1, 2), 3);
        assert_eq!(dates, vec![ymd(2024, 1, 1), ymd(2023, 12, 31), ymd(2023, 12, 30)]);
    }

    #[test]
    fn zero_days_back_is_empty() {
        assert!(lookback_dates(ymd(2024, 1, 2), 0).is_empty());
    }
}
