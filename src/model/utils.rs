use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Fixed reference offset used to decide what "today" means. All stored
/// timestamps stay naive UTC; only day boundaries shift by this offset.
pub const REFERENCE_OFFSET_SECS: i64 = 3600;

#[must_use]
pub fn reference_day(now: DateTime<Utc>) -> NaiveDate {
    (now + Duration::seconds(REFERENCE_OFFSET_SECS)).date_naive()
}

#[must_use]
pub fn reference_day_start_utc(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN) - Duration::seconds(REFERENCE_OFFSET_SECS)
}

/// Half-open `[start, end)` UTC bounds of one reference-offset calendar day.
#[must_use]
pub fn reference_day_bounds_utc(day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = reference_day_start_utc(day);
    (start, start + Duration::days(1))
}

/// European season label: the starting year, rolling over in July.
#[must_use]
pub fn season_for_day(day: NaiveDate) -> i32 {
    if day.month() >= 7 {
        day.year()
    } else {
        day.year() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reference_day_rolls_over_an_hour_early() {
        let late_evening = Utc.with_ymd_and_hms(2026, 3, 13, 23, 30, 0).unwrap();
        assert_eq!(
            reference_day(late_evening),
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
        );
        let midday = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        assert_eq!(
            reference_day(midday),
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
        );
    }

    #[test]
    fn day_bounds_are_half_open_and_shifted() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let (start, end) = reference_day_bounds_utc(day);
        assert_eq!(
            start,
            NaiveDate::from_ymd_opt(2026, 3, 13)
                .unwrap()
                .and_hms_opt(23, 0, 0)
                .unwrap()
        );
        assert_eq!(end - start, Duration::days(1));
    }

    #[test]
    fn season_label_rolls_over_in_july() {
        assert_eq!(
            season_for_day(NaiveDate::from_ymd_opt(2026, 6, 30).unwrap()),
            2025
        );
        assert_eq!(
            season_for_day(NaiveDate::from_ymd_opt(2026, 7, 1).unwrap()),
            2026
        );
    }
}
