use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};

/// Returns the first instant of `day` in the given timezone. DST gaps resolve
/// to the earliest valid instant.
pub fn day_start<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    day.and_time(NaiveTime::MIN)
        .and_local_timezone(tz.clone())
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&day.and_time(NaiveTime::MIN)))
}

/// Returns start of the next day.
pub fn next_day_start<Tz: TimeZone>(date: DateTime<Tz>) -> DateTime<Tz> {
    (date + Duration::days(1)).with_time(NaiveTime::MIN).unwrap()
}

/// Dates between start (inclusive) and end (inclusive).
pub fn date_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(start), |d| d.succ_opt()).take_while(move |d| *d <= end)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::date_range;

    #[test]
    fn date_range_is_inclusive_on_both_ends() {
        let start = NaiveDate::from_ymd_opt(2024, 4, 29).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let days: Vec<_> = date_range(start, end).collect();
        assert_eq!(days.len(), 4);
        assert_eq!(days[0], start);
        assert_eq!(days[3], end);
    }

    #[test]
    fn date_range_with_inverted_bounds_is_empty() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(date_range(start, end).count(), 0);
    }
}
