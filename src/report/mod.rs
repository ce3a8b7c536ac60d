pub mod buckets;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::{
    store::entities::TimeEntry,
    utils::time::{day_start, next_day_start},
};

/// Query window for aggregation. Every bucketing granularity applies the same
/// clip against it, so an entry contributes only its in-window portion.
#[derive(Debug, Clone, Copy)]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window covering one calendar day in the given timezone.
    pub fn local_day<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> Self {
        let start = day_start(day, tz);
        let end = next_day_start(start.clone());
        Self {
            start: start.to_utc(),
            end: end.to_utc(),
        }
    }

    /// Clipped duration of `entry` inside this window. Open entries are
    /// measured up to `now` but never past the window end.
    pub fn clip(&self, entry: &TimeEntry, now: DateTime<Utc>) -> Duration {
        entry.clipped(self.start, self.end, now)
    }
}
