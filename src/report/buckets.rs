use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use crate::{
    store::entities::{EntryKind, TimeEntry},
    utils::time::date_range,
};

use super::ReportWindow;

/// An unassigned project bucket below this total is treated as noise and left
/// out of the report.
pub const UNASSIGNED_NOISE_THRESHOLD: Duration = Duration::seconds(60);

#[derive(Debug, PartialEq, Eq)]
pub struct DayTotal {
    pub day: NaiveDate,
    pub total: Duration,
}

/// Same-day live stats: time spent working versus resting.
#[derive(Debug, PartialEq, Eq)]
pub struct ActivitySplit {
    pub active: Duration,
    pub rest: Duration,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ProjectBucket {
    /// `None` is the unassigned bucket. A dangling id stays keyed as-is and
    /// is resolved to "unknown" at display time.
    pub project_id: Option<Uuid>,
    pub total: Duration,
}

/// Clipped work duration for every local calendar day in `[first, last]`.
/// Break time is excluded; an entry spanning midnight contributes its
/// in-window portion to each of the two day buckets.
pub fn daily_work_totals<Tz: TimeZone>(
    entries: &[TimeEntry],
    first: NaiveDate,
    last: NaiveDate,
    tz: &Tz,
    now: DateTime<Utc>,
) -> Vec<DayTotal> {
    date_range(first, last)
        .map(|day| {
            let window = ReportWindow::local_day(day, tz);
            let total = entries
                .iter()
                .filter(|e| e.kind == EntryKind::Work)
                .fold(Duration::zero(), |acc, e| acc + window.clip(e, now));
            DayTotal { day, total }
        })
        .collect()
}

/// Active time is work plus working breaks, rest is everything else. Both use
/// the same clip as every other report.
pub fn activity_split(
    entries: &[TimeEntry],
    window: ReportWindow,
    now: DateTime<Utc>,
) -> ActivitySplit {
    let mut split = ActivitySplit {
        active: Duration::zero(),
        rest: Duration::zero(),
    };
    for entry in entries {
        let clipped = window.clip(entry, now);
        if entry.counts_as_active() {
            split.active += clipped;
        } else {
            split.rest += clipped;
        }
    }
    split
}

/// Clipped work durations keyed by project, sorted by descending total.
/// Unassigned time only shows up above [UNASSIGNED_NOISE_THRESHOLD].
pub fn project_totals(
    entries: &[TimeEntry],
    window: ReportWindow,
    now: DateTime<Utc>,
) -> Vec<ProjectBucket> {
    let mut map = HashMap::<Option<Uuid>, Duration>::new();

    for entry in entries {
        if entry.kind != EntryKind::Work {
            continue;
        }
        let clipped = window.clip(entry, now);
        if clipped.is_zero() {
            continue;
        }
        *map.entry(entry.project_id).or_insert_with(Duration::zero) += clipped;
    }

    if let Some(unassigned) = map.get(&None) {
        if *unassigned <= UNASSIGNED_NOISE_THRESHOLD {
            map.remove(&None);
        }
    }

    let mut buckets = map
        .into_iter()
        .map(|(project_id, total)| ProjectBucket { project_id, total })
        .collect::<Vec<_>>();
    buckets.sort_by(|a, b| b.total.cmp(&a.total));
    buckets
}
