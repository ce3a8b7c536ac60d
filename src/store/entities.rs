use std::fmt::Display;

use chrono::Duration;
use chrono::Utc;

use chrono::DateTime;
use clap::ValueEnum;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Kind of a tracked interval. Break entries stay out of work reports unless
/// flagged as a working break.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Work,
    Break,
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Work => write!(f, "work"),
            EntryKind::Break => write!(f, "break"),
        }
    }
}

/// A single tracked time interval. `end_time = None` marks the currently
/// running entry; the store keeps at most one of those on the start/stop path.
///
/// `project_id` and `tag_ids` are weak references. Deleting a project or tag
/// leaves them dangling and readers resolve them to "unknown" instead.
/// Timestamps serialize as epoch milliseconds, matching the snapshot format
/// the browser exports used.
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: Uuid,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds_option", default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(with = "duration_secs_opt", default)]
    pub target_duration: Option<Duration>,
    #[serde(default)]
    pub is_working_break: bool,
}

impl TimeEntry {
    pub fn is_running(&self) -> bool {
        self.end_time.is_none()
    }

    /// End used for duration math. An open entry is measured up to `now`.
    pub fn effective_end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.end_time.unwrap_or(now)
    }

    /// Portion of this entry inside `[from, to]`. Entries outside the window
    /// and malformed ranges clip to zero, never negative.
    pub fn clipped(&self, from: DateTime<Utc>, to: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        let clip_start = self.start_time.max(from);
        let clip_end = self.effective_end(now).min(to);
        (clip_end - clip_start).max(Duration::zero())
    }

    /// Working breaks count toward active time together with work entries.
    pub fn counts_as_active(&self) -> bool {
        self.kind == EntryKind::Work || self.is_working_break
    }
}

mod duration_secs_opt {
    use chrono::Duration;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(v) => serializer.serialize_some(&v.num_seconds()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<i64>::deserialize(deserializer)?;
        Ok(s.map(Duration::seconds))
    }
}

/// Grouping entity for entries. Pure lookup by id or name, no behavior.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub archived: bool,
}

/// Labeling entity, many-to-many with entries through `tag_ids`.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use uuid::Uuid;

    use super::{EntryKind, TimeEntry};

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();

    fn at(hour: u32, minute: u32) -> chrono::DateTime<Utc> {
        Utc.from_utc_datetime(&NaiveDateTime::new(
            TEST_DATE,
            NaiveTime::from_hms_opt(hour, minute, 0).unwrap(),
        ))
    }

    fn entry(start: chrono::DateTime<Utc>, end: Option<chrono::DateTime<Utc>>) -> TimeEntry {
        TimeEntry {
            id: Uuid::new_v4(),
            start_time: start,
            end_time: end,
            kind: EntryKind::Work,
            project_id: None,
            tag_ids: vec![],
            notes: None,
            target_duration: None,
            is_working_break: false,
        }
    }

    #[test]
    fn clips_to_overlap_with_window() {
        let e = entry(at(10, 0), Some(at(10, 30)));
        let clipped = e.clipped(at(9, 0), at(10, 15), at(12, 0));
        assert_eq!(clipped, Duration::minutes(15));
    }

    #[test]
    fn window_before_entry_clips_to_zero() {
        let e = entry(at(10, 0), Some(at(10, 30)));
        let clipped = e.clipped(at(8, 0), at(9, 0), at(12, 0));
        assert_eq!(clipped, Duration::zero());
    }

    #[test]
    fn open_entry_is_measured_up_to_now_but_never_past_the_window() {
        let e = entry(at(9, 0), None);
        assert_eq!(e.clipped(at(9, 0), at(12, 0), at(10, 0)), Duration::hours(1));
        assert_eq!(
            e.clipped(at(9, 0), at(10, 0), at(11, 30)),
            Duration::hours(1)
        );
    }

    #[test]
    fn inverted_range_clips_to_zero() {
        let e = entry(at(10, 0), Some(at(9, 0)));
        assert_eq!(e.clipped(at(8, 0), at(12, 0), at(12, 0)), Duration::zero());
    }

    #[test]
    fn snapshot_json_round_trip_keeps_millisecond_timestamps() {
        let e = entry(at(10, 0), None);
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"startTime\""));
        assert!(json.contains("\"endTime\":null"));
        assert!(json.contains("\"type\":\"work\""));
        let back: TimeEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn missing_optional_fields_default_when_deserializing() {
        let json = format!(
            "{{\"id\":\"{}\",\"startTime\":1712311200000,\"type\":\"break\"}}",
            Uuid::new_v4()
        );
        let e: TimeEntry = serde_json::from_str(&json).unwrap();
        assert!(e.is_running());
        assert!(e.tag_ids.is_empty());
        assert!(!e.is_working_break);
        assert_eq!(e.target_duration, None);
    }
}
