use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::utils::clock::Clock;

use super::{
    entities::{EntryKind, Project, Tag, TimeEntry},
    snapshot::Snapshot,
};

/// Default planned length for a timer started without an explicit target.
pub const DEFAULT_WORK_TARGET: Duration = Duration::seconds(1500);
pub const DEFAULT_BREAK_TARGET: Duration = Duration::seconds(300);

/// Single source of truth for entries, projects and tags. Every mutation goes
/// through the methods below; raw collections are only handed out read-only.
///
/// The "at most one running entry" rule is maintained on the start/stop path.
/// `add_manual_entry` deliberately bypasses it so historical corrections can
/// be inserted while a timer runs.
pub struct TrackerStore {
    entries: Vec<TimeEntry>,
    projects: Vec<Project>,
    tags: Vec<Tag>,
    clock: Box<dyn Clock>,
}

/// Optional fields for [TrackerStore::start_entry].
#[derive(Debug, Default, Clone)]
pub struct StartOptions {
    pub project_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub notes: Option<String>,
    pub target_duration: Option<Duration>,
    pub is_working_break: bool,
}

/// Caller-specified entry for manual insertion. The id is generated by the
/// store.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub kind: EntryKind,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub project_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub notes: Option<String>,
    pub target_duration: Option<Duration>,
    pub is_working_break: bool,
}

/// Partial update for an entry. Outer `None` leaves the field untouched,
/// `Some(None)` clears an optional field.
#[derive(Debug, Default, Clone)]
pub struct EntryPatch {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<Option<DateTime<Utc>>>,
    pub kind: Option<EntryKind>,
    pub project_id: Option<Option<Uuid>>,
    pub tag_ids: Option<Vec<Uuid>>,
    pub notes: Option<Option<String>>,
    pub target_duration: Option<Option<Duration>>,
    pub is_working_break: Option<bool>,
}

#[derive(Debug, Default, Clone)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub archived: Option<bool>,
}

#[derive(Debug, Default, Clone)]
pub struct TagPatch {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl TrackerStore {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self::from_snapshot(Snapshot::default(), clock)
    }

    pub fn from_snapshot(snapshot: Snapshot, clock: Box<dyn Clock>) -> Self {
        Self {
            entries: snapshot.entries,
            projects: snapshot.projects,
            tags: snapshot.tags,
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.time()
    }

    pub fn entries(&self) -> &[TimeEntry] {
        &self.entries
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn entry(&self, id: Uuid) -> Option<&TimeEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn running_entry(&self) -> Option<&TimeEntry> {
        self.entries.iter().find(|e| e.is_running())
    }

    pub fn project(&self, id: Uuid) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn project_by_name(&self, name: &str) -> Option<&Project> {
        self.projects
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn tag(&self, id: Uuid) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == id)
    }

    pub fn tag_by_name(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Starts a new timer. A currently running entry is closed at the same
    /// instant, so switching never leaves two open entries behind.
    pub fn start_entry(&mut self, kind: EntryKind, options: StartOptions) -> Uuid {
        let now = self.clock.time();
        if let Some(open) = self.entries.iter_mut().find(|e| e.is_running()) {
            debug!("Closing running entry {} before starting a new one", open.id);
            open.end_time = Some(now);
        }

        let target = options.target_duration.unwrap_or(match kind {
            EntryKind::Work => DEFAULT_WORK_TARGET,
            EntryKind::Break => DEFAULT_BREAK_TARGET,
        });

        let entry = TimeEntry {
            id: Uuid::new_v4(),
            start_time: now,
            end_time: None,
            kind,
            project_id: options.project_id,
            tag_ids: options.tag_ids,
            notes: options.notes,
            target_duration: Some(target),
            is_working_break: options.is_working_break,
        };
        let id = entry.id;
        self.entries.push(entry);
        id
    }

    /// Closes the running entry, if any, and returns its id.
    pub fn stop_entry(&mut self) -> Option<Uuid> {
        let now = self.clock.time();
        let open = self.entries.iter_mut().find(|e| e.is_running())?;
        open.end_time = Some(now);
        Some(open.id)
    }

    /// Inserts a fully specified entry under a fresh id. The single-open rule
    /// is not checked here: a draft without an end time while a timer runs
    /// results in two open entries, and callers wanting the rule should stop
    /// the timer first.
    pub fn add_manual_entry(&mut self, draft: EntryDraft) -> Uuid {
        let entry = TimeEntry {
            id: Uuid::new_v4(),
            start_time: draft.start_time,
            end_time: draft.end_time,
            kind: draft.kind,
            project_id: draft.project_id,
            tag_ids: draft.tag_ids,
            notes: draft.notes,
            target_duration: draft.target_duration,
            is_working_break: draft.is_working_break,
        };
        let id = entry.id;
        self.entries.push(entry);
        id
    }

    /// Merges patch fields into the matching entry. Unknown ids are ignored.
    pub fn update_entry(&mut self, id: Uuid, patch: EntryPatch) {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            debug!("Update for unknown entry {id} ignored");
            return;
        };
        if let Some(v) = patch.start_time {
            entry.start_time = v;
        }
        if let Some(v) = patch.end_time {
            entry.end_time = v;
        }
        if let Some(v) = patch.kind {
            entry.kind = v;
        }
        if let Some(v) = patch.project_id {
            entry.project_id = v;
        }
        if let Some(v) = patch.tag_ids {
            entry.tag_ids = v;
        }
        if let Some(v) = patch.notes {
            entry.notes = v;
        }
        if let Some(v) = patch.target_duration {
            entry.target_duration = v;
        }
        if let Some(v) = patch.is_working_break {
            entry.is_working_break = v;
        }
    }

    pub fn delete_entry(&mut self, id: Uuid) {
        self.entries.retain(|e| e.id != id);
    }

    pub fn add_project(&mut self, name: impl Into<String>, color: impl Into<String>) -> Uuid {
        let project = Project {
            id: Uuid::new_v4(),
            name: name.into(),
            color: color.into(),
            archived: false,
        };
        let id = project.id;
        self.projects.push(project);
        id
    }

    pub fn update_project(&mut self, id: Uuid, patch: ProjectPatch) {
        let Some(project) = self.projects.iter_mut().find(|p| p.id == id) else {
            debug!("Update for unknown project {id} ignored");
            return;
        };
        if let Some(v) = patch.name {
            project.name = v;
        }
        if let Some(v) = patch.color {
            project.color = v;
        }
        if let Some(v) = patch.archived {
            project.archived = v;
        }
    }

    /// Removes a project. Entries keep their dangling `project_id`; readers
    /// resolve it to "unknown".
    pub fn delete_project(&mut self, id: Uuid) {
        self.projects.retain(|p| p.id != id);
    }

    pub fn add_tag(&mut self, name: impl Into<String>, color: impl Into<String>) -> Uuid {
        let tag = Tag {
            id: Uuid::new_v4(),
            name: name.into(),
            color: color.into(),
        };
        let id = tag.id;
        self.tags.push(tag);
        id
    }

    pub fn update_tag(&mut self, id: Uuid, patch: TagPatch) {
        let Some(tag) = self.tags.iter_mut().find(|t| t.id == id) else {
            debug!("Update for unknown tag {id} ignored");
            return;
        };
        if let Some(v) = patch.name {
            tag.name = v;
        }
        if let Some(v) = patch.color {
            tag.color = v;
        }
    }

    pub fn delete_tag(&mut self, id: Uuid) {
        self.tags.retain(|t| t.id != id);
    }

    /// Destructive restore: replaces all three collections, never merges.
    pub fn import_data(&mut self, snapshot: Snapshot) {
        self.entries = snapshot.entries;
        self.projects = snapshot.projects;
        self.tags = snapshot.tags;
    }

    /// Copy of the current collections for the persistence collaborator.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            entries: self.entries.clone(),
            projects: self.projects.clone(),
            tags: self.tags.clone(),
        }
    }
}
