use std::path::PathBuf;

use anyhow::Result;
use chrono::DateTime;
use clap::{CommandFactory, Parser};
use tracing::warn;

use crate::store::{
    entities::EntryKind,
    snapshot::{JsonSnapshotStorage, Snapshot},
    tracker::{EntryDraft, TrackerStore},
};

use super::{Args, load_store, resolve_or_create_project, resolve_or_create_tag, save_store};

const CSV_HEADER: &str = "id,type,start,end,project,tags,notes";

pub async fn process_export_command(
    storage: &JsonSnapshotStorage,
    out: Option<PathBuf>,
) -> Result<()> {
    let store = load_store(storage).await?;
    let csv = entries_to_csv(&store);

    match out {
        Some(path) => tokio::fs::write(path, csv).await?,
        None => print!("{csv}"),
    }
    Ok(())
}

#[derive(Debug, Parser)]
pub struct ImportCommand {
    #[arg(long, help = "Csv file in the export format", conflicts_with = "json")]
    csv: Option<PathBuf>,
    #[arg(long, help = "Json snapshot. Replaces all current data")]
    json: Option<PathBuf>,
    #[arg(
        long,
        help = "Leave unknown project names unassigned instead of creating them"
    )]
    no_create_projects: bool,
}

pub async fn process_import_command(
    storage: &JsonSnapshotStorage,
    command: ImportCommand,
) -> Result<()> {
    match (command.csv, command.json) {
        (Some(path), None) => {
            let content = tokio::fs::read_to_string(path).await?;
            let mut store = load_store(storage).await?;
            let imported = import_csv_into(&mut store, &content, !command.no_create_projects);
            save_store(storage, &store).await?;
            println!("Imported {imported} entries");
            Ok(())
        }
        (None, Some(path)) => {
            let content = tokio::fs::read_to_string(path).await?;
            let snapshot: Snapshot = serde_json::from_str(&content)?;
            let mut store = load_store(storage).await?;
            store.import_data(snapshot);
            save_store(storage, &store).await?;
            println!(
                "Restored {} entries, {} projects, {} tags",
                store.entries().len(),
                store.projects().len(),
                store.tags().len()
            );
            Ok(())
        }
        _ => Err(Args::command()
            .error(
                clap::error::ErrorKind::MissingRequiredArgument,
                "Either --csv or --json must be given",
            )
            .into()),
    }
}

/// Flat view of the entry collection. Project and tag references are resolved
/// to names; dangling references export as empty cells.
fn entries_to_csv(store: &TrackerStore) -> String {
    let mut out = String::new();
    out.push_str(CSV_HEADER);
    out.push('\n');

    for entry in store.entries() {
        let project = entry
            .project_id
            .and_then(|id| store.project(id))
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let tags = entry
            .tag_ids
            .iter()
            .filter_map(|id| store.tag(*id))
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let row = [
            entry.id.to_string(),
            entry.kind.to_string(),
            entry.start_time.to_rfc3339(),
            entry
                .end_time
                .map(|v| v.to_rfc3339())
                .unwrap_or_default(),
            csv_escape(&project),
            csv_escape(&tags),
            csv_escape(entry.notes.as_deref().unwrap_or("")),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Inserts csv rows as manual entries. Ids are regenerated; project and tag
/// names resolve back to references, creating projects on the fly when
/// `create_projects` is set. Malformed rows are skipped with a warning.
fn import_csv_into(store: &mut TrackerStore, content: &str, create_projects: bool) -> usize {
    let mut imported = 0;
    for line in content.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        match parse_csv_row(store, line, create_projects) {
            Some(draft) => {
                store.add_manual_entry(draft);
                imported += 1;
            }
            None => warn!("Skipping malformed csv row: {line}"),
        }
    }
    imported
}

fn parse_csv_row(store: &mut TrackerStore, line: &str, create_projects: bool) -> Option<EntryDraft> {
    let fields = split_csv_line(line);
    if fields.len() < 4 {
        return None;
    }

    let kind = match fields[1].as_str() {
        "work" => EntryKind::Work,
        "break" => EntryKind::Break,
        _ => return None,
    };
    let start_time = DateTime::parse_from_rfc3339(&fields[2]).ok()?.to_utc();
    let end_time = match fields[3].as_str() {
        "" => None,
        v => Some(DateTime::parse_from_rfc3339(v).ok()?.to_utc()),
    };

    let project_id = match fields.get(4).map(String::as_str).unwrap_or("") {
        "" => None,
        name => {
            let existing = store.project_by_name(name).map(|p| p.id);
            match existing {
                Some(id) => Some(id),
                None if create_projects => Some(resolve_or_create_project(store, name)),
                None => None,
            }
        }
    };
    let tag_ids = fields
        .get(5)
        .map(String::as_str)
        .unwrap_or("")
        .split(';')
        .filter(|v| !v.is_empty())
        .map(|name| resolve_or_create_tag(store, name))
        .collect();
    let notes = fields
        .get(6)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string());

    Some(EntryDraft {
        kind,
        start_time,
        end_time,
        project_id,
        tag_ids,
        notes,
        target_duration: None,
        is_working_break: false,
    })
}

fn csv_escape(s: &str) -> String {
    let needs_quote = s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r');
    if !needs_quote {
        return s.to_string();
    }
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = vec![];
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    use crate::{
        store::{
            entities::EntryKind,
            tracker::{EntryDraft, TrackerStore},
        },
        utils::clock::ManualClock,
    };

    use super::{csv_escape, entries_to_csv, import_csv_into, split_csv_line};

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(), NaiveTime::MIN);

    fn test_store() -> (TrackerStore, Arc<ManualClock>) {
        let clock = ManualClock::starting_at(Utc.from_utc_datetime(&TEST_START_DATE));
        let store = TrackerStore::new(Box::new(clock.clone()));
        (store, clock)
    }

    #[test]
    fn escape_quotes_fields_with_separators() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn split_undoes_escaping() {
        let line = "one,\"two, and a half\",\"say \"\"hi\"\"\",";
        let fields = split_csv_line(line);
        assert_eq!(fields, vec!["one", "two, and a half", "say \"hi\"", ""]);
    }

    #[test]
    fn export_resolves_project_and_tag_names() {
        let (mut store, _) = test_store();
        let project = store.add_project("Writing", "#b91c1c");
        let tag = store.add_tag("draft", "#444444");
        let start = Utc.from_utc_datetime(&TEST_START_DATE);
        store.add_manual_entry(EntryDraft {
            kind: EntryKind::Work,
            start_time: start,
            end_time: Some(start + Duration::hours(1)),
            project_id: Some(project),
            tag_ids: vec![tag],
            notes: Some("chapter 1, part 2".into()),
            target_duration: None,
            is_working_break: false,
        });

        let csv = entries_to_csv(&store);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "id,type,start,end,project,tags,notes");
        assert!(lines[1].contains(",work,"));
        assert!(lines[1].contains("Writing"));
        assert!(lines[1].contains("draft"));
        assert!(lines[1].contains("\"chapter 1, part 2\""));
    }

    #[test]
    fn export_leaves_dangling_references_blank() {
        let (mut store, _) = test_store();
        let project = store.add_project("Doomed", "#000000");
        let start = Utc.from_utc_datetime(&TEST_START_DATE);
        store.add_manual_entry(EntryDraft {
            kind: EntryKind::Work,
            start_time: start,
            end_time: Some(start + Duration::hours(1)),
            project_id: Some(project),
            tag_ids: vec![],
            notes: None,
            target_duration: None,
            is_working_break: false,
        });
        store.delete_project(project);

        let csv = entries_to_csv(&store);
        assert!(!csv.contains("Doomed"));
    }

    #[test]
    fn import_round_trips_an_export() {
        let (mut store, _) = test_store();
        let project = store.add_project("Writing", "#b91c1c");
        let start = Utc.from_utc_datetime(&TEST_START_DATE);
        store.add_manual_entry(EntryDraft {
            kind: EntryKind::Break,
            start_time: start,
            end_time: Some(start + Duration::minutes(10)),
            project_id: Some(project),
            tag_ids: vec![],
            notes: None,
            target_duration: None,
            is_working_break: true,
        });
        let csv = entries_to_csv(&store);

        let (mut other, _) = test_store();
        other.add_project("Writing", "#b91c1c");
        let imported = import_csv_into(&mut other, &csv, false);

        assert_eq!(imported, 1);
        let entry = &other.entries()[0];
        assert_eq!(entry.kind, EntryKind::Break);
        assert_eq!(entry.start_time, start);
        assert_eq!(entry.project_id, other.project_by_name("Writing").map(|p| p.id));
    }

    #[test]
    fn import_creates_missing_projects_when_asked() {
        let csv = "id,type,start,end,project,tags,notes\n\
            abc,work,2024-04-05T09:00:00+00:00,2024-04-05T10:00:00+00:00,New Project,focus;deep,\n";

        let (mut store, _) = test_store();
        let imported = import_csv_into(&mut store, csv, true);

        assert_eq!(imported, 1);
        assert!(store.project_by_name("New Project").is_some());
        assert_eq!(store.tags().len(), 2);
    }

    #[test]
    fn import_without_create_leaves_unknown_projects_unassigned() {
        let csv = "id,type,start,end,project,tags,notes\n\
            abc,work,2024-04-05T09:00:00+00:00,,Ghost,,\n";

        let (mut store, _) = test_store();
        let imported = import_csv_into(&mut store, csv, false);

        assert_eq!(imported, 1);
        assert!(store.projects().is_empty());
        assert_eq!(store.entries()[0].project_id, None);
        assert!(store.entries()[0].is_running());
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let csv = "id,type,start,end,project,tags,notes\n\
            abc,work,not-a-date,,,,\n\
            abc,sleep,2024-04-05T09:00:00+00:00,,,,\n\
            short,row\n";

        let (mut store, _) = test_store();
        assert_eq!(import_csv_into(&mut store, csv, true), 0);
        assert!(store.entries().is_empty());
    }
}
