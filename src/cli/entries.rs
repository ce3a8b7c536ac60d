use std::time::Duration as StdDuration;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use clap::{CommandFactory, Parser};
use tracing::warn;
use uuid::Uuid;

use crate::{
    store::{
        entities::EntryKind,
        snapshot::JsonSnapshotStorage,
        tracker::{EntryDraft, EntryPatch, StartOptions, TrackerStore},
    },
    utils::clock::{Clock, DefaultClock},
};

use super::{
    Args, DateStyle, load_store, parse_cli_datetime, project_display_name,
    report::format_duration, resolve_or_create_project, resolve_or_create_tag, save_store,
};

#[derive(Debug, Parser)]
pub struct StartCommand {
    #[arg(value_enum, help = "Kind of timer to start")]
    kind: EntryKind,
    #[arg(long, short, help = "Project name. Created on first use")]
    project: Option<String>,
    #[arg(long = "tag", short, help = "Tag name, repeatable. Created on first use")]
    tags: Vec<String>,
    #[arg(
        long,
        help = "Planned length in seconds. Defaults to 1500 for work and 300 for break"
    )]
    target: Option<i64>,
    #[arg(long, help = "Count this break toward active time")]
    working_break: bool,
    #[arg(long, short, help = "Free-form note")]
    notes: Option<String>,
}

pub async fn process_start_command(
    storage: &JsonSnapshotStorage,
    command: StartCommand,
) -> Result<()> {
    let mut store = load_store(storage).await?;

    let project_id = command
        .project
        .as_deref()
        .map(|name| resolve_or_create_project(&mut store, name));
    let tag_ids = command
        .tags
        .iter()
        .map(|name| resolve_or_create_tag(&mut store, name))
        .collect();

    let id = store.start_entry(
        command.kind,
        StartOptions {
            project_id,
            tag_ids,
            notes: command.notes,
            target_duration: command.target.map(Duration::seconds),
            is_working_break: command.working_break,
        },
    );

    save_store(storage, &store).await?;
    println!(
        "Started {} timer on {} ({id})",
        command.kind,
        project_display_name(&store, project_id)
    );
    Ok(())
}

pub async fn process_stop_command(storage: &JsonSnapshotStorage) -> Result<()> {
    let mut store = load_store(storage).await?;

    let Some(id) = store.stop_entry() else {
        println!("No running timer");
        return Ok(());
    };
    save_store(storage, &store).await?;

    if let Some(entry) = store.entry(id) {
        let elapsed = entry.effective_end(store.now()) - entry.start_time;
        println!("Stopped {} timer after {}", entry.kind, format_duration(elapsed));
    }
    Ok(())
}

const TICK_INTERVAL: StdDuration = StdDuration::from_secs(1);

pub async fn process_status_command(storage: &JsonSnapshotStorage, watch: bool) -> Result<()> {
    let store = load_store(storage).await?;
    let clock = DefaultClock;

    if !watch {
        print_status(&store, clock.time());
        return Ok(());
    }

    let mut tick = clock.instant();
    loop {
        print_status(&store, clock.time());
        tick += TICK_INTERVAL;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = clock.sleep_until(tick) => {}
        }
    }
    Ok(())
}

fn print_status(store: &TrackerStore, now: DateTime<Utc>) {
    let Some(entry) = store.running_entry() else {
        println!("No running timer");
        return;
    };

    let elapsed = now - entry.start_time;
    let target_note = match entry.target_duration {
        Some(target) if elapsed >= target => "\ttarget reached",
        _ => "",
    };
    println!(
        "{}\t{}\t{}{}",
        entry.kind,
        project_display_name(store, entry.project_id),
        format_duration(elapsed),
        target_note
    );
}

#[derive(Debug, Parser)]
pub struct AddCommand {
    #[arg(value_enum, help = "Kind of the entry")]
    kind: EntryKind,
    #[arg(
        long,
        short,
        help = "Start of the entry. Examples are \"yesterday\", \"1 hour ago\", \"12:00 16/03/2025\""
    )]
    start: String,
    #[arg(long, short, help = "End of the entry. Omit to leave the entry open")]
    end: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(long, short, help = "Project name. Created on first use")]
    project: Option<String>,
    #[arg(long = "tag", short, help = "Tag name, repeatable. Created on first use")]
    tags: Vec<String>,
    #[arg(long, help = "Planned length in seconds")]
    target: Option<i64>,
    #[arg(long, help = "Count this break toward active time")]
    working_break: bool,
    #[arg(long, short, help = "Free-form note")]
    notes: Option<String>,
}

pub async fn process_add_command(storage: &JsonSnapshotStorage, command: AddCommand) -> Result<()> {
    let start_time = parse_cli_datetime(&command.start, command.date_style)?;
    let end_time = command
        .end
        .as_deref()
        .map(|v| parse_cli_datetime(v, command.date_style))
        .transpose()?;

    // The store accepts any range, so the editor rejects inverted ones here.
    if let Some(end) = end_time {
        if end < start_time {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Entry would end ({end}) before it starts ({start_time})"),
                )
                .into());
        }
    }

    let mut store = load_store(storage).await?;

    if end_time.is_none() && store.running_entry().is_some() {
        warn!("Adding an open entry while a timer runs leaves two open entries");
    }

    let project_id = command
        .project
        .as_deref()
        .map(|name| resolve_or_create_project(&mut store, name));
    let tag_ids = command
        .tags
        .iter()
        .map(|name| resolve_or_create_tag(&mut store, name))
        .collect();

    store.add_manual_entry(EntryDraft {
        kind: command.kind,
        start_time,
        end_time,
        project_id,
        tag_ids,
        notes: command.notes,
        target_duration: command.target.map(Duration::seconds),
        is_working_break: command.working_break,
    });

    save_store(storage, &store).await?;
    println!("Added {} entry", command.kind);
    Ok(())
}

#[derive(Debug, Parser)]
pub struct EditCommand {
    #[arg(help = "Id of the entry to edit")]
    id: Uuid,
    #[arg(long, help = "New start of the entry")]
    start: Option<String>,
    #[arg(long, help = "New end of the entry")]
    end: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(long, value_enum, help = "Change the entry kind")]
    kind: Option<EntryKind>,
    #[arg(long, help = "Move the entry to a project. Created on first use")]
    project: Option<String>,
    #[arg(long, help = "Detach the entry from its project", conflicts_with = "project")]
    no_project: bool,
    #[arg(long = "tag", help = "Replace the tag set, repeatable")]
    tags: Vec<String>,
    #[arg(long, help = "Remove all tags", conflicts_with = "tags")]
    clear_tags: bool,
    #[arg(long, help = "Replace the note")]
    notes: Option<String>,
    #[arg(long, help = "New planned length in seconds")]
    target: Option<i64>,
    #[arg(long, help = "Whether this break counts toward active time")]
    working_break: Option<bool>,
}

pub async fn process_edit_command(
    storage: &JsonSnapshotStorage,
    command: EditCommand,
) -> Result<()> {
    let mut store = load_store(storage).await?;

    let Some(existing) = store.entry(command.id) else {
        println!("No entry with id {}", command.id);
        return Ok(());
    };

    let start_time = command
        .start
        .as_deref()
        .map(|v| parse_cli_datetime(v, command.date_style))
        .transpose()?;
    let end_time = command
        .end
        .as_deref()
        .map(|v| parse_cli_datetime(v, command.date_style))
        .transpose()?;

    let checked_start = start_time.unwrap_or(existing.start_time);
    if let Some(checked_end) = end_time.or(existing.end_time) {
        if checked_end < checked_start {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Entry would end ({checked_end}) before it starts ({checked_start})"),
                )
                .into());
        }
    }

    let project_id = if command.no_project {
        Some(None)
    } else {
        match command.project.as_deref() {
            Some(name) => Some(Some(resolve_or_create_project(&mut store, name))),
            None => None,
        }
    };
    let tag_ids = if command.clear_tags {
        Some(vec![])
    } else if command.tags.is_empty() {
        None
    } else {
        Some(
            command
                .tags
                .iter()
                .map(|name| resolve_or_create_tag(&mut store, name))
                .collect(),
        )
    };

    store.update_entry(
        command.id,
        EntryPatch {
            start_time,
            end_time: end_time.map(Some),
            kind: command.kind,
            project_id,
            tag_ids,
            notes: command.notes.map(Some),
            target_duration: command.target.map(|v| Some(Duration::seconds(v))),
            is_working_break: command.working_break,
        },
    );

    save_store(storage, &store).await?;
    println!("Updated entry {}", command.id);
    Ok(())
}

pub async fn process_delete_command(storage: &JsonSnapshotStorage, id: Uuid) -> Result<()> {
    let mut store = load_store(storage).await?;

    if store.entry(id).is_none() {
        println!("No entry with id {id}");
        return Ok(());
    }
    store.delete_entry(id);
    save_store(storage, &store).await?;
    println!("Deleted entry {id}");
    Ok(())
}
