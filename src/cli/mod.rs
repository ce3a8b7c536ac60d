pub mod catalog;
pub mod entries;
pub mod report;
pub mod transfer;

use std::{fmt::Display, path::PathBuf};

use anyhow::Result;
use catalog::{ProjectCommand, TagCommand};
use chrono::{DateTime, Local, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use entries::{AddCommand, EditCommand, StartCommand};
use report::ReportCommand;
use tracing::{info, level_filters::LevelFilter};
use transfer::ImportCommand;
use uuid::Uuid;

use crate::{
    store::{
        snapshot::{JsonSnapshotStorage, SnapshotStorage},
        tracker::TrackerStore,
    },
    utils::{
        clock::DefaultClock,
        dir::create_application_default_path,
        logging::enable_logging,
    },
};

#[derive(Parser, Debug)]
#[command(name = "Worklog", version, long_about = None)]
#[command(about = "Personal time tracker for work and break timers", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Start a work or break timer. A running timer is stopped first")]
    Start {
        #[command(flatten)]
        command: StartCommand,
    },
    #[command(about = "Stop the running timer")]
    Stop {},
    #[command(about = "Show the running timer")]
    Status {
        #[arg(long, help = "Re-print the running timer every second until Ctrl-C")]
        watch: bool,
    },
    #[command(about = "Insert an entry manually, e.g. a backdated correction")]
    Add {
        #[command(flatten)]
        command: AddCommand,
    },
    #[command(about = "Edit an entry by id")]
    Edit {
        #[command(flatten)]
        command: EditCommand,
    },
    #[command(about = "Delete an entry by id")]
    Delete { id: Uuid },
    #[command(about = "Active and rest totals for the current day")]
    Today {},
    #[command(about = "Daily or per-project work totals over a date range")]
    Report {
        #[command(flatten)]
        command: ReportCommand,
    },
    #[command(about = "Manage projects")]
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    #[command(about = "Manage tags")]
    Tag {
        #[command(subcommand)]
        command: TagCommand,
    },
    #[command(about = "Export all entries as csv")]
    Export {
        #[arg(long, help = "Write to a file instead of stdout")]
        out: Option<PathBuf>,
    },
    #[command(about = "Import entries from csv or restore a json snapshot")]
    Import {
        #[command(flatten)]
        command: ImportCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let data_path = create_application_default_path()?;
    enable_logging(&data_path, logging_level, args.log)?;

    let storage = JsonSnapshotStorage::new(data_path.join("worklog.json"))?;

    match args.commands {
        Commands::Start { command } => entries::process_start_command(&storage, command).await,
        Commands::Stop {} => entries::process_stop_command(&storage).await,
        Commands::Status { watch } => entries::process_status_command(&storage, watch).await,
        Commands::Add { command } => entries::process_add_command(&storage, command).await,
        Commands::Edit { command } => entries::process_edit_command(&storage, command).await,
        Commands::Delete { id } => entries::process_delete_command(&storage, id).await,
        Commands::Today {} => report::process_today_command(&storage).await,
        Commands::Report { command } => report::process_report_command(&storage, command).await,
        Commands::Project { command } => catalog::process_project_command(&storage, command).await,
        Commands::Tag { command } => catalog::process_tag_command(&storage, command).await,
        Commands::Export { out } => transfer::process_export_command(&storage, out).await,
        Commands::Import { command } => transfer::process_import_command(&storage, command).await,
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

/// Color given to projects and tags created in passing, for example from a
/// `start --project` with a name the store hasn't seen yet.
pub(crate) const DEFAULT_ENTITY_COLOR: &str = "#6b7280";

pub(crate) async fn load_store(storage: &JsonSnapshotStorage) -> Result<TrackerStore> {
    let snapshot = storage.load().await?;
    Ok(TrackerStore::from_snapshot(snapshot, Box::new(DefaultClock)))
}

pub(crate) async fn save_store(storage: &JsonSnapshotStorage, store: &TrackerStore) -> Result<()> {
    storage.save(&store.snapshot()).await
}

pub(crate) fn parse_cli_datetime(value: &str, date_style: DateStyle) -> Result<DateTime<Utc>> {
    match parse_date_string(value, Local::now(), date_style.into()) {
        Ok(v) => Ok(v.with_timezone(&Utc)),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate date {value}: {e}"),
            )
            .into()),
    }
}

pub(crate) fn resolve_or_create_project(store: &mut TrackerStore, name: &str) -> Uuid {
    if let Some(project) = store.project_by_name(name) {
        return project.id;
    }
    info!("Creating project {name}");
    store.add_project(name, DEFAULT_ENTITY_COLOR)
}

pub(crate) fn resolve_or_create_tag(store: &mut TrackerStore, name: &str) -> Uuid {
    if let Some(tag) = store.tag_by_name(name) {
        return tag.id;
    }
    info!("Creating tag {name}");
    store.add_tag(name, DEFAULT_ENTITY_COLOR)
}

/// Read-side resolution of the weak project reference. Deleted projects show
/// up as unknown instead of failing.
pub(crate) fn project_display_name(store: &TrackerStore, id: Option<Uuid>) -> String {
    match id {
        None => "(no project)".to_string(),
        Some(id) => store
            .project(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "(unknown)".to_string()),
    }
}
