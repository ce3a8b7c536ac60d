use anyhow::Result;
use clap::Subcommand;

use crate::store::{
    snapshot::JsonSnapshotStorage,
    tracker::{ProjectPatch, TagPatch},
};

use super::{DEFAULT_ENTITY_COLOR, load_store, save_store};

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    #[command(about = "Create a project")]
    Add {
        name: String,
        #[arg(long, default_value = DEFAULT_ENTITY_COLOR, help = "Display color")]
        color: String,
    },
    #[command(about = "List projects")]
    List {
        #[arg(long, help = "Include archived projects")]
        all: bool,
    },
    #[command(about = "Rename a project")]
    Rename { name: String, new_name: String },
    #[command(about = "Archive a project, hiding it from listings")]
    Archive { name: String },
    #[command(
        about = "Delete a project. Its entries keep a dangling reference and report as unknown"
    )]
    Delete { name: String },
}

pub async fn process_project_command(
    storage: &JsonSnapshotStorage,
    command: ProjectCommand,
) -> Result<()> {
    let mut store = load_store(storage).await?;

    match command {
        ProjectCommand::Add { name, color } => {
            if store.project_by_name(&name).is_some() {
                println!("Project {name} already exists");
                return Ok(());
            }
            store.add_project(name.clone(), color);
            save_store(storage, &store).await?;
            println!("Created project {name}");
        }
        ProjectCommand::List { all } => {
            for project in store.projects() {
                if project.archived && !all {
                    continue;
                }
                let marker = if project.archived { "\tarchived" } else { "" };
                println!("{}\t{}{}", project.name, project.color, marker);
            }
        }
        ProjectCommand::Rename { name, new_name } => {
            let Some(project) = store.project_by_name(&name) else {
                println!("No project named {name}");
                return Ok(());
            };
            let id = project.id;
            store.update_project(
                id,
                ProjectPatch {
                    name: Some(new_name.clone()),
                    ..Default::default()
                },
            );
            save_store(storage, &store).await?;
            println!("Renamed {name} to {new_name}");
        }
        ProjectCommand::Archive { name } => {
            let Some(project) = store.project_by_name(&name) else {
                println!("No project named {name}");
                return Ok(());
            };
            let id = project.id;
            store.update_project(
                id,
                ProjectPatch {
                    archived: Some(true),
                    ..Default::default()
                },
            );
            save_store(storage, &store).await?;
            println!("Archived {name}");
        }
        ProjectCommand::Delete { name } => {
            let Some(project) = store.project_by_name(&name) else {
                println!("No project named {name}");
                return Ok(());
            };
            let id = project.id;
            store.delete_project(id);
            save_store(storage, &store).await?;
            println!("Deleted {name}");
        }
    }
    Ok(())
}

#[derive(Subcommand, Debug)]
pub enum TagCommand {
    #[command(about = "Create a tag")]
    Add {
        name: String,
        #[arg(long, default_value = DEFAULT_ENTITY_COLOR, help = "Display color")]
        color: String,
    },
    #[command(about = "List tags")]
    List {},
    #[command(about = "Rename a tag")]
    Rename { name: String, new_name: String },
    #[command(about = "Delete a tag. Entries keep a dangling reference")]
    Delete { name: String },
}

pub async fn process_tag_command(storage: &JsonSnapshotStorage, command: TagCommand) -> Result<()> {
    let mut store = load_store(storage).await?;

    match command {
        TagCommand::Add { name, color } => {
            if store.tag_by_name(&name).is_some() {
                println!("Tag {name} already exists");
                return Ok(());
            }
            store.add_tag(name.clone(), color);
            save_store(storage, &store).await?;
            println!("Created tag {name}");
        }
        TagCommand::List {} => {
            for tag in store.tags() {
                println!("{}\t{}", tag.name, tag.color);
            }
        }
        TagCommand::Rename { name, new_name } => {
            let Some(tag) = store.tag_by_name(&name) else {
                println!("No tag named {name}");
                return Ok(());
            };
            let id = tag.id;
            store.update_tag(
                id,
                TagPatch {
                    name: Some(new_name.clone()),
                    ..Default::default()
                },
            );
            save_store(storage, &store).await?;
            println!("Renamed {name} to {new_name}");
        }
        TagCommand::Delete { name } => {
            let Some(tag) = store.tag_by_name(&name) else {
                println!("No tag named {name}");
                return Ok(());
            };
            let id = tag.id;
            store.delete_tag(id);
            save_store(storage, &store).await?;
            println!("Deleted {name}");
        }
    }
    Ok(())
}
