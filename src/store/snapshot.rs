use std::{future::Future, io::ErrorKind, path::PathBuf};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use serde::Deserialize;
use serde::Serialize;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

use super::entities::{Project, Tag, TimeEntry};

/// The JSON blob the whole tracker state is persisted as. Fields omitted in
/// the file deserialize as empty collections, so partial exports restore
/// cleanly.
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub entries: Vec<TimeEntry>,
    pub projects: Vec<Project>,
    pub tags: Vec<Tag>,
}

/// Interface for abstracting persistence of the tracker state. The store
/// itself never touches the storage medium; the cli loads on startup and
/// saves after every mutation.
pub trait SnapshotStorage {
    fn load(&self) -> impl Future<Output = Result<Snapshot>> + Send;

    fn save(&self, snapshot: &Snapshot) -> impl Future<Output = Result<()>> + Send;
}

/// The main realization of [SnapshotStorage]. One JSON file, file-locked for
/// the duration of each read or write.
pub struct JsonSnapshotStorage {
    path: PathBuf,
}

impl JsonSnapshotStorage {
    pub fn new(path: PathBuf) -> Result<Self, std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }
}

impl SnapshotStorage for JsonSnapshotStorage {
    async fn load(&self) -> Result<Snapshot> {
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No snapshot at {:?}, starting empty", self.path);
                return Ok(Snapshot::default());
            }
            Err(e) => return Err(e.into()),
        };

        file.lock_shared()?;
        let mut buffer = String::new();
        let read_result = file.read_to_string(&mut buffer).await;
        file.unlock_async().await?;
        read_result?;

        let snapshot = serde_json::from_str(&buffer)?;
        Ok(snapshot)
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .await?;

        file.lock_exclusive()?;
        let result = write_snapshot(&mut file, snapshot).await;
        file.unlock_async().await?;
        result
    }
}

async fn write_snapshot(file: &mut File, snapshot: &Snapshot) -> Result<()> {
    let buffer = serde_json::to_vec_pretty(snapshot)?;
    file.write_all(&buffer).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tempfile::tempdir;
    use uuid::Uuid;

    use crate::{
        store::entities::{EntryKind, Project, TimeEntry},
        utils::logging::TEST_LOGGING,
    };

    use super::{JsonSnapshotStorage, Snapshot, SnapshotStorage};

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(), NaiveTime::MIN);

    fn test_snapshot() -> Snapshot {
        Snapshot {
            entries: vec![TimeEntry {
                id: Uuid::new_v4(),
                start_time: Utc.from_utc_datetime(&TEST_START_DATE),
                end_time: None,
                kind: EntryKind::Work,
                project_id: None,
                tag_ids: vec![],
                notes: Some("writing".into()),
                target_duration: None,
                is_working_break: false,
            }],
            projects: vec![Project {
                id: Uuid::new_v4(),
                name: "Writing".into(),
                color: "#b91c1c".into(),
                archived: false,
            }],
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty_snapshot() -> Result<()> {
        *TEST_LOGGING;

        let dir = tempdir()?;
        let storage = JsonSnapshotStorage::new(dir.path().join("worklog.json"))?;

        assert_eq!(storage.load().await?, Snapshot::default());
        Ok(())
    }

    #[tokio::test]
    async fn save_then_load_round_trips() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonSnapshotStorage::new(dir.path().join("worklog.json"))?;

        let snapshot = test_snapshot();
        storage.save(&snapshot).await?;
        assert_eq!(storage.load().await?, snapshot);
        Ok(())
    }

    #[tokio::test]
    async fn save_overwrites_previous_snapshot() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonSnapshotStorage::new(dir.path().join("worklog.json"))?;

        storage.save(&test_snapshot()).await?;
        storage.save(&Snapshot::default()).await?;
        assert_eq!(storage.load().await?, Snapshot::default());
        Ok(())
    }

    #[tokio::test]
    async fn snapshot_with_omitted_collections_loads_as_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("worklog.json");
        tokio::fs::write(&path, "{\"entries\": []}").await?;

        let storage = JsonSnapshotStorage::new(path)?;
        let snapshot = storage.load().await?;
        assert!(snapshot.projects.is_empty());
        assert!(snapshot.tags.is_empty());
        Ok(())
    }
}
