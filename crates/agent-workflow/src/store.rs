//! Persistence of result records
//!
//! Records live one per file under `root/subject/asOf/` as
//! `{task}_{sequence}.json`.

/// Output root used when none is given
pub const DEFAULT_OUTPUT_ROOT: &str = "results";

use agent_core::{DATE_FORMAT, Error, ResultRecord, Result, TaskKind};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Persists and reads per-task result records
#[async_trait]
pub trait OutputStore: Send + Sync {
    /// Root the batch's tasks write under
    ///
    /// Launchers receive this root, so records written by a task are the
    /// records this store lists.
    fn root(&self) -> &Path;

    /// Existence check run before any task executes
    async fn preflight(&self) -> Result<()> {
        Ok(())
    }

    /// Persist `record` under `(subject, as_of, task_id)`
    ///
    /// The key must match the record's own fields.
    async fn write(
        &self,
        subject: &str,
        as_of: NaiveDate,
        task_id: TaskKind,
        record: &ResultRecord,
    ) -> Result<()>;

    /// Every record persisted for `(subject, as_of)`, in unspecified order
    async fn list_records(&self, subject: &str, as_of: NaiveDate) -> Result<Vec<ResultRecord>>;
}

/// Filesystem-backed [`OutputStore`]
#[derive(Debug, Clone)]
pub struct FsOutputStore {
    root: PathBuf,
}

impl FsOutputStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the records for `(subject, as_of)`
    pub fn record_dir(&self, subject: &str, as_of: NaiveDate) -> PathBuf {
        self.root
            .join(subject)
            .join(as_of.format(DATE_FORMAT).to_string())
    }

    async fn next_sequence(dir: &Path, task_id: TaskKind) -> Result<u32> {
        let prefix = format!("{}_", task_id.id());
        let mut highest = 0;

        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(seq) = name
                .to_str()
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.strip_prefix(&prefix))
                .and_then(|n| n.parse::<u32>().ok())
            else {
                continue;
            };
            highest = highest.max(seq);
        }

        Ok(highest + 1)
    }
}

#[async_trait]
impl OutputStore for FsOutputStore {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn preflight(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            Error::Config(format!(
                "output root {} is not usable: {e}",
                self.root.display()
            ))
        })
    }

    async fn write(
        &self,
        subject: &str,
        as_of: NaiveDate,
        task_id: TaskKind,
        record: &ResultRecord,
    ) -> Result<()> {
        if record.subject() != subject || record.as_of() != as_of || record.task_id() != task_id {
            return Err(Error::Store(format!(
                "record for {}/{}/{} written under key {subject}/{as_of}/{task_id}",
                record.subject(),
                record.as_of(),
                record.task_id()
            )));
        }

        let dir = self.record_dir(subject, as_of);
        fs::create_dir_all(&dir).await?;
        let body = serde_json::to_vec_pretty(record)?;

        let mut seq = Self::next_sequence(&dir, task_id).await?;
        loop {
            let path = dir.join(format!("{}_{seq}.json", task_id.id()));
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(&body).await?;
                    file.flush().await?;
                    debug!(path = %path.display(), "Record written");
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => seq += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn list_records(&self, subject: &str, as_of: NaiveDate) -> Result<Vec<ResultRecord>> {
        let dir = self.record_dir(subject, as_of);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") || !entry.file_type().await?.is_file() {
                continue;
            }

            let bytes = fs::read(&path).await?;
            match serde_json::from_slice::<ResultRecord>(&bytes) {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable record"),
            }
        }

        Ok(records)
    }
}
