//! Checkpoint persistence
//!
//! The checkpoint is the highest row id that has been exported *and*
//! delivered. It lives in a single file holding its decimal text; a missing
//! or unreadable file means "start from 0".

use crate::domain::{Result, RowId, RowshipError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::io::AsyncWriteExt;

/// Outcome of reading the persisted checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointRead {
    /// No checkpoint has been written yet
    Missing,
    /// A valid checkpoint
    Found(RowId),
    /// The checkpoint exists but could not be read or parsed
    Corrupt(String),
}

impl CheckpointRead {
    /// Effective checkpoint: anything but a valid value means 0
    pub fn value(&self) -> RowId {
        match self {
            CheckpointRead::Found(id) => *id,
            CheckpointRead::Missing | CheckpointRead::Corrupt(_) => RowId::ZERO,
        }
    }
}

/// Storage backend for the checkpoint
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Reads the persisted checkpoint, classifying absence and corruption
    async fn load(&self) -> CheckpointRead;

    /// Durably and atomically replaces the persisted checkpoint
    ///
    /// # Errors
    ///
    /// Returns [`RowshipError::CheckpointWrite`] if the value could not be
    /// persisted.
    async fn write(&self, value: RowId) -> Result<()>;

    /// Where the checkpoint lives, for diagnostics
    fn location(&self) -> String;

    /// Reads the checkpoint, never failing
    ///
    /// A corrupt checkpoint is reported at WARN and treated as 0, which
    /// re-exports everything.
    async fn read(&self) -> RowId {
        match self.load().await {
            CheckpointRead::Found(id) => id,
            CheckpointRead::Missing => {
                tracing::info!(
                    location = %self.location(),
                    "No checkpoint found - exporting from the beginning"
                );
                RowId::ZERO
            }
            CheckpointRead::Corrupt(reason) => {
                tracing::warn!(
                    location = %self.location(),
                    reason = %reason,
                    "Checkpoint unreadable - recovering by exporting from 0"
                );
                RowId::ZERO
            }
        }
    }
}

/// Checkpoint stored as decimal text in a file
///
/// Writes go to a hidden sibling file which is fsynced and then renamed over
/// the target, so readers only ever see the old or the new value.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    /// Create a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the checkpoint file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "checkpoint".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }

    async fn write_atomically(&self, value: RowId) -> std::io::Result<()> {
        let temp_path = self.temp_path();

        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(value.to_string().as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp_path, &self.path).await?;

        // Persist the rename itself
        #[cfg(unix)]
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::File::open(dir).await?.sync_all().await?;
        }

        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> CheckpointRead {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => match RowId::from_str(&contents) {
                Ok(id) => CheckpointRead::Found(id),
                Err(e) => CheckpointRead::Corrupt(e),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckpointRead::Missing,
            Err(e) => CheckpointRead::Corrupt(e.to_string()),
        }
    }

    async fn write(&self, value: RowId) -> Result<()> {
        if let Err(e) = self.write_atomically(value).await {
            let _ = tokio::fs::remove_file(self.temp_path()).await;
            return Err(RowshipError::CheckpointWrite(format!(
                "Failed to persist checkpoint {} to {}: {}",
                value,
                self.path.display(),
                e
            )));
        }

        tracing::debug!(path = %self.path.display(), checkpoint = %value, "Checkpoint persisted");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
