//! In-memory collaborators for exercising full runs without PostgreSQL or
//! an SSH server.

#![allow(dead_code)]

use async_trait::async_trait;
use rowship::adapters::database::RowSource;
use rowship::adapters::transfer::{
    deliver_atomically, DeliveryReceipt, RemoteFileSystem, TransferAgent,
};
use rowship::core::export::{RunController, RunOptions};
use rowship::core::state::{CheckpointRead, CheckpointStore, StateManager};
use rowship::domain::{
    DataSourceError, Field, Page, Result, Row, RowId, RowshipError, TransferError,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Append-only table held in memory
pub struct MemoryRowSource {
    rows: Mutex<Vec<Row>>,
    calls: Mutex<Vec<(u64, usize)>>,
    fail_on_call: Mutex<Option<usize>>,
    closed: AtomicUsize,
}

impl MemoryRowSource {
    pub fn with_ids(ids: impl IntoIterator<Item = u64>) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(ids.into_iter().map(sample_row).collect()),
            calls: Mutex::new(Vec::new()),
            fail_on_call: Mutex::new(None),
            closed: AtomicUsize::new(0),
        })
    }

    /// Append rows, as new inserts between runs would
    pub fn append(&self, ids: impl IntoIterator<Item = u64>) {
        self.rows
            .lock()
            .unwrap()
            .extend(ids.into_iter().map(sample_row));
    }

    /// Make the `n`th `next_page` call (1-based, counted from now) fail
    pub fn fail_on_call(&self, n: usize) {
        let already = self.calls.lock().unwrap().len();
        *self.fail_on_call.lock().unwrap() = Some(already + n);
    }

    pub fn calls(&self) -> Vec<(u64, usize)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
        *self.fail_on_call.lock().unwrap() = None;
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RowSource for MemoryRowSource {
    async fn next_page(&self, lower_bound: RowId, limit: usize) -> Result<Page> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((lower_bound.value(), limit));
            calls.len()
        };

        if *self.fail_on_call.lock().unwrap() == Some(call_number) {
            return Err(DataSourceError::ConnectionFailed("connection reset".to_string()).into());
        }

        let rows = self.rows.lock().unwrap();
        Ok(Page::new(
            rows.iter()
                .filter(|r| r.id > lower_bound)
                .take(limit)
                .cloned()
                .collect(),
        ))
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "memory://timeline".to_string()
    }

    async fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Row with a timestamp, a note that needs quoting and a NULL column
pub fn sample_row(id: u64) -> Row {
    let note = match id % 3 {
        0 => format!("note, {id}"),
        1 => format!("said \"hi\" {id}"),
        _ => format!("line\nbreak {id}"),
    };
    Row::new(
        RowId::new(id),
        vec![
            Field::new("id", Some(id.to_string())),
            Field::new("created_at", Some(format!("2025-01-01 00:00:{:02}", id % 60))),
            Field::new("note", Some(note)),
            Field::new("deleted_at", None),
        ],
    )
}

/// A local directory standing in for the SFTP server
pub struct DirectoryFs {
    root: PathBuf,
    fail_uploads: bool,
}

impl DirectoryFs {
    fn local(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl RemoteFileSystem for DirectoryFs {
    fn dir_exists(&mut self, path: &str) -> Result<bool> {
        Ok(self.local(path).is_dir())
    }

    fn create_dir(&mut self, path: &str) -> Result<()> {
        std::fs::create_dir(self.local(path))
            .map_err(|e| TransferError::PermissionDenied(e.to_string()).into())
    }

    fn upload(&mut self, source: &mut dyn Read, path: &str) -> Result<u64> {
        let mut data = Vec::new();
        source
            .read_to_end(&mut data)
            .map_err(|e| TransferError::LocalIo(e.to_string()))?;
        if self.fail_uploads {
            std::fs::write(self.local(path), &data[..data.len() / 2])?;
            return Err(TransferError::RemoteDiskFull(path.to_string()).into());
        }
        std::fs::write(self.local(path), &data)
            .map_err(|e| TransferError::UploadFailed(e.to_string()))?;
        Ok(data.len() as u64)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        std::fs::rename(self.local(from), self.local(to))
            .map_err(|e| TransferError::RenameFailed(e.to_string()).into())
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        std::fs::remove_file(self.local(path))?;
        Ok(())
    }
}

/// Delivers into a local "remote" root through the atomic delivery protocol
pub struct DirectoryTransferAgent {
    root: PathBuf,
    create_missing: bool,
    fail_uploads: AtomicBool,
    deliveries: AtomicUsize,
}

impl DirectoryTransferAgent {
    pub fn new(root: &Path) -> Arc<Self> {
        Arc::new(Self {
            root: root.to_path_buf(),
            create_missing: true,
            fail_uploads: AtomicBool::new(false),
            deliveries: AtomicUsize::new(0),
        })
    }

    pub fn strict(root: &Path) -> Arc<Self> {
        Arc::new(Self {
            root: root.to_path_buf(),
            create_missing: false,
            fail_uploads: AtomicBool::new(false),
            deliveries: AtomicUsize::new(0),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_uploads.store(failing, Ordering::SeqCst);
    }

    /// Successful deliveries so far
    pub fn deliveries(&self) -> usize {
        self.deliveries.load(Ordering::SeqCst)
    }

    /// Local path of a delivered remote file
    pub fn remote_file(&self, remote_path: &str) -> PathBuf {
        self.root.join(remote_path.trim_start_matches('/'))
    }

    /// Names of every file under a remote directory, sorted
    pub fn listing(&self, remote_dir: &str) -> Vec<String> {
        let dir = self.root.join(remote_dir.trim_start_matches('/'));
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

#[async_trait]
impl TransferAgent for DirectoryTransferAgent {
    async fn deliver(&self, local_file: &Path, remote_dir: &str) -> Result<DeliveryReceipt> {
        let mut fs = DirectoryFs {
            root: self.root.clone(),
            fail_uploads: self.fail_uploads.load(Ordering::SeqCst),
        };
        let receipt = deliver_atomically(&mut fs, local_file, remote_dir, self.create_missing)?;
        self.deliveries.fetch_add(1, Ordering::SeqCst);
        Ok(receipt)
    }

    fn describe(&self) -> String {
        format!("dir://{}", self.root.display())
    }
}

/// Checkpoint kept in memory, with an optional write failure
#[derive(Default)]
pub struct MemoryCheckpointStore {
    value: Mutex<Option<RowId>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryCheckpointStore {
    pub fn starting_at(value: Option<u64>) -> Arc<Self> {
        Arc::new(Self {
            value: Mutex::new(value.map(RowId::new)),
            ..Self::default()
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    pub fn current(&self) -> Option<u64> {
        self.value.lock().unwrap().map(RowId::value)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self) -> CheckpointRead {
        match *self.value.lock().unwrap() {
            Some(id) => CheckpointRead::Found(id),
            None => CheckpointRead::Missing,
        }
    }

    async fn write(&self, value: RowId) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RowshipError::CheckpointWrite("disk full".to_string()));
        }
        *self.value.lock().unwrap() = Some(value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

pub const REMOTE_DIR: &str = "/data/backups";

/// Run options writing into `work_dir`
pub fn options(work_dir: &Path, batch_size: usize) -> RunOptions {
    RunOptions {
        work_dir: work_dir.to_path_buf(),
        remote_dir: REMOTE_DIR.to_string(),
        batch_size,
        artifact_prefix: "timeline".to_string(),
        keep_artifacts: true,
        dry_run: false,
    }
}

pub fn controller(
    options: RunOptions,
    source: &Arc<MemoryRowSource>,
    transfer: &Arc<DirectoryTransferAgent>,
    store: &Arc<MemoryCheckpointStore>,
) -> RunController {
    RunController::new(
        options,
        source.clone(),
        transfer.clone(),
        StateManager::new_with_store(store.clone()),
    )
}

/// CSV files present in a local directory, sorted
pub fn csv_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

/// Ids of the data records of a CSV artifact, in file order
pub fn artifact_ids(bytes: &[u8]) -> Vec<u64> {
    let mut reader = csv::Reader::from_reader(bytes);
    reader
        .records()
        .map(|r| r.unwrap()[0].parse::<u64>().unwrap())
        .collect()
}

/// Everything after the header line
pub fn body(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|p| p + 2)
        .unwrap_or(bytes.len());
    &bytes[end..]
}
