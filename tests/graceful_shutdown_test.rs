//! Integration tests for graceful shutdown functionality
//!
//! These tests verify that:
//! - Shutdown signals are properly handled
//! - An interrupted run leaves the checkpoint untouched
//! - No partial artifact survives an interruption
//! - The next run starts from where the interrupted one did

mod common;

use async_trait::async_trait;
use common::*;
use rowship::adapters::database::RowSource;
use rowship::core::export::RunController;
use rowship::core::state::StateManager;
use rowship::domain::{Page, Result, RowId, RowshipError};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::watch;

#[tokio::test]
async fn test_shutdown_signal_propagation() {
    let (shutdown_tx, shutdown_rx1) = watch::channel(false);
    let shutdown_rx2 = shutdown_rx1.clone();

    assert!(!*shutdown_rx1.borrow());
    assert!(!*shutdown_rx2.borrow());

    shutdown_tx.send(true).unwrap();

    assert!(*shutdown_rx1.borrow());
    assert!(*shutdown_rx2.borrow());
}

#[tokio::test]
async fn test_signal_before_run_exports_nothing() {
    let work = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let source = MemoryRowSource::with_ids(1..=50);
    let transfer = DirectoryTransferAgent::new(remote.path());
    let store = MemoryCheckpointStore::starting_at(Some(10));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    shutdown_tx.send(true).unwrap();

    let err = controller(options(work.path(), 10), &source, &transfer, &store)
        .with_shutdown(shutdown_rx)
        .execute_run()
        .await
        .unwrap_err();

    assert!(matches!(err, RowshipError::Interrupted(_)));
    assert_eq!(err.exit_code(), 130);
    assert!(!err.retains_artifact());
    assert!(source.calls().is_empty());
    assert_eq!(source.close_count(), 1);
    assert_eq!(store.current(), Some(10));
    assert!(csv_files(work.path()).is_empty());
}

/// Source that raises the shutdown flag while serving its second page
struct InterruptingSource {
    inner: Arc<MemoryRowSource>,
    shutdown_tx: watch::Sender<bool>,
    served: std::sync::atomic::AtomicUsize,
}

#[async_trait]
impl RowSource for InterruptingSource {
    async fn next_page(&self, lower_bound: RowId, limit: usize) -> Result<Page> {
        let served = self
            .served
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if served == 1 {
            let _ = self.shutdown_tx.send(true);
        }
        self.inner.next_page(lower_bound, limit).await
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "interrupting".to_string()
    }
}

#[tokio::test]
async fn test_signal_mid_run_discards_artifact_and_resumes() {
    let work = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let rows = MemoryRowSource::with_ids(1..=30);
    let transfer = DirectoryTransferAgent::new(remote.path());
    let store = MemoryCheckpointStore::starting_at(None);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let source = Arc::new(InterruptingSource {
        inner: rows.clone(),
        shutdown_tx,
        served: std::sync::atomic::AtomicUsize::new(0),
    });

    let interrupted_dir = work.path().join("interrupted");
    let err = RunController::new(
        options(&interrupted_dir, 10),
        source,
        transfer.clone(),
        StateManager::new_with_store(store.clone()),
    )
    .with_shutdown(shutdown_rx)
    .execute_run()
    .await
    .unwrap_err();

    // Two pages were fetched, the third never requested
    assert!(matches!(err, RowshipError::Interrupted(_)));
    assert_eq!(rows.calls(), vec![(0, 10), (10, 10)]);
    assert!(csv_files(&interrupted_dir).is_empty());
    assert_eq!(transfer.deliveries(), 0);
    assert_eq!(store.current(), None);

    // A fresh run picks up from the unchanged checkpoint
    rows.clear_calls();
    let summary = controller(options(&work.path().join("resumed"), 10), &rows, &transfer, &store)
        .execute_run()
        .await
        .unwrap();

    assert_eq!(summary.checkpoint_before.value(), 0);
    assert_eq!(summary.rows_exported, 30);
    assert_eq!(store.current(), Some(30));
}
