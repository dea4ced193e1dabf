//! Run controller - orchestrates one checkpointed export run
//!
//! A run loads the checkpoint, exports every newer row into a local CSV
//! artifact, delivers the artifact and only then advances the checkpoint.
//! Any failure stops the run without touching the checkpoint, except a
//! failure to persist the new checkpoint itself, which happens after the
//! artifact was delivered.

use crate::adapters::database::create_row_source;
use crate::adapters::database::traits::RowSource;
use crate::adapters::transfer::{SftpTransferAgent, TransferAgent};
use crate::config::RowshipConfig;
use crate::core::export::artifact::{artifact_file_name, LocalArtifact};
use crate::core::export::exporter::Exporter;
use crate::core::export::summary::{RunState, RunSummary};
use crate::core::state::{FileCheckpointStore, StateManager};
use crate::domain::{Result, RowshipError};
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::Instrument;
use uuid::Uuid;

/// Per-run settings taken from configuration
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory holding artifacts and the checkpoint
    pub work_dir: PathBuf,

    /// Remote directory receiving artifacts
    pub remote_dir: String,

    /// Rows per page
    pub batch_size: usize,

    /// Artifact file name prefix
    pub artifact_prefix: String,

    /// Keep the local artifact after a successful delivery
    pub keep_artifacts: bool,

    /// Export only
    pub dry_run: bool,
}

impl RunOptions {
    /// Extract run settings from a validated configuration
    pub fn from_config(config: &RowshipConfig) -> Self {
        Self {
            work_dir: PathBuf::from(&config.export.work_dir),
            remote_dir: config.transfer.remote_dir.clone(),
            batch_size: config.export.batch_size,
            artifact_prefix: config.artifact_prefix(),
            keep_artifacts: config.export.keep_artifacts,
            dry_run: config.export.dry_run,
        }
    }
}

/// Run controller
pub struct RunController {
    options: RunOptions,
    source: Arc<dyn RowSource>,
    transfer: Arc<dyn TransferAgent>,
    state_manager: StateManager,
    shutdown: Option<watch::Receiver<bool>>,
}

impl RunController {
    /// Create a controller from explicit collaborators
    pub fn new(
        options: RunOptions,
        source: Arc<dyn RowSource>,
        transfer: Arc<dyn TransferAgent>,
        state_manager: StateManager,
    ) -> Self {
        Self {
            options,
            source,
            transfer,
            state_manager,
            shutdown: None,
        }
    }

    /// Create a controller wired to PostgreSQL, SFTP and the checkpoint file
    ///
    /// # Errors
    ///
    /// Returns an error if the row source cannot be built.
    pub async fn from_config(config: &RowshipConfig) -> Result<Self> {
        let source = create_row_source(&config.database).await?;
        let transfer: Arc<dyn TransferAgent> = Arc::new(SftpTransferAgent::new(&config.transfer));
        let store = Arc::new(FileCheckpointStore::new(config.checkpoint_path()));

        Ok(Self::new(
            RunOptions::from_config(config),
            source,
            transfer,
            StateManager::new_with_store(store),
        ))
    }

    /// Stop between pages once `shutdown` flips to `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Execute one run
    ///
    /// Returns the summary of a run that ended in `Done` or `DoneEmpty`.
    /// The row source is closed on every exit path.
    ///
    /// # Errors
    ///
    /// Returns the error that moved the run to `Failed`. A data-source,
    /// export or interruption error discards the partial artifact; a
    /// transfer or checkpoint-write error keeps it.
    pub async fn execute_run(&self) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", run_id = %run_id);

        async move {
            let started = Instant::now();
            let mut summary = RunSummary::new(run_id, self.options.dry_run);

            tracing::info!(
                source = %self.source.describe(),
                destination = %self.transfer.describe(),
                batch_size = self.options.batch_size,
                dry_run = self.options.dry_run,
                "Starting run"
            );

            let result = self.drive(&mut summary).await;
            self.source.close().await;

            let mut summary = summary.with_duration(started.elapsed());
            match result {
                Ok(()) => {
                    summary.log_summary();
                    Ok(summary)
                }
                Err(e) => {
                    let failed_in = summary.state;
                    summary.transition(RunState::Failed);
                    tracing::error!(
                        failed_in = %failed_in,
                        rows_exported = summary.rows_exported,
                        checkpoint = %summary.checkpoint_after,
                        exit_code = e.exit_code(),
                        error = %e,
                        "Run failed"
                    );
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, summary: &mut RunSummary) -> Result<()> {
        let started_at = Local::now();

        summary.transition(RunState::LoadingCheckpoint);
        tokio::fs::create_dir_all(&self.options.work_dir)
            .await
            .map_err(|e| {
                RowshipError::Io(format!(
                    "Cannot create work directory {}: {}",
                    self.options.work_dir.display(),
                    e
                ))
            })?;
        let checkpoint = self.state_manager.load_checkpoint().await;
        summary.checkpoint_before = checkpoint;
        summary.checkpoint_after = checkpoint;

        summary.transition(RunState::Exporting);
        let artifact_path = self.options.work_dir.join(artifact_file_name(
            &self.options.artifact_prefix,
            started_at.naive_local(),
        ));
        let mut artifact = LocalArtifact::new(&artifact_path);
        let exporter = Exporter::new(self.source.clone(), self.options.batch_size)
            .with_shutdown(self.shutdown.clone());

        let outcome = match exporter.export(checkpoint, &mut artifact).await {
            Ok(outcome) => outcome,
            Err(e) => {
                artifact.discard().await;
                return Err(e);
            }
        };
        summary.rows_exported = outcome.rows_exported;
        summary.pages = outcome.pages;

        let Some(info) = artifact.finish().await? else {
            tracing::info!(checkpoint = %checkpoint, "No new rows since checkpoint");
            summary.transition(RunState::DoneEmpty);
            return Ok(());
        };
        summary.artifact = Some(info.path.clone());

        tracing::info!(
            path = %info.path.display(),
            rows = info.rows,
            bytes = info.bytes,
            "Artifact written"
        );

        if self.options.dry_run {
            tracing::info!(
                path = %info.path.display(),
                "Dry run: skipping transfer and checkpoint update"
            );
            summary.transition(RunState::Done);
            return Ok(());
        }

        summary.transition(RunState::Transferring);
        let receipt = match self
            .transfer
            .deliver(&info.path, &self.options.remote_dir)
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(
                    path = %info.path.display(),
                    "Local artifact retained for a later delivery"
                );
                return Err(e);
            }
        };

        tracing::info!(
            remote_path = %receipt.remote_path,
            bytes = receipt.bytes,
            sha256 = %receipt.sha256,
            "Artifact delivered"
        );
        summary.receipt = Some(receipt);

        summary.transition(RunState::AdvancingCheckpoint);
        if let Err(e) = self
            .state_manager
            .advance_checkpoint(checkpoint, outcome.highest_id)
            .await
        {
            tracing::error!(
                path = %info.path.display(),
                delivered_through = %outcome.highest_id,
                "Artifact was delivered but the checkpoint was not recorded; the next run will deliver these rows again"
            );
            return Err(e);
        }
        summary.checkpoint_after = outcome.highest_id;
        summary.transition(RunState::Done);

        if !self.options.keep_artifacts {
            match tokio::fs::remove_file(&info.path).await {
                Ok(()) => {
                    summary.artifact_removed = true;
                    tracing::debug!(path = %info.path.display(), "Local artifact removed");
                }
                Err(e) => tracing::warn!(
                    path = %info.path.display(),
                    error = %e,
                    "Could not remove delivered artifact"
                ),
            }
        }

        Ok(())
    }
}
