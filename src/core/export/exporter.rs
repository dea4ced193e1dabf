//! Page-driven export loop
//!
//! The exporter pulls pages from a [`RowSource`] starting after the
//! checkpoint, feeds each one to a [`PageSink`] and tracks how far it got.

use crate::adapters::database::traits::RowSource;
use crate::core::export::artifact::PageSink;
use crate::domain::{DataSourceError, Result, RowId, RowshipError};
use std::sync::Arc;
use tokio::sync::watch;

/// What a finished export produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Rows written to the artifact
    pub rows_exported: u64,

    /// Identifier of the last row written, or the starting checkpoint when
    /// nothing was written
    pub highest_id: RowId,

    /// Non-empty pages fetched
    pub pages: usize,
}

impl RunOutcome {
    /// Whether the export found no new rows
    pub fn is_empty(&self) -> bool {
        self.rows_exported == 0
    }
}

/// Drives keyset pagination into a sink
pub struct Exporter {
    source: Arc<dyn RowSource>,
    batch_size: usize,
    shutdown: Option<watch::Receiver<bool>>,
}

impl Exporter {
    /// Create an exporter reading `batch_size` rows per page
    pub fn new(source: Arc<dyn RowSource>, batch_size: usize) -> Self {
        Self {
            source,
            batch_size,
            shutdown: None,
        }
    }

    /// Stop between pages once `shutdown` flips to `true`
    pub fn with_shutdown(mut self, shutdown: Option<watch::Receiver<bool>>) -> Self {
        self.shutdown = shutdown;
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Export every row after `checkpoint`
    ///
    /// Each page is checked against the pagination contract before it is
    /// written. The sink is left open; closing it is up to the caller.
    ///
    /// # Errors
    ///
    /// Returns the source's error, a contract violation, the sink's error,
    /// or [`RowshipError::Interrupted`] when shutdown was requested.
    pub async fn export(&self, checkpoint: RowId, sink: &mut dyn PageSink) -> Result<RunOutcome> {
        if self.batch_size == 0 {
            return Err(RowshipError::Validation(
                "batch size must be positive".to_string(),
            ));
        }

        let mut cursor = checkpoint;
        let mut total: u64 = 0;
        let mut pages: usize = 0;

        loop {
            if self.is_shutdown_requested() {
                tracing::warn!(
                    cursor = %cursor,
                    rows_exported = total,
                    "Shutdown requested, stopping export between pages"
                );
                return Err(RowshipError::Interrupted(format!(
                    "stopped after {total} rows; checkpoint left at {checkpoint}"
                )));
            }

            let page = self.source.next_page(cursor, self.batch_size).await?;
            let Some(last_id) = page.last_id() else {
                break;
            };

            page.check_contract(cursor, self.batch_size)
                .map_err(DataSourceError::ContractViolation)?;

            sink.write_page(&page).await?;

            cursor = last_id;
            total += page.len() as u64;
            pages += 1;

            tracing::debug!(
                page = pages,
                rows = page.len(),
                cursor = %cursor,
                total = total,
                "Page exported"
            );
        }

        tracing::info!(
            rows_exported = total,
            pages = pages,
            highest_id = %cursor,
            "Export finished"
        );

        Ok(RunOutcome {
            rows_exported: total,
            highest_id: cursor,
            pages,
        })
    }
}
