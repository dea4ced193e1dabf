//! State manager for checkpoint persistence
//!
//! This module provides the StateManager for loading and advancing the
//! export checkpoint through a [`CheckpointStore`] backend.

use crate::core::state::checkpoint::{CheckpointRead, CheckpointStore};
use crate::domain::{Result, RowId, RowshipError};
use std::sync::Arc;

/// State manager for checkpoint persistence
///
/// The checkpoint only moves forward: once a run has loaded a value, the
/// manager refuses to persist anything lower.
#[derive(Clone)]
pub struct StateManager {
    /// Checkpoint storage backend
    store: Arc<dyn CheckpointStore>,
}

impl StateManager {
    /// Create a new StateManager with a checkpoint storage backend
    ///
    /// # Arguments
    ///
    /// * `store` - Checkpoint storage implementation
    pub fn new_with_store(store: Arc<dyn CheckpointStore>) -> Self {
        Self { store }
    }

    /// Load the checkpoint a run starts from
    ///
    /// Never fails: a missing or corrupt checkpoint yields 0.
    pub async fn load_checkpoint(&self) -> RowId {
        let checkpoint = self.store.read().await;
        tracing::info!(
            checkpoint = %checkpoint,
            location = %self.store.location(),
            "Loaded checkpoint"
        );
        checkpoint
    }

    /// Inspect the persisted checkpoint without logging recovery warnings
    pub async fn inspect(&self) -> CheckpointRead {
        self.store.load().await
    }

    /// Advance the checkpoint from `current` to `highest_delivered`
    ///
    /// Only called after the artifact holding every row up to
    /// `highest_delivered` has been delivered. Advancing to the same value is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RowshipError::CheckpointWrite`] if `highest_delivered` is
    /// lower than `current` or the store fails to persist it.
    pub async fn advance_checkpoint(&self, current: RowId, highest_delivered: RowId) -> Result<()> {
        if highest_delivered < current {
            return Err(RowshipError::CheckpointWrite(format!(
                "Refusing to move checkpoint backwards from {current} to {highest_delivered}"
            )));
        }

        if highest_delivered == current {
            tracing::debug!(checkpoint = %current, "Checkpoint unchanged");
            return Ok(());
        }

        self.store.write(highest_delivered).await?;

        tracing::info!(
            previous = %current,
            checkpoint = %highest_delivered,
            location = %self.store.location(),
            "Checkpoint advanced"
        );

        Ok(())
    }

    /// Where the checkpoint is stored
    pub fn location(&self) -> String {
        self.store.location()
    }
}
