//! Run summary and reporting
//!
//! This module defines the run state machine and the record of what a run
//! did.

use crate::adapters::transfer::DeliveryReceipt;
use crate::domain::RowId;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Stage of a run
///
/// Runs move strictly forward through
/// `Start → LoadingCheckpoint → Exporting → Transferring →
/// AdvancingCheckpoint → Done`, leaving early for `DoneEmpty` (no new rows)
/// or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Start,
    LoadingCheckpoint,
    Exporting,
    DoneEmpty,
    Transferring,
    AdvancingCheckpoint,
    Done,
    Failed,
}

impl RunState {
    /// Whether `next` is a legal successor of this state
    pub fn can_advance_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Start, LoadingCheckpoint)
                | (LoadingCheckpoint, Exporting)
                | (Exporting, DoneEmpty)
                | (Exporting, Transferring)
                | (Exporting, Done)
                | (Transferring, AdvancingCheckpoint)
                | (AdvancingCheckpoint, Done)
        ) || (next == Failed && !self.is_terminal())
    }

    /// Whether the run has ended
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::DoneEmpty | RunState::Done | RunState::Failed)
    }

    /// Lower-case name used in logs
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Start => "start",
            RunState::LoadingCheckpoint => "loading_checkpoint",
            RunState::Exporting => "exporting",
            RunState::DoneEmpty => "done_empty",
            RunState::Transferring => "transferring",
            RunState::AdvancingCheckpoint => "advancing_checkpoint",
            RunState::Done => "done",
            RunState::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Correlation id carried by every log line of the run
    pub run_id: Uuid,

    /// Final (or current) state
    pub state: RunState,

    /// Checkpoint the run started from
    pub checkpoint_before: RowId,

    /// Checkpoint after the run
    pub checkpoint_after: RowId,

    /// Rows written to the artifact
    pub rows_exported: u64,

    /// Non-empty pages fetched
    pub pages: usize,

    /// Local artifact, if one was written
    pub artifact: Option<PathBuf>,

    /// Whether the local artifact was deleted after delivery
    pub artifact_removed: bool,

    /// Delivery details, if the artifact was delivered
    pub receipt: Option<DeliveryReceipt>,

    /// Transfer and checkpoint were skipped
    pub dry_run: bool,

    /// Wall-clock duration
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl RunSummary {
    /// Create a summary for a run that has not started yet
    pub fn new(run_id: Uuid, dry_run: bool) -> Self {
        Self {
            run_id,
            state: RunState::Start,
            checkpoint_before: RowId::ZERO,
            checkpoint_after: RowId::ZERO,
            rows_exported: 0,
            pages: 0,
            artifact: None,
            artifact_removed: false,
            receipt: None,
            dry_run,
            duration: Duration::ZERO,
        }
    }

    /// Move to `next`, logging the transition
    pub fn transition(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal run transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(from = %self.state, to = %next, "Run state transition");
        self.state = next;
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Check if the run ended successfully
    pub fn is_successful(&self) -> bool {
        matches!(self.state, RunState::Done | RunState::DoneEmpty)
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            state = %self.state,
            rows_exported = self.rows_exported,
            pages = self.pages,
            checkpoint_before = %self.checkpoint_before,
            checkpoint_after = %self.checkpoint_after,
            artifact = ?self.artifact,
            remote_path = ?self.receipt.as_ref().map(|r| r.remote_path.as_str()),
            dry_run = self.dry_run,
            duration_secs = self.duration.as_secs_f64(),
            "Run completed"
        );
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_summary_creation() {
        let summary = RunSummary::new(Uuid::new_v4(), false);

        assert_eq!(summary.state, RunState::Start);
        assert_eq!(summary.rows_exported, 0);
        assert_eq!(summary.checkpoint_before, RowId::ZERO);
        assert!(summary.artifact.is_none());
        assert!(summary.receipt.is_none());
        assert!(!summary.is_successful());
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut summary = RunSummary::new(Uuid::new_v4(), false);
        for next in [
            RunState::LoadingCheckpoint,
            RunState::Exporting,
            RunState::Transferring,
            RunState::AdvancingCheckpoint,
            RunState::Done,
        ] {
            summary.transition(next);
        }
        assert!(summary.is_successful());
        assert!(summary.state.is_terminal());
    }

    #[test]
    fn test_no_branching_back() {
        assert!(!RunState::Transferring.can_advance_to(RunState::Exporting));
        assert!(!RunState::Done.can_advance_to(RunState::Failed));
        assert!(!RunState::Start.can_advance_to(RunState::Transferring));
        assert!(RunState::Exporting.can_advance_to(RunState::DoneEmpty));
        assert!(RunState::AdvancingCheckpoint.can_advance_to(RunState::Failed));
    }

    #[test]
    fn test_summary_serializes() {
        let summary =
            RunSummary::new(Uuid::nil(), true).with_duration(Duration::from_millis(1500));
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["state"], "start");
        assert_eq!(json["duration"], 1.5);
        assert_eq!(json["dry_run"], true);
        assert_eq!(json["checkpoint_before"], 0);
    }
}
