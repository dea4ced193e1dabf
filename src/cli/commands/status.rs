//! Status command implementation
//!
//! This module implements the `status` command for displaying the current
//! checkpoint and the artifacts retained in the work directory.

use crate::config::{load_config, RowshipConfig};
use crate::core::state::{CheckpointRead, FileCheckpointStore, StateManager};
use chrono::{DateTime, Local};
use clap::Args;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the status as JSON
    #[arg(long)]
    pub json: bool,
}

/// Snapshot of the local export state
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub checkpoint: u64,
    pub checkpoint_state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_problem: Option<String>,
    pub checkpoint_file: String,
    pub work_dir: String,
    pub artifacts: Vec<RetainedArtifact>,
}

/// A local CSV artifact still present in the work directory
#[derive(Debug, Serialize)]
pub struct RetainedArtifact {
    pub name: String,
    pub bytes: u64,
    pub modified: Option<DateTime<Local>>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: Option<&str>) -> anyhow::Result<i32> {
        tracing::info!("Checking export status");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ Failed to load configuration");
                eprintln!("   Error: {e}");
                return Ok(2);
            }
        };

        let report = collect_status(&config).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(0);
        }

        println!("📊 Export Status");
        println!();
        println!("  Work directory: {}", report.work_dir);
        println!("  Checkpoint file: {}", report.checkpoint_file);
        match report.checkpoint_state {
            "found" => println!("  Checkpoint: {}", report.checkpoint),
            "missing" => println!("  Checkpoint: none (next run exports from the beginning)"),
            _ => println!(
                "  Checkpoint: unreadable ({}), next run exports from the beginning",
                report.checkpoint_problem.as_deref().unwrap_or("unknown")
            ),
        }
        println!();

        if report.artifacts.is_empty() {
            println!("No local artifacts retained.");
            return Ok(0);
        }

        println!("Retained artifacts ({}):", report.artifacts.len());
        println!("{:<45} {:>14} {:<20}", "File", "Bytes", "Modified");
        println!("{}", "-".repeat(81));
        for artifact in &report.artifacts {
            let modified = artifact
                .modified
                .map(|m| m.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<45} {:>14} {:<20}",
                artifact.name, artifact.bytes, modified
            );
        }
        println!();

        Ok(0)
    }
}

/// Gather the checkpoint and retained artifacts for `config`
///
/// # Errors
///
/// Returns an error if the work directory exists but cannot be listed.
pub async fn collect_status(config: &RowshipConfig) -> anyhow::Result<StatusReport> {
    let checkpoint_path = config.checkpoint_path();
    let state_manager =
        StateManager::new_with_store(Arc::new(FileCheckpointStore::new(&checkpoint_path)));

    let read = state_manager.inspect().await;
    let (checkpoint_state, checkpoint_problem) = match &read {
        CheckpointRead::Missing => ("missing", None),
        CheckpointRead::Found(_) => ("found", None),
        CheckpointRead::Corrupt(reason) => ("corrupt", Some(reason.clone())),
    };

    let artifacts = list_artifacts(Path::new(&config.export.work_dir), &config.artifact_prefix())
        .await?;

    Ok(StatusReport {
        checkpoint: read.value().value(),
        checkpoint_state,
        checkpoint_problem,
        checkpoint_file: checkpoint_path.display().to_string(),
        work_dir: config.export.work_dir.clone(),
        artifacts,
    })
}

async fn list_artifacts(work_dir: &Path, prefix: &str) -> anyhow::Result<Vec<RetainedArtifact>> {
    let mut entries = match tokio::fs::read_dir(work_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let name_start = format!("{prefix}_");
    let mut artifacts = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(&name_start) || !name.ends_with(".csv") {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        artifacts.push(RetainedArtifact {
            name,
            bytes: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Local>::from),
        });
    }

    artifacts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportConfig;

    fn config_for(work_dir: &Path) -> RowshipConfig {
        let mut config = RowshipConfig::default();
        config.database.table = "crm.timeline".to_string();
        config.export = ExportConfig {
            work_dir: work_dir.display().to_string(),
            ..ExportConfig::default()
        };
        config
    }

    #[tokio::test]
    async fn test_status_of_fresh_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&dir.path().join("missing"));

        let report = collect_status(&config).await.unwrap();
        assert_eq!(report.checkpoint, 0);
        assert_eq!(report.checkpoint_state, "missing");
        assert!(report.artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_status_lists_matching_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("last_id.txt"), "12500").unwrap();
        std::fs::write(dir.path().join("timeline_20250102_030405.csv"), "id\r\n1\r\n").unwrap();
        std::fs::write(dir.path().join("timeline_20250101_030405.csv"), "id\r\n").unwrap();
        std::fs::write(dir.path().join("other_20250101_030405.csv"), "id\r\n").unwrap();
        std::fs::write(dir.path().join("timeline_notes.txt"), "x").unwrap();

        let report = collect_status(&config_for(dir.path())).await.unwrap();
        assert_eq!(report.checkpoint, 12500);
        assert_eq!(report.checkpoint_state, "found");

        let names: Vec<_> = report.artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["timeline_20250101_030405.csv", "timeline_20250102_030405.csv"]
        );
        assert_eq!(report.artifacts[1].bytes, 8);
    }

    #[tokio::test]
    async fn test_status_reports_corrupt_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("last_id.txt"), "not-a-number").unwrap();

        let report = collect_status(&config_for(dir.path())).await.unwrap();
        assert_eq!(report.checkpoint, 0);
        assert_eq!(report.checkpoint_state, "corrupt");
        assert!(report.checkpoint_problem.is_some());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["checkpoint_state"], "corrupt");
    }
}
