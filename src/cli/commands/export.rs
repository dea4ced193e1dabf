//! Export command implementation
//!
//! This module implements the `export` command: one checkpointed run that
//! exports new rows to CSV and delivers the file over SFTP.

use crate::config::load_unvalidated;
use crate::config::schema::MAX_BATCH_SIZE;
use crate::core::export::{RunController, RunState, RunSummary};
use crate::log_error_with_context;
use clap::Args;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Export the artifact but skip transfer and checkpoint update
    #[arg(long)]
    pub dry_run: bool,

    /// Override the number of rows fetched per page
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: Option<&str>,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let mut config = match load_unvalidated(config_path) {
            Ok(c) => c,
            Err(e) => {
                log_error_with_context!(&e, "Failed to load configuration");
                eprintln!("❌ {e}");
                return Ok(e.exit_code());
            }
        };

        // Apply CLI overrides
        if let Some(batch_size) = self.batch_size {
            tracing::info!(batch_size, "Overriding batch size from CLI");
            config.export.batch_size = batch_size;
        }

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.export.dry_run = true;
        }

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("❌ Configuration validation failed: {e}");
            if self.batch_size.is_some_and(|b| b == 0 || b > MAX_BATCH_SIZE) {
                eprintln!("   --batch-size must be between 1 and {MAX_BATCH_SIZE}");
            }
            return Ok(2);
        }

        if config.export.dry_run {
            println!("🔍 DRY RUN MODE - the artifact will not be transferred");
            println!();
        }

        let controller = match RunController::from_config(&config).await {
            Ok(c) => c.with_shutdown(shutdown_signal),
            Err(e) => {
                log_error_with_context!(&e, "Failed to initialize export");
                eprintln!("❌ Failed to initialize export: {e}");
                return Ok(e.exit_code());
            }
        };

        match controller.execute_run().await {
            Ok(summary) => {
                print_summary(&summary);
                Ok(0)
            }
            Err(e) => {
                eprintln!("❌ Export failed: {e}");
                if e.retains_artifact() {
                    eprintln!(
                        "   Local artifacts are kept in {}",
                        config.export.work_dir
                    );
                }
                if e.exit_code() == 130 {
                    eprintln!("   The checkpoint was not changed; the next run starts from the same row.");
                }
                Ok(e.exit_code())
            }
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("📊 Export Summary:");
    println!("  Run: {}", summary.run_id);
    println!("  Rows Exported: {}", summary.rows_exported);
    println!("  Pages: {}", summary.pages);
    println!(
        "  Checkpoint: {} -> {}",
        summary.checkpoint_before, summary.checkpoint_after
    );
    if let Some(artifact) = &summary.artifact {
        let note = if summary.artifact_removed {
            " (removed)"
        } else {
            ""
        };
        println!("  Artifact: {}{}", artifact.display(), note);
    }
    if let Some(receipt) = &summary.receipt {
        println!("  Delivered: {} ({} bytes)", receipt.remote_path, receipt.bytes);
        println!("  SHA-256: {}", receipt.sha256);
    }
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();

    match summary.state {
        RunState::DoneEmpty => println!("✅ No new rows since the last checkpoint"),
        _ if summary.dry_run => println!("✅ Dry run completed, nothing was transferred"),
        _ => println!("✅ Export completed successfully!"),
    }
}
