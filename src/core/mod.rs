//! Core business logic for rowship.
//!
//! # Modules
//!
//! - [`export`] - Artifact writing, the export loop and run control
//! - [`state`] - Checkpoint persistence for incremental exports
//!
//! # Run Workflow
//!
//! 1. **Load Checkpoint**: read the last delivered row id (0 if none)
//! 2. **Export**: page rows with a greater id into a local CSV artifact
//! 3. **Transfer**: deliver the artifact to the remote directory
//! 4. **Advance**: persist the highest delivered id as the new checkpoint
//!
//! A run that finds no new rows stops after step 2 without creating a file.
//!
//! # Example
//!
//! ```rust,no_run
//! use rowship::config::load_config;
//! use rowship::core::export::RunController;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config(Some("rowship.toml"))?;
//!
//! // Create shutdown signal
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let controller = RunController::from_config(&config)
//!     .await?
//!     .with_shutdown(shutdown_rx);
//!
//! let summary = controller.execute_run().await?;
//! println!("Exported {} rows", summary.rows_exported);
//! # Ok(())
//! # }
//! ```

pub mod export;
pub mod state;
