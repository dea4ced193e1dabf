// Rowship - incremental CSV export over SFTP
// Copyright (c) 2025 Rowship Contributors
// Licensed under the MIT License

//! # rowship - incremental CSV export over SFTP
//!
//! rowship exports the rows appended to a table since the previous run into
//! a CSV file, delivers that file to a remote directory over SFTP and then
//! records the highest delivered row id as a checkpoint.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Paging** rows out of PostgreSQL or MySQL by strictly increasing id
//! - **Writing** them into a single RFC 4180 CSV artifact per run
//! - **Delivering** the artifact atomically over SFTP
//! - **Checkpointing** the last delivered id so the next run continues from it
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Run control, export loop and checkpoint state
//! - [`adapters`] - External integrations (PostgreSQL, MySQL, SFTP)
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rowship::config::load_config;
//! use rowship::core::export::RunController;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config(Some("rowship.toml"))?;
//!
//!     let controller = RunController::from_config(&config).await?;
//!     let summary = controller.execute_run().await?;
//!
//!     println!("Exported {} rows", summary.rows_exported);
//!     Ok(())
//! }
//! ```
//!
//! ## Delivery Guarantees
//!
//! The checkpoint only advances after the artifact has been delivered, so a
//! row is never skipped. If the checkpoint cannot be written after a
//! delivery, the next run delivers the same rows again: delivery is
//! at-least-once.
//!
//! ## Error Handling
//!
//! All fallible operations return [`domain::Result`], whose error type
//! [`domain::RowshipError`] maps to the process exit code:
//!
//! ```rust
//! use rowship::domain::{RowshipError, TransferError};
//!
//! let err = RowshipError::from(TransferError::Timeout("read".to_string()));
//! assert_eq!(err.exit_code(), 4);
//! assert!(err.retains_artifact());
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
