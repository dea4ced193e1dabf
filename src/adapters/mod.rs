//! External system integrations for rowship.
//!
//! This module provides adapters for the two systems a run talks to:
//!
//! - [`database`] - Row source abstraction (trait-based)
//! - [`postgresql`] - PostgreSQL keyset row source
//! - [`mysql`] - MySQL / MariaDB keyset row source
//! - [`transfer`] - Transfer agent abstraction and the SFTP implementation
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with in-memory implementations. The run controller only sees
//! `Arc<dyn RowSource>` and `Arc<dyn TransferAgent>`.
//!
//! ```rust,no_run
//! use rowship::adapters::database::{create_row_source, RowSource};
//! use rowship::adapters::transfer::{SftpTransferAgent, TransferAgent};
//! use rowship::config::load_config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config(Some("rowship.toml"))?;
//!
//! let source = create_row_source(&config.database).await?;
//! source.test_connection().await?;
//!
//! let agent = SftpTransferAgent::new(&config.transfer);
//! println!("Delivering to {}", agent.describe());
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod mysql;
pub mod postgresql;
pub mod transfer;
