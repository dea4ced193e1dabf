//! Configuration management for rowship.
//!
//! Configuration is built once at startup and passed by reference into each
//! component's constructor. There is no global configuration state.
//!
//! # Sources
//!
//! 1. Built-in defaults
//! 2. Optional TOML file (`--config` / `ROWSHIP_CONFIG`) with `${VAR_NAME}` substitution
//! 3. `ROWSHIP_<SECTION>_<KEY>` environment variables (a `.env` file is loaded first)
//!
//! # Example Configuration
//!
//! ```toml
//! [database]
//! host = "localhost"
//! username = "exporter"
//! password = "${CRM_DB_PASSWORD}"
//! database_name = "crm"
//! table = "timeline"
//!
//! [transfer]
//! host = "backup.example.com"
//! username = "backupbot"
//! key_path = "~/.ssh/id_ed25519"
//! remote_dir = "/data/backups/crm"
//!
//! [export]
//! work_dir = "/var/backups/crm"
//! batch_size = 5000
//! ```
//!
//! The same settings can come entirely from the environment:
//!
//! ```bash
//! export ROWSHIP_DATABASE_HOST=localhost
//! export ROWSHIP_TRANSFER_REMOTE_DIR=/data/backups/crm
//! export ROWSHIP_EXPORT_WORK_DIR=/var/backups/crm
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, load_unvalidated};
pub use schema::{
    ApplicationConfig, DatabaseConfig, DatabaseEngine, ExportConfig, LoggingConfig, RowshipConfig,
    TransferConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
