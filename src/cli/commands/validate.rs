//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the rowship configuration.

use crate::adapters::database::create_row_source;
use crate::config::{load_unvalidated, RowshipConfig};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Also connect to the source database and run a trivial query
    #[arg(long)]
    pub test_connection: bool,
}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: Option<&str>) -> anyhow::Result<i32> {
        let source = config_path.unwrap_or("environment");
        tracing::info!(config_path = %source, "Validating configuration");

        println!("🔍 Validating configuration: {source}");
        println!();

        let config = match load_unvalidated(config_path) {
            Ok(c) => {
                println!("✅ Configuration loaded successfully");
                c
            }
            Err(e) => {
                eprintln!("❌ Failed to load configuration");
                eprintln!("   Error: {e}");
                return Ok(2);
            }
        };

        match config.validate() {
            Ok(()) => {
                println!("✅ Configuration is valid");
                println!();
                println!("Configuration Summary:");
                for line in summary_lines(&config) {
                    println!("  {line}");
                }
                println!();

                if self.test_connection {
                    return Ok(check_database(&config).await);
                }
                Ok(0)
            }
            Err(e) => {
                eprintln!("❌ Configuration validation failed");
                eprintln!("   Error: {e}");
                Ok(2)
            }
        }
    }
}

/// Connect to the source database, returning the exit code
async fn check_database(config: &RowshipConfig) -> i32 {
    println!("🔌 Testing database connection...");

    let result = match create_row_source(&config.database).await {
        Ok(source) => {
            let result = source.test_connection().await;
            source.close().await;
            result
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            println!("✅ Database connection successful");
            0
        }
        Err(e) => {
            eprintln!("❌ Database connection failed");
            eprintln!("   Error: {e}");
            e.exit_code()
        }
    }
}

/// Human-readable configuration summary with credentials redacted
fn summary_lines(config: &RowshipConfig) -> Vec<String> {
    fn presence<T>(value: &Option<T>) -> &'static str {
        if value.is_some() {
            "***"
        } else {
            "(not set)"
        }
    }

    let db = &config.database;
    let transfer = &config.transfer;
    let export = &config.export;

    vec![
        format!("Log Level: {}", config.application.log_level),
        format!("Database: {}://{}@{}", db.engine, db.username, db.endpoint()),
        format!("Database Password: {}", presence(&db.password)),
        format!("Table: {} (id column: {})", db.table, db.id_column),
        format!("SSL Mode: {}", db.ssl_mode),
        format!(
            "Destination: sftp://{}@{}:{}{}",
            transfer.username, transfer.host, transfer.port, transfer.remote_dir
        ),
        format!("SFTP Password: {}", presence(&transfer.password)),
        format!(
            "SFTP Key: {}",
            transfer.key_path.as_deref().unwrap_or("(not set)")
        ),
        format!(
            "Known Hosts: {}",
            transfer
                .known_hosts_path
                .as_deref()
                .unwrap_or("(not set, host key not verified)")
        ),
        format!("Create Remote Dir: {}", transfer.create_remote_dir),
        format!("Work Directory: {}", export.work_dir),
        format!("Checkpoint File: {}", config.checkpoint_path().display()),
        format!("Artifact Prefix: {}", config.artifact_prefix()),
        format!("Batch Size: {}", export.batch_size),
        format!("Keep Artifacts: {}", export.keep_artifacts),
        format!("Dry Run: {}", export.dry_run),
    ]
}
