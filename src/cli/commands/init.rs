//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "rowship.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing rowship configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            eprintln!("❌ Configuration file already exists: {}", self.output);
            eprintln!("   Use --force to overwrite");
            return Ok(2);
        }

        match fs::write(&self.output, Self::sample_config()) {
            Ok(()) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Create a .env file with your credentials:");
                println!("     - ROWSHIP_DB_PASSWORD");
                println!("     - ROWSHIP_SFTP_PASSWORD (or set transfer.key_path)");
                println!(
                    "  3. Validate configuration: rowship --config {} validate-config",
                    self.output
                );
                println!("  4. Run export: rowship --config {} export", self.output);
                println!();
                Ok(0)
            }
            Err(e) => {
                eprintln!("❌ Failed to write configuration file");
                eprintln!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Sample configuration with every option explained
    fn sample_config() -> &'static str {
        r#"# rowship configuration file
# Incremental CSV export of an append-only table, delivered over SFTP.
#
# Values of the form ${VAR} are substituted from the environment (a .env
# file in the working directory is loaded first). Any setting can also be
# overridden with ROWSHIP_<SECTION>_<KEY>, e.g. ROWSHIP_EXPORT_BATCH_SIZE.

[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# ============================================================================
# Source database (PostgreSQL)
# ============================================================================
[database]
# postgresql or mysql (MariaDB works as mysql)
engine = "postgresql"
host = "localhost"
# Defaults to 5432 for postgresql, 3306 for mysql
# port = 5432
# PostgreSQL Unix socket directory; used instead of host when set
# socket_dir = "/var/run/postgresql"
# MySQL Unix socket file; used instead of host when set
# socket_path = "/var/lib/mysql/mysql.sock"
username = "exporter"
password = "${ROWSHIP_DB_PASSWORD}"
database_name = "crm"

# Source table, optionally schema-qualified
table = "public.timeline"

# Strictly increasing integer column used for pagination and checkpoints
id_column = "id"

connection_timeout_seconds = 30
statement_timeout_seconds = 60

# TCP keepalive keeps the session alive through long exports
keepalive_idle_seconds = 60

# disable | prefer | require
ssl_mode = "prefer"

# ============================================================================
# Destination (SFTP)
# ============================================================================
[transfer]
host = "backup.example.com"
port = 22
username = "backup"
password = "${ROWSHIP_SFTP_PASSWORD}"

# Private key authentication, tried before the password
# key_path = "~/.ssh/id_ed25519"
# key_passphrase = "${ROWSHIP_SFTP_KEY_PASSPHRASE}"

# Verify the server host key against an OpenSSH known_hosts file
# known_hosts_path = "~/.ssh/known_hosts"

remote_dir = "/data/backups/crm"

# Fail when remote_dir does not exist (false) or create it (true)
create_remote_dir = false

timeout_seconds = 30

# ============================================================================
# Local export settings
# ============================================================================
[export]
# Holds the checkpoint file and the CSV artifacts
work_dir = "/var/lib/rowship"

# Rows fetched per page (1-1000000)
batch_size = 5000

# Artifact names are <file_prefix>_<YYYYMMDD_HHMMSS>.csv; defaults to the table name
# file_prefix = "timeline"

checkpoint_file = "last_id.txt"

# Keep the local CSV after a successful delivery
keep_artifacts = true

# Write the CSV but skip transfer and checkpoint update
dry_run = false

# ============================================================================
# Logging
# ============================================================================
[logging]
# JSON log files in addition to console output
local_enabled = false
local_path = "/var/log/rowship"

# daily | hourly
local_rotation = "daily"
"#
    }
}
