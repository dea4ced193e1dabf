//! Configuration schema types
//!
//! Every section implements `Default` so a configuration can be assembled
//! purely from environment variables. Required values default to empty and
//! are enforced by [`RowshipConfig::validate`].

use crate::config::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Source database engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    /// PostgreSQL
    #[default]
    PostgreSQL,
    /// MySQL or MariaDB
    MySQL,
}

impl DatabaseEngine {
    /// Port used when `database.port` is not set
    pub fn default_port(self) -> u16 {
        match self {
            DatabaseEngine::PostgreSQL => 5432,
            DatabaseEngine::MySQL => 3306,
        }
    }
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseEngine::PostgreSQL => write!(f, "postgresql"),
            DatabaseEngine::MySQL => write!(f, "mysql"),
        }
    }
}

impl FromStr for DatabaseEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(DatabaseEngine::PostgreSQL),
            "mysql" | "mariadb" => Ok(DatabaseEngine::MySQL),
            other => Err(format!(
                "unknown database engine '{other}', expected postgresql or mysql"
            )),
        }
    }
}

/// Main rowship configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowshipConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Source database
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Remote SFTP destination
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Local export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RowshipConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid or a required
    /// value is missing
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.database.validate()?;
        self.transfer.validate()?;
        self.export.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Prefix for artifact file names, defaulting to the table name
    pub fn artifact_prefix(&self) -> String {
        match &self.export.file_prefix {
            Some(prefix) if !prefix.trim().is_empty() => prefix.clone(),
            _ => self
                .database
                .table
                .rsplit('.')
                .next()
                .unwrap_or(&self.database.table)
                .to_string(),
        }
    }

    /// Full path of the checkpoint file
    pub fn checkpoint_path(&self) -> PathBuf {
        PathBuf::from(&self.export.work_dir).join(&self.export.checkpoint_file)
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Source database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database engine (postgresql, mysql)
    #[serde(default)]
    pub engine: DatabaseEngine,

    /// Database host name or address
    #[serde(default)]
    pub host: String,

    /// Database port (defaults to the engine's standard port)
    #[serde(default)]
    pub port: Option<u16>,

    /// PostgreSQL Unix socket directory, used instead of `host` when set
    #[serde(default)]
    pub socket_dir: Option<String>,

    /// MySQL Unix socket file, used instead of `host` when set
    #[serde(default)]
    pub socket_path: Option<String>,

    /// Database user
    #[serde(default)]
    pub username: String,

    /// Database password (optional for socket peer authentication)
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Database name
    #[serde(default)]
    pub database_name: String,

    /// Source table, optionally schema-qualified (`schema.table`)
    #[serde(default)]
    pub table: String,

    /// Monotonic identifier column
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout_seconds")]
    pub connection_timeout_seconds: u64,

    /// Per-statement timeout in seconds
    #[serde(default = "default_statement_timeout_seconds")]
    pub statement_timeout_seconds: u64,

    /// Idle time before TCP keepalive probes start, in seconds
    #[serde(default = "default_keepalive_idle_seconds")]
    pub keepalive_idle_seconds: u64,

    /// TLS mode (disable, prefer, require)
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            engine: DatabaseEngine::default(),
            host: String::new(),
            port: None,
            socket_dir: None,
            socket_path: None,
            username: String::new(),
            password: None,
            database_name: String::new(),
            table: String::new(),
            id_column: default_id_column(),
            connection_timeout_seconds: default_connection_timeout_seconds(),
            statement_timeout_seconds: default_statement_timeout_seconds(),
            keepalive_idle_seconds: default_keepalive_idle_seconds(),
            ssl_mode: default_ssl_mode(),
        }
    }
}

impl DatabaseConfig {
    fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() && self.socket().is_none() {
            let socket_key = match self.engine {
                DatabaseEngine::PostgreSQL => "database.socket_dir",
                DatabaseEngine::MySQL => "database.socket_path",
            };
            return Err(format!("database.host or {socket_key} is required"));
        }

        if self.port == Some(0) {
            return Err("database.port must be > 0".to_string());
        }

        if self.username.trim().is_empty() {
            return Err("database.username is required".to_string());
        }

        if self.database_name.trim().is_empty() {
            return Err("database.database_name is required".to_string());
        }

        if self.table.trim().is_empty() {
            return Err("database.table is required".to_string());
        }

        if self.table.split('.').count() > 2 || self.table.split('.').any(|p| p.is_empty()) {
            return Err(format!(
                "database.table must be 'table' or 'schema.table', got '{}'",
                self.table
            ));
        }

        if self.id_column.trim().is_empty() {
            return Err("database.id_column cannot be empty".to_string());
        }

        if self.connection_timeout_seconds == 0 {
            return Err("database.connection_timeout_seconds must be > 0".to_string());
        }

        if self.statement_timeout_seconds > MAX_STATEMENT_TIMEOUT_SECONDS {
            return Err(format!(
                "database.statement_timeout_seconds must be at most {}, got {}",
                MAX_STATEMENT_TIMEOUT_SECONDS, self.statement_timeout_seconds
            ));
        }

        let valid_ssl_modes = ["disable", "prefer", "require"];
        if !valid_ssl_modes.contains(&self.ssl_mode.as_str()) {
            return Err(format!(
                "database.ssl_mode must be one of: {}, got '{}'",
                valid_ssl_modes.join(", "),
                self.ssl_mode
            ));
        }

        Ok(())
    }

    /// Effective port
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.engine.default_port())
    }

    /// Unix socket for the configured engine, if one is set
    ///
    /// PostgreSQL takes a socket directory, MySQL the socket file itself.
    pub fn socket(&self) -> Option<&str> {
        let socket = match self.engine {
            DatabaseEngine::PostgreSQL => self.socket_dir.as_deref(),
            DatabaseEngine::MySQL => self.socket_path.as_deref(),
        };
        socket.filter(|s| !s.trim().is_empty())
    }

    /// Human-readable endpoint without credentials
    pub fn endpoint(&self) -> String {
        match self.socket() {
            Some(socket) => format!("unix:{}/{}", socket, self.database_name),
            None => format!("{}:{}/{}", self.host, self.port(), self.database_name),
        }
    }
}

/// Remote SFTP destination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Remote host
    #[serde(default)]
    pub host: String,

    /// SSH port
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// SSH user
    #[serde(default)]
    pub username: String,

    /// SSH password
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Private key file; `~` expands to the home directory
    #[serde(default)]
    pub key_path: Option<String>,

    /// Passphrase for the private key
    #[serde(default)]
    pub key_passphrase: Option<SecretString>,

    /// OpenSSH known_hosts file used to verify the host key
    #[serde(default)]
    pub known_hosts_path: Option<String>,

    /// Remote directory that receives artifacts
    #[serde(default)]
    pub remote_dir: String,

    /// Create the remote directory when it does not exist
    #[serde(default)]
    pub create_remote_dir: bool,

    /// Connect and per-operation timeout in seconds
    #[serde(default = "default_transfer_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_ssh_port(),
            username: String::new(),
            password: None,
            key_path: None,
            key_passphrase: None,
            known_hosts_path: None,
            remote_dir: String::new(),
            create_remote_dir: false,
            timeout_seconds: default_transfer_timeout_seconds(),
        }
    }
}

impl TransferConfig {
    fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("transfer.host is required".to_string());
        }

        if self.port == 0 {
            return Err("transfer.port must be > 0".to_string());
        }

        if self.username.trim().is_empty() {
            return Err("transfer.username is required".to_string());
        }

        if self.remote_dir.trim().is_empty() {
            return Err("transfer.remote_dir is required".to_string());
        }

        let has_key = self
            .key_path
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        if self.password.is_none() && !has_key {
            return Err("transfer.password or transfer.key_path is required".to_string());
        }

        if self.timeout_seconds == 0 {
            return Err("transfer.timeout_seconds must be > 0".to_string());
        }

        Ok(())
    }
}

/// Local export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Working directory for the checkpoint file and artifacts
    #[serde(default)]
    pub work_dir: String,

    /// Rows fetched per page
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Artifact file name prefix (defaults to the table name)
    #[serde(default)]
    pub file_prefix: Option<String>,

    /// Checkpoint file name inside `work_dir`
    #[serde(default = "default_checkpoint_file")]
    pub checkpoint_file: String,

    /// Keep local artifacts after a successful run
    #[serde(default = "default_true")]
    pub keep_artifacts: bool,

    /// Export only: skip transfer and checkpoint advance
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            work_dir: String::new(),
            batch_size: default_batch_size(),
            file_prefix: None,
            checkpoint_file: default_checkpoint_file(),
            keep_artifacts: true,
            dry_run: false,
        }
    }
}

impl ExportConfig {
    fn validate(&self) -> Result<(), String> {
        if self.work_dir.trim().is_empty() {
            return Err("export.work_dir is required".to_string());
        }

        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(format!(
                "export.batch_size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.batch_size
            ));
        }

        if self.checkpoint_file.trim().is_empty()
            || self.checkpoint_file.contains('/')
            || self.checkpoint_file.contains('\\')
        {
            return Err(format!(
                "export.checkpoint_file must be a plain file name, got '{}'",
                self.checkpoint_file
            ));
        }

        if let Some(prefix) = &self.file_prefix {
            if prefix.contains('/') || prefix.contains('\\') {
                return Err(format!(
                    "export.file_prefix must not contain path separators, got '{prefix}'"
                ));
            }
        }

        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path is required when local logging is enabled".to_string());
        }

        Ok(())
    }
}

/// Upper bound for `export.batch_size`
pub const MAX_BATCH_SIZE: usize = 1_000_000;

/// Upper bound for `database.statement_timeout_seconds` (one day)
pub const MAX_STATEMENT_TIMEOUT_SECONDS: u64 = 86_400;

fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_id_column() -> String {
    "id".to_string()
}
fn default_connection_timeout_seconds() -> u64 {
    30
}
fn default_statement_timeout_seconds() -> u64 {
    60
}
fn default_keepalive_idle_seconds() -> u64 {
    60
}
fn default_ssl_mode() -> String {
    "prefer".to_string()
}
fn default_ssh_port() -> u16 {
    22
}
fn default_transfer_timeout_seconds() -> u64 {
    30
}
fn default_batch_size() -> usize {
    5000
}
fn default_checkpoint_file() -> String {
    "last_id.txt".to_string()
}
fn default_local_path() -> String {
    "/var/log/rowship".to_string()
}
fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    fn valid_config() -> RowshipConfig {
        RowshipConfig {
            application: ApplicationConfig::default(),
            database: DatabaseConfig {
                host: "db.internal".to_string(),
                username: "exporter".to_string(),
                password: Some(secret_string("pw".to_string())),
                database_name: "crm".to_string(),
                table: "public.timeline".to_string(),
                ..DatabaseConfig::default()
            },
            transfer: TransferConfig {
                host: "backup.example.com".to_string(),
                username: "backupbot".to_string(),
                password: Some(secret_string("pw".to_string())),
                remote_dir: "/data/backups".to_string(),
                ..TransferConfig::default()
            },
            export: ExportConfig {
                work_dir: "/var/backups/crm".to_string(),
                ..ExportConfig::default()
            },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_default_config_is_invalid() {
        let err = RowshipConfig::default().validate().unwrap_err();
        assert!(err.contains("database.host"));
    }

    #[test]
    fn test_application_config_validation() {
        let mut config = ApplicationConfig::default();
        assert!(config.validate().is_ok());

        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_socket_replaces_host() {
        let mut config = valid_config();
        config.database.host = String::new();
        assert!(config.validate().is_err());

        config.database.socket_dir = Some("/var/run/postgresql".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(config.database.endpoint(), "unix:/var/run/postgresql/crm");
    }

    #[test]
    fn test_mysql_engine_socket_and_port() {
        let mut config = valid_config();
        config.database.engine = DatabaseEngine::MySQL;
        assert_eq!(config.database.port(), 3306);
        assert_eq!(config.database.endpoint(), "db.internal:3306/crm");

        config.database.host = String::new();
        config.database.socket_dir = Some("/var/run/postgresql".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.contains("database.socket_path"));

        config.database.socket_path = Some("/var/lib/mysql/mysql.sock".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(
            config.database.endpoint(),
            "unix:/var/lib/mysql/mysql.sock/crm"
        );

        config.database.port = Some(3307);
        assert_eq!(config.database.port(), 3307);
    }

    #[test]
    fn test_database_engine_from_str() {
        assert_eq!("mysql".parse::<DatabaseEngine>(), Ok(DatabaseEngine::MySQL));
        assert_eq!("MariaDB".parse::<DatabaseEngine>(), Ok(DatabaseEngine::MySQL));
        assert_eq!(
            "postgres".parse::<DatabaseEngine>(),
            Ok(DatabaseEngine::PostgreSQL)
        );
        assert!("oracle".parse::<DatabaseEngine>().is_err());
        assert_eq!(DatabaseEngine::MySQL.to_string(), "mysql");
    }

    #[test]
    fn test_database_statement_timeout_bound() {
        let mut config = valid_config();
        config.database.statement_timeout_seconds = u64::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.contains("statement_timeout_seconds"));

        config.database.statement_timeout_seconds = MAX_STATEMENT_TIMEOUT_SECONDS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_table_shape() {
        let mut config = valid_config();
        config.database.table = "a.b.c".to_string();
        assert!(config.validate().is_err());

        config.database.table = "schema.".to_string();
        assert!(config.validate().is_err());

        config.database.table = "timeline".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_ssl_mode() {
        let mut config = valid_config();
        config.database.ssl_mode = "verify-full".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.contains("ssl_mode"));
    }

    #[test]
    fn test_transfer_requires_credential() {
        let mut config = valid_config();
        config.transfer.password = None;
        let err = config.validate().unwrap_err();
        assert!(err.contains("transfer.password or transfer.key_path"));

        config.transfer.key_path = Some("~/.ssh/id_ed25519".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_transfer_requires_remote_dir() {
        let mut config = valid_config();
        config.transfer.remote_dir = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_export_batch_size_bounds() {
        let mut config = valid_config();
        config.export.batch_size = 0;
        assert!(config.validate().is_err());

        config.export.batch_size = MAX_BATCH_SIZE + 1;
        assert!(config.validate().is_err());

        config.export.batch_size = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_export_checkpoint_file_is_plain_name() {
        let mut config = valid_config();
        config.export.checkpoint_file = "../last_id.txt".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_artifact_prefix() {
        let mut config = valid_config();
        assert_eq!(config.artifact_prefix(), "timeline");

        config.export.file_prefix = Some("crm_timeline".to_string());
        assert_eq!(config.artifact_prefix(), "crm_timeline");

        config.export.file_prefix = Some(" ".to_string());
        assert_eq!(config.artifact_prefix(), "timeline");
    }

    #[test]
    fn test_checkpoint_path() {
        let config = valid_config();
        assert_eq!(
            config.checkpoint_path(),
            PathBuf::from("/var/backups/crm/last_id.txt")
        );
    }

    #[test]
    fn test_default_values() {
        let config = RowshipConfig::default();
        assert_eq!(config.application.log_level, "info");
        assert_eq!(config.database.engine, DatabaseEngine::PostgreSQL);
        assert_eq!(config.database.port(), 5432);
        assert_eq!(config.database.id_column, "id");
        assert_eq!(config.database.ssl_mode, "prefer");
        assert_eq!(config.transfer.port, 22);
        assert!(!config.transfer.create_remote_dir);
        assert_eq!(config.export.batch_size, 5000);
        assert_eq!(config.export.checkpoint_file, "last_id.txt");
        assert!(config.export.keep_artifacts);
        assert!(!config.export.dry_run);
        assert!(!config.logging.local_enabled);
    }

    #[test]
    fn test_logging_config_validation() {
        let mut config = LoggingConfig::default();
        assert!(config.validate().is_ok());

        config.local_rotation = "weekly".to_string();
        assert!(config.validate().is_err());
    }
}
