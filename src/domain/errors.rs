//! Domain error types
//!
//! This module defines the error hierarchy for rowship.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main rowship error type
///
/// Every failure of a run bubbles up as one of these variants. The variant
/// decides the process exit code and whether the local artifact survives.
#[derive(Debug, Error)]
pub enum RowshipError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Data source (database) errors
    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),

    /// Transfer (SFTP) errors
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// Artifact serialization or layout errors
    #[error("Export error: {0}")]
    Export(String),

    /// The checkpoint could not be persisted after a successful delivery
    #[error("Checkpoint write error: {0}")]
    CheckpointWrite(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// The run was interrupted by a shutdown signal
    #[error("Run interrupted: {0}")]
    Interrupted(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl RowshipError {
    /// Process exit code for this error
    ///
    /// 2 configuration, 3 data source, 4 transfer, 6 checkpoint write after
    /// delivery, 130 interrupted, 5 anything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            RowshipError::Configuration(_) | RowshipError::Validation(_) => 2,
            RowshipError::DataSource(_) => 3,
            RowshipError::Transfer(_) => 4,
            RowshipError::CheckpointWrite(_) => 6,
            RowshipError::Interrupted(_) => 130,
            _ => 5,
        }
    }

    /// Whether the local artifact must be kept after this failure
    ///
    /// Only a failed or unrecorded delivery keeps the artifact around so an
    /// operator (or the next run) can reuse it.
    pub fn retains_artifact(&self) -> bool {
        matches!(
            self,
            RowshipError::Transfer(_) | RowshipError::CheckpointWrite(_)
        )
    }
}

/// Data source errors
///
/// Errors that occur while paginating rows out of the source table.
#[derive(Debug, Error)]
pub enum DataSourceError {
    /// Failed to connect or acquire a connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The identifier column is missing from the result set
    #[error("Identifier column '{0}' not present in result set")]
    MissingIdColumn(String),

    /// The identifier value could not be interpreted as a row id
    #[error("Invalid identifier value {value:?} in column '{column}'")]
    InvalidId { column: String, value: Option<String> },

    /// A page violated the keyset pagination contract
    #[error("Pagination contract violated: {0}")]
    ContractViolation(String),

    /// Timeout
    #[error("Database timeout: {0}")]
    Timeout(String),
}

/// Transfer errors
///
/// Classified causes of a failed delivery. Classification follows the
/// step that failed and, for SFTP operations, the server status code.
#[derive(Debug, Error)]
pub enum TransferError {
    /// TCP connection could not be established
    #[error("Failed to connect to {host}:{port}: {message}")]
    ConnectionFailed {
        host: String,
        port: u16,
        message: String,
    },

    /// SSH handshake failed
    #[error("SSH handshake failed: {0}")]
    HandshakeFailed(String),

    /// Remote host key did not verify
    #[error("Host key verification failed: {0}")]
    HostKeyRejected(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Remote directory does not exist and creating it is disabled
    #[error("Remote directory does not exist: {0}")]
    RemoteDirectoryMissing(String),

    /// Remote side refused the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Remote filesystem is full or over quota
    #[error("Remote disk full: {0}")]
    RemoteDiskFull(String),

    /// Writing the remote file failed
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// Moving the uploaded file into place failed
    #[error("Rename failed: {0}")]
    RenameFailed(String),

    /// Reading the local artifact failed
    #[error("Local artifact unreadable: {0}")]
    LocalIo(String),

    /// Timeout
    #[error("Transfer timeout: {0}")]
    Timeout(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for RowshipError {
    fn from(err: std::io::Error) -> Self {
        RowshipError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for RowshipError {
    fn from(err: serde_json::Error) -> Self {
        RowshipError::Serialization(err.to_string())
    }
}

// Conversion from csv errors
impl From<csv::Error> for RowshipError {
    fn from(err: csv::Error) -> Self {
        RowshipError::Export(format!("CSV write failed: {err}"))
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for RowshipError {
    fn from(err: toml::de::Error) -> Self {
        RowshipError::Configuration(format!("TOML parse error: {err}"))
    }
}
