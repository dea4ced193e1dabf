//! Transfer abstraction traits
//!
//! [`TransferAgent`] is what the run controller talks to. [`RemoteFileSystem`]
//! is the handful of blocking remote operations the atomic delivery protocol
//! needs, implemented over an SFTP session in production.

use crate::domain::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Proof of a completed delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Final remote path of the artifact
    pub remote_path: String,

    /// Bytes uploaded
    pub bytes: u64,

    /// Hex SHA-256 of the uploaded content
    pub sha256: String,
}

/// Delivers a finished artifact to the remote destination
#[async_trait]
pub trait TransferAgent: Send + Sync {
    /// Deliver `local_file` into `remote_dir` under its own file name
    ///
    /// On success the file is fully present at the destination. The local
    /// file is never modified or removed.
    ///
    /// # Errors
    ///
    /// Returns a classified [`crate::domain::TransferError`] (wrapped).
    async fn deliver(&self, local_file: &Path, remote_dir: &str) -> Result<DeliveryReceipt>;

    /// Human-readable destination, without credentials
    fn describe(&self) -> String;
}

/// Blocking remote file operations
pub trait RemoteFileSystem {
    /// Whether `path` exists and is a directory
    fn dir_exists(&mut self, path: &str) -> Result<bool>;

    /// Create a single directory level
    fn create_dir(&mut self, path: &str) -> Result<()>;

    /// Write everything from `source` to a new remote file at `path`,
    /// returning the number of bytes written
    fn upload(&mut self, source: &mut dyn Read, path: &str) -> Result<u64>;

    /// Atomically move `from` to `to`
    fn rename(&mut self, from: &str, to: &str) -> Result<()>;

    /// Remove a remote file
    fn remove(&mut self, path: &str) -> Result<()>;
}
