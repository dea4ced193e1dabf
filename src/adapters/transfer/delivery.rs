//! Atomic delivery protocol
//!
//! The artifact is uploaded under a hidden temporary name in the destination
//! directory and renamed to its final name only after the upload completed,
//! so the remote side never sees a partial file under the real name.

use crate::adapters::transfer::traits::{DeliveryReceipt, RemoteFileSystem};
use crate::domain::{Result, TransferError};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Deliver `local_file` into `remote_dir` through `fs`
///
/// When `remote_dir` is missing it is created only if `create_missing` is
/// set; otherwise the delivery fails before anything is uploaded.
///
/// # Errors
///
/// Returns the classified transfer error of the failing step. A failed
/// upload or rename removes the temporary remote file on a best-effort
/// basis.
pub fn deliver_atomically(
    fs: &mut dyn RemoteFileSystem,
    local_file: &Path,
    remote_dir: &str,
    create_missing: bool,
) -> Result<DeliveryReceipt> {
    let file_name = local_file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            TransferError::LocalIo(format!(
                "Artifact path has no usable file name: {}",
                local_file.display()
            ))
        })?;

    ensure_remote_dir(fs, remote_dir, create_missing)?;

    let file = std::fs::File::open(local_file).map_err(|e| {
        TransferError::LocalIo(format!("{}: {}", local_file.display(), e))
    })?;

    let temp_path = remote_join(remote_dir, &format!(".{file_name}.part"));
    let final_path = remote_join(remote_dir, file_name);

    let mut source = HashingReader::new(file);
    let bytes = match fs.upload(&mut source, &temp_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            discard_temp(fs, &temp_path);
            return Err(e);
        }
    };

    if let Err(e) = fs.rename(&temp_path, &final_path) {
        discard_temp(fs, &temp_path);
        return Err(e);
    }

    tracing::debug!(remote_path = %final_path, bytes = bytes, "Remote file in place");

    Ok(DeliveryReceipt {
        remote_path: final_path,
        bytes,
        sha256: source.hex_digest(),
    })
}

fn ensure_remote_dir(
    fs: &mut dyn RemoteFileSystem,
    remote_dir: &str,
    create_missing: bool,
) -> Result<()> {
    if fs.dir_exists(remote_dir)? {
        return Ok(());
    }

    if !create_missing {
        return Err(TransferError::RemoteDirectoryMissing(remote_dir.to_string()).into());
    }

    tracing::info!(remote_dir = %remote_dir, "Creating missing remote directory");

    let absolute = remote_dir.starts_with('/');
    let mut current = String::new();
    for part in remote_dir.split('/').filter(|p| !p.is_empty()) {
        if current.is_empty() {
            if absolute {
                current.push('/');
            }
        } else {
            current.push('/');
        }
        current.push_str(part);

        if !fs.dir_exists(&current)? {
            fs.create_dir(&current)?;
        }
    }

    Ok(())
}

fn discard_temp(fs: &mut dyn RemoteFileSystem, temp_path: &str) {
    if let Err(e) = fs.remove(temp_path) {
        tracing::debug!(remote_path = %temp_path, error = %e, "Could not remove temporary remote file");
    }
}

/// Join a remote directory and file name with `/`
pub fn remote_join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Expand a leading `~` to the `HOME` directory
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix('~'), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
            PathBuf::from(home).join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(path),
    }
}

/// Reader that hashes everything passing through it
struct HashingReader<R> {
    inner: R,
    hasher: Sha256,
}

impl<R: Read> HashingReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    fn hex_digest(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}
