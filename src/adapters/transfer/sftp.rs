//! SFTP transfer agent
//!
//! Built on `ssh2` (libssh2). The library is blocking, so every delivery runs
//! on tokio's blocking pool. One SSH session is opened per delivery and
//! dropped on every exit path.

use crate::adapters::transfer::delivery::{deliver_atomically, expand_home};
use crate::adapters::transfer::traits::{DeliveryReceipt, RemoteFileSystem, TransferAgent};
use crate::config::schema::TransferConfig;
use crate::domain::{Result, RowshipError, TransferError};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use ssh2::{CheckResult, ErrorCode, KnownHostFileKind, RenameFlags, Session, Sftp};
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

// libssh2 status codes
const SESSION_TIMEOUT: i32 = -9;
const SOCKET_TIMEOUT: i32 = -30;
const FX_NO_SUCH_FILE: i32 = 2;
const FX_PERMISSION_DENIED: i32 = 3;
const FX_NO_SUCH_PATH: i32 = 10;
const FX_NO_SPACE_ON_FILESYSTEM: i32 = 14;
const FX_QUOTA_EXCEEDED: i32 = 15;

/// Transfer agent delivering artifacts over SFTP
pub struct SftpTransferAgent {
    config: TransferConfig,
}

impl SftpTransferAgent {
    /// Create an agent from pre-resolved connection settings
    pub fn new(config: &TransferConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl TransferAgent for SftpTransferAgent {
    async fn deliver(&self, local_file: &Path, remote_dir: &str) -> Result<DeliveryReceipt> {
        let config = self.config.clone();
        let local_file = local_file.to_path_buf();
        let remote_dir = remote_dir.to_string();

        tracing::info!(
            host = %config.host,
            port = config.port,
            remote_dir = %remote_dir,
            file = %local_file.display(),
            "Starting SFTP delivery"
        );

        tokio::task::spawn_blocking(move || deliver_blocking(&config, &local_file, &remote_dir))
            .await
            .map_err(|e| {
                RowshipError::Transfer(TransferError::UploadFailed(format!(
                    "Transfer task did not complete: {e}"
                )))
            })?
    }

    fn describe(&self) -> String {
        format!(
            "sftp://{}@{}:{}{}",
            self.config.username, self.config.host, self.config.port, self.config.remote_dir
        )
    }
}

fn deliver_blocking(
    config: &TransferConfig,
    local_file: &Path,
    remote_dir: &str,
) -> Result<DeliveryReceipt> {
    let session = open_session(config)?;

    let sftp = session.sftp().map_err(|e| {
        classify(e, |m| {
            TransferError::HandshakeFailed(format!("SFTP subsystem unavailable: {m}"))
        })
    })?;

    let mut fs = SftpFileSystem { sftp: &sftp };
    let result = deliver_atomically(&mut fs, local_file, remote_dir, config.create_remote_dir);

    drop(sftp);
    if let Err(e) = session.disconnect(None, "delivery finished", None) {
        tracing::debug!(error = %e, "SSH disconnect failed");
    }

    result
}

/// Connect, handshake, verify the host key and authenticate
fn open_session(config: &TransferConfig) -> Result<Session> {
    let timeout = Duration::from_secs(config.timeout_seconds);
    let tcp = connect_tcp(&config.host, config.port, timeout)?;

    let mut session = Session::new().map_err(|e| {
        TransferError::HandshakeFailed(format!("Failed to create SSH session: {e}"))
    })?;
    session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
    session.set_tcp_stream(tcp);
    session
        .handshake()
        .map_err(|e| classify(e, TransferError::HandshakeFailed))?;

    verify_host_key(&session, config)?;
    authenticate(&session, config)?;

    tracing::debug!(host = %config.host, user = %config.username, "SSH session established");
    Ok(session)
}

fn connect_tcp(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let failure = |message: String| TransferError::ConnectionFailed {
        host: host.to_string(),
        port,
        message,
    };

    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| failure(format!("address resolution failed: {e}")))?;

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                last_error = Some(format!("connection to {addr} timed out"));
            }
            Err(e) => last_error = Some(format!("{addr}: {e}")),
        }
    }

    Err(failure(last_error.unwrap_or_else(|| "no addresses resolved".to_string())).into())
}

fn verify_host_key(session: &Session, config: &TransferConfig) -> Result<()> {
    let Some(known_hosts_path) = config.known_hosts_path.as_deref() else {
        tracing::warn!(
            host = %config.host,
            "No known_hosts file configured - accepting the server host key without verification"
        );
        return Ok(());
    };

    let (key, _) = session.host_key().ok_or_else(|| {
        TransferError::HostKeyRejected("server presented no host key".to_string())
    })?;

    let mut known_hosts = session
        .known_hosts()
        .map_err(|e| TransferError::HostKeyRejected(e.to_string()))?;
    let path = expand_home(known_hosts_path);
    known_hosts
        .read_file(&path, KnownHostFileKind::OpenSSH)
        .map_err(|e| {
            TransferError::HostKeyRejected(format!(
                "cannot read known_hosts {}: {}",
                path.display(),
                e
            ))
        })?;

    match known_hosts.check_port(&config.host, config.port, key) {
        CheckResult::Match => Ok(()),
        CheckResult::Mismatch => Err(TransferError::HostKeyRejected(format!(
            "host key for {} does not match {}",
            config.host,
            path.display()
        ))
        .into()),
        CheckResult::NotFound => Err(TransferError::HostKeyRejected(format!(
            "{} is not listed in {}",
            config.host,
            path.display()
        ))
        .into()),
        CheckResult::Failure => Err(TransferError::HostKeyRejected(format!(
            "host key check for {} failed",
            config.host
        ))
        .into()),
    }
}

/// Try the private key first, then the password
fn authenticate(session: &Session, config: &TransferConfig) -> Result<()> {
    let mut failures = Vec::new();

    if let Some(key_path) = config.key_path.as_deref().filter(|k| !k.trim().is_empty()) {
        let key_file: PathBuf = expand_home(key_path);
        let passphrase: Option<&str> = config
            .key_passphrase
            .as_ref()
            .map(|p| p.expose_secret().as_ref());

        match session.userauth_pubkey_file(&config.username, None, &key_file, passphrase) {
            Ok(()) if session.authenticated() => return Ok(()),
            Ok(()) => failures.push(format!("key {} not accepted", key_file.display())),
            Err(e) => failures.push(format!("key {}: {}", key_file.display(), e)),
        }
    }

    if let Some(password) = &config.password {
        let password: &str = password.expose_secret().as_ref();
        match session.userauth_password(&config.username, password) {
            Ok(()) if session.authenticated() => return Ok(()),
            Ok(()) => failures.push("password not accepted".to_string()),
            Err(e) => failures.push(format!("password: {e}")),
        }
    }

    Err(TransferError::AuthenticationFailed(format!(
        "{}@{}: {}",
        config.username,
        config.host,
        failures.join("; ")
    ))
    .into())
}

/// Map an ssh2 error onto the transfer taxonomy
///
/// SFTP status codes and session timeouts take precedence over `fallback`.
fn classify(err: ssh2::Error, fallback: impl FnOnce(String) -> TransferError) -> TransferError {
    classify_code(err.code(), err.to_string(), fallback)
}

fn classify_code(
    code: ErrorCode,
    message: String,
    fallback: impl FnOnce(String) -> TransferError,
) -> TransferError {
    match code {
        ErrorCode::Session(SESSION_TIMEOUT) | ErrorCode::Session(SOCKET_TIMEOUT) => {
            TransferError::Timeout(message)
        }
        ErrorCode::SFTP(FX_PERMISSION_DENIED) => TransferError::PermissionDenied(message),
        ErrorCode::SFTP(FX_NO_SPACE_ON_FILESYSTEM) | ErrorCode::SFTP(FX_QUOTA_EXCEEDED) => {
            TransferError::RemoteDiskFull(message)
        }
        _ => fallback(message),
    }
}

/// Writes through `std::io` surface ssh2 errors wrapped in `io::Error`
fn classify_io(err: std::io::Error, fallback: impl FnOnce(String) -> TransferError) -> TransferError {
    let code = err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<ssh2::Error>())
        .map(|e| e.code());

    match code {
        Some(code) => classify_code(code, err.to_string(), fallback),
        None if err.kind() == std::io::ErrorKind::TimedOut => TransferError::Timeout(err.to_string()),
        None => fallback(err.to_string()),
    }
}

fn close_failure(path: &str, err: ssh2::Error) -> TransferError {
    classify(err, |m| TransferError::UploadFailed(format!("cannot close {path}: {m}")))
}

/// [`RemoteFileSystem`] over an open SFTP channel
struct SftpFileSystem<'a> {
    sftp: &'a Sftp,
}

impl RemoteFileSystem for SftpFileSystem<'_> {
    fn dir_exists(&mut self, path: &str) -> Result<bool> {
        match self.sftp.stat(Path::new(path)) {
            Ok(stat) => Ok(stat.is_dir()),
            Err(e)
                if matches!(
                    e.code(),
                    ErrorCode::SFTP(FX_NO_SUCH_FILE) | ErrorCode::SFTP(FX_NO_SUCH_PATH)
                ) =>
            {
                Ok(false)
            }
            Err(e) => Err(classify(e, |m| {
                TransferError::UploadFailed(format!("cannot stat {path}: {m}"))
            })
            .into()),
        }
    }

    fn create_dir(&mut self, path: &str) -> Result<()> {
        self.sftp.mkdir(Path::new(path), 0o755).map_err(|e| {
            classify(e, |m| {
                TransferError::UploadFailed(format!("cannot create {path}: {m}"))
            })
            .into()
        })
    }

    fn upload(&mut self, source: &mut dyn Read, path: &str) -> Result<u64> {
        let mut remote = self.sftp.create(Path::new(path)).map_err(|e| {
            classify(e, |m| {
                TransferError::UploadFailed(format!("cannot create {path}: {m}"))
            })
        })?;

        let bytes = std::io::copy(source, &mut remote)
            .map_err(|e| classify_io(e, |m| TransferError::UploadFailed(format!("{path}: {m}"))))?;

        // fsync@openssh.com is optional on the server side
        if let Err(e) = remote.fsync() {
            tracing::debug!(remote_path = %path, error = %e, "Remote fsync not supported");
        }

        // The server may only report a failed write when the handle closes
        remote.close().map_err(|e| close_failure(path, e))?;

        Ok(bytes)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let flags = RenameFlags::OVERWRITE | RenameFlags::ATOMIC | RenameFlags::NATIVE;
        self.sftp
            .rename(Path::new(from), Path::new(to), Some(flags))
            .map_err(|e| {
                classify(e, |m| {
                    TransferError::RenameFailed(format!("{from} -> {to}: {m}"))
                })
                .into()
            })
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        self.sftp.unlink(Path::new(path)).map_err(|e| {
            classify(e, |m| TransferError::UploadFailed(format!("cannot remove {path}: {m}"))).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    fn transfer_config() -> TransferConfig {
        TransferConfig {
            host: "backup.example.com".to_string(),
            username: "backupbot".to_string(),
            password: Some(secret_string("pw".to_string())),
            remote_dir: "/data/backups".to_string(),
            ..TransferConfig::default()
        }
    }

    #[test]
    fn test_describe_hides_credentials() {
        let agent = SftpTransferAgent::new(&transfer_config());
        let description = agent.describe();
        assert_eq!(description, "sftp://backupbot@backup.example.com:22/data/backups");
        assert!(!description.contains("pw"));
    }

    #[test]
    fn test_classify_sftp_codes() {
        let denied = ssh2::Error::new(ErrorCode::SFTP(FX_PERMISSION_DENIED), "denied");
        assert!(matches!(
            classify(denied, TransferError::UploadFailed),
            TransferError::PermissionDenied(_)
        ));

        let full = ssh2::Error::new(ErrorCode::SFTP(FX_NO_SPACE_ON_FILESYSTEM), "full");
        assert!(matches!(
            classify(full, TransferError::UploadFailed),
            TransferError::RemoteDiskFull(_)
        ));

        let quota = ssh2::Error::new(ErrorCode::SFTP(FX_QUOTA_EXCEEDED), "quota");
        assert!(matches!(
            classify(quota, TransferError::UploadFailed),
            TransferError::RemoteDiskFull(_)
        ));

        let timeout = ssh2::Error::new(ErrorCode::Session(SESSION_TIMEOUT), "timeout");
        assert!(matches!(
            classify(timeout, TransferError::HandshakeFailed),
            TransferError::Timeout(_)
        ));

        let other = ssh2::Error::new(ErrorCode::SFTP(4), "failure");
        assert!(matches!(
            classify(other, TransferError::RenameFailed),
            TransferError::RenameFailed(_)
        ));
    }

    #[test]
    fn test_close_failure_is_an_upload_failure() {
        let full = ssh2::Error::new(ErrorCode::SFTP(FX_NO_SPACE_ON_FILESYSTEM), "full");
        assert!(matches!(
            close_failure("/data/backups/.t.csv.part", full),
            TransferError::RemoteDiskFull(_)
        ));

        let other = ssh2::Error::new(ErrorCode::SFTP(4), "failure");
        match close_failure("/data/backups/.t.csv.part", other) {
            TransferError::UploadFailed(message) => {
                assert!(message.contains("cannot close /data/backups/.t.csv.part"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_classify_io_wrapping_ssh_error() {
        let io_err: std::io::Error =
            ssh2::Error::new(ErrorCode::SFTP(FX_NO_SPACE_ON_FILESYSTEM), "full").into();
        assert!(matches!(
            classify_io(io_err, TransferError::UploadFailed),
            TransferError::RemoteDiskFull(_)
        ));

        let plain = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        assert!(matches!(
            classify_io(plain, TransferError::UploadFailed),
            TransferError::UploadFailed(_)
        ));
    }

    #[test]
    fn test_connect_refused_is_connection_failure() {
        // Bind and release a port so nothing is listening on it
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = connect_tcp("127.0.0.1", port, Duration::from_secs(2)).unwrap_err();
        assert!(matches!(
            err,
            RowshipError::Transfer(TransferError::ConnectionFailed { .. })
        ));
        assert_eq!(err.exit_code(), 4);
    }
}
