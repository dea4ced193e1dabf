//! Artifact delivery to the remote destination
//!
//! The delivery protocol ([`delivery::deliver_atomically`]) is written
//! against the small [`RemoteFileSystem`] trait; [`SftpTransferAgent`]
//! drives it over an SSH session.

pub mod delivery;
pub mod sftp;
pub mod traits;

pub use delivery::{deliver_atomically, expand_home, remote_join};
pub use sftp::SftpTransferAgent;
pub use traits::{DeliveryReceipt, RemoteFileSystem, TransferAgent};
