//! MySQL data source
//!
//! This module provides the pooled client and the keyset row source for
//! MySQL and MariaDB tables.

pub mod client;
pub mod source;

pub use client::MySqlClient;
pub use source::MySqlRowSource;
