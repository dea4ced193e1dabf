//! PostgreSQL data source
//!
//! This module provides the pooled client and the keyset row source used to
//! page rows out of the exported table.

pub mod client;
pub mod source;

pub use client::PostgreSQLClient;
pub use source::PostgreSQLRowSource;
