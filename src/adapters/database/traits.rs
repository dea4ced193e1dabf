//! Data source abstraction traits
//!
//! This module defines the trait that row sources must implement to feed the
//! exporter.

use crate::domain::{Page, Result, RowId};
use async_trait::async_trait;

/// Keyset paginator over a single append-only table
///
/// Every call uses the same filter and ordering, so a run that feeds each
/// page's last identifier back in as the next `lower_bound` never skips or
/// repeats a row.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Fetch the next page
    ///
    /// Returns rows with identifier strictly greater than `lower_bound`,
    /// ordered ascending, at most `limit` of them. An empty page means no
    /// more rows qualify.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::DataSourceError`] (wrapped) on connection or
    /// query failure, or when a row's identifier is missing or not a
    /// non-negative integer.
    async fn next_page(&self, lower_bound: RowId, limit: usize) -> Result<Page>;

    /// Check that the source is reachable
    async fn test_connection(&self) -> Result<()>;

    /// Human-readable description of the source, without credentials
    fn describe(&self) -> String;

    /// Release pooled connections
    ///
    /// Called on every exit path of a run. The default does nothing.
    async fn close(&self) {}
}
