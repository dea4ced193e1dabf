//! Domain models and types for rowship.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Row identifiers** ([`RowId`]), used for checkpoints and pagination bounds
//! - **Generic rows** ([`Row`], [`Field`]) and bounded batches ([`Page`])
//! - **Error types** ([`RowshipError`], [`DataSourceError`], [`TransferError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, RowshipError>`]:
//!
//! ```rust
//! use rowship::domain::{Result, RowId};
//! use std::str::FromStr;
//!
//! fn parse_checkpoint(text: &str) -> Result<RowId> {
//!     RowId::from_str(text).map_err(rowship::domain::RowshipError::Validation)
//! }
//! # assert!(parse_checkpoint("10").is_ok());
//! ```

pub mod errors;
pub mod ids;
pub mod result;
pub mod row;

// Re-export commonly used types for convenience
pub use errors::{DataSourceError, RowshipError, TransferError};
pub use ids::RowId;
pub use result::Result;
pub use row::{Field, Page, Row};
