//! Data source abstraction layer
//!
//! This module provides a trait-based abstraction over the table being
//! exported, so the exporter can be driven by PostgreSQL or MySQL in production and by
//! in-memory sources in tests.

pub mod factory;
pub mod traits;

pub use factory::create_row_source;
pub use traits::RowSource;
