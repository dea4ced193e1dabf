//! Export orchestration
//!
//! This module provides the core run logic for rowship:
//! - CSV artifact writing
//! - The page-driven export loop
//! - Run control and reporting

pub mod artifact;
pub mod controller;
pub mod exporter;
pub mod summary;

pub use artifact::{artifact_file_name, ArtifactInfo, CsvArtifactWriter, LocalArtifact, PageSink};
pub use controller::{RunController, RunOptions};
pub use exporter::{Exporter, RunOutcome};
pub use summary::{RunState, RunSummary};
