// Checkpoint tracking for incremental exports

pub mod checkpoint;
pub mod manager;

pub use checkpoint::{CheckpointRead, CheckpointStore, FileCheckpointStore};
pub use manager::StateManager;
