//! Snapshot model and change detection for dirwatch
//!
//! This crate provides:
//! - File records (path-keyed stat captures)
//! - Directory snapshots (flat or recursive)
//! - Snapshot diffing (created / deleted / modified)
//! - The shared error type

pub mod diff;
pub mod error;
pub mod record;
pub mod snapshot;

// Re-exports
pub use diff::SnapshotDiff;
pub use error::{MonitorError, Result};
pub use record::FileRecord;
pub use snapshot::DirectorySnapshot;
