//! Comparison of two snapshots of the same directory

use crate::error::{MonitorError, Result};
use crate::record::FileRecord;
use crate::snapshot::DirectorySnapshot;

/// Differences between a `before` and an `after` snapshot
///
/// Nothing is precomputed; each accessor walks the snapshots and returns
/// records in path order. A path present in both snapshots counts as
/// modified only when its mtime or size changed.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotDiff<'a> {
    before: &'a DirectorySnapshot,
    after: &'a DirectorySnapshot,
}

impl<'a> SnapshotDiff<'a> {
    /// Pair two snapshots for comparison
    ///
    /// Both must have been taken of the same directory.
    pub fn new(before: &'a DirectorySnapshot, after: &'a DirectorySnapshot) -> Result<Self> {
        if before.directory_path() != after.directory_path() {
            return Err(MonitorError::MismatchedSnapshot {
                before: before.directory_path().to_path_buf(),
                after: after.directory_path().to_path_buf(),
            });
        }
        Ok(Self { before, after })
    }

    pub fn before(&self) -> &'a DirectorySnapshot {
        self.before
    }

    pub fn after(&self) -> &'a DirectorySnapshot {
        self.after
    }

    /// Records present only in `after`
    pub fn created_files(&self) -> Vec<&'a FileRecord> {
        self.after
            .records()
            .filter(|record| !self.before.contains(record.absolute_path()))
            .collect()
    }

    /// Records present only in `before`
    pub fn deleted_files(&self) -> Vec<&'a FileRecord> {
        self.before
            .records()
            .filter(|record| !self.after.contains(record.absolute_path()))
            .collect()
    }

    /// (before, after) pairs for common paths whose mtime or size changed
    pub fn modified_files(&self) -> Vec<(&'a FileRecord, &'a FileRecord)> {
        self.common()
            .filter(|(old, new)| old.differs_from(new))
            .collect()
    }

    /// Current records of modified paths
    pub fn modified_current(&self) -> Vec<&'a FileRecord> {
        self.modified_files().into_iter().map(|(_, new)| new).collect()
    }

    /// Number of common paths that did not change
    pub fn unchanged_count(&self) -> usize {
        self.common().filter(|(old, new)| !old.differs_from(new)).count()
    }

    /// Check if there are any changes
    pub fn is_empty(&self) -> bool {
        self.created_files().is_empty()
            && self.deleted_files().is_empty()
            && self.modified_files().is_empty()
    }

    fn common(&self) -> impl Iterator<Item = (&'a FileRecord, &'a FileRecord)> + '_ {
        let after = self.after;
        self.before
            .records()
            .filter_map(move |old| after.get(old.absolute_path()).map(|new| (old, new)))
    }
}
