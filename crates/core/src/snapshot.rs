//! Point-in-time capture of a directory's entries

use crate::error::{MonitorError, Result};
use crate::record::FileRecord;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::trace;
use walkdir::WalkDir;

/// Contents of a directory (or directory tree) at one instant
///
/// Entries are keyed by absolute path and kept in path order, so every
/// sequence derived from a snapshot is deterministic. The watched directory
/// itself is never an entry.
#[derive(Debug, Clone)]
pub struct DirectorySnapshot {
    /// Absolute path of the watched directory
    directory_path: PathBuf,
    /// Whether subdirectories were descended into
    recursive: bool,
    /// When the listing started
    captured_at: SystemTime,
    /// absolute path -> record
    entries: BTreeMap<PathBuf, FileRecord>,
}

impl DirectorySnapshot {
    /// List and stat every entry under `directory_path`
    ///
    /// Only immediate children are captured unless `recursive` is set, in
    /// which case every descendant file and directory is captured exactly
    /// once. Symlinks are recorded but not followed.
    ///
    /// Fails with [`MonitorError::FilesystemAccess`] when the directory is
    /// missing, is not a directory, or cannot be listed, and likewise when any
    /// subdirectory cannot be listed or any entry cannot be stat'ed. Entries
    /// that vanish mid-listing are skipped.
    pub fn capture(directory_path: &Path, recursive: bool) -> Result<Self> {
        let root = std::path::absolute(directory_path)
            .map_err(|e| MonitorError::filesystem(directory_path, e))?;

        let metadata = fs::metadata(&root).map_err(|e| MonitorError::filesystem(&root, e))?;
        if !metadata.is_dir() {
            return Err(MonitorError::filesystem(
                &root,
                io::Error::new(io::ErrorKind::Other, "not a directory"),
            ));
        }

        // Surface permission problems on the root itself instead of an empty listing
        fs::read_dir(&root).map_err(|e| MonitorError::filesystem(&root, e))?;

        let captured_at = SystemTime::now();
        let mut walker = WalkDir::new(&root).min_depth(1).follow_links(false);
        if !recursive {
            walker = walker.max_depth(1);
        }

        let mut entries = BTreeMap::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() > 0 && is_vanished(err.io_error()) => {
                    trace!("Skipping vanished entry: {}", err);
                    continue;
                }
                Err(err) => {
                    let path = err.path().unwrap_or(root.as_path()).to_path_buf();
                    let source = err
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "directory walk failed"));
                    return Err(MonitorError::filesystem(path, source));
                }
            };

            // Entry may have been removed between listing and stat
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) if is_vanished(err.io_error()) => {
                    trace!("Skipping {}: {}", entry.path().display(), err);
                    continue;
                }
                Err(err) => {
                    let source = err
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "stat failed"));
                    return Err(MonitorError::filesystem(entry.path(), source));
                }
            };

            let path = entry.into_path();
            entries.insert(path.clone(), FileRecord::from_metadata(path, &metadata, captured_at));
        }

        Ok(Self {
            directory_path: root,
            recursive,
            captured_at,
            entries,
        })
    }

    /// Build a snapshot from already captured records
    ///
    /// Records with duplicate paths collapse to the last one given.
    pub fn from_records(
        directory_path: impl Into<PathBuf>,
        records: impl IntoIterator<Item = FileRecord>,
    ) -> Self {
        let entries = records
            .into_iter()
            .map(|record| (record.absolute_path().to_path_buf(), record))
            .collect();

        Self {
            directory_path: directory_path.into(),
            recursive: false,
            captured_at: SystemTime::now(),
            entries,
        }
    }

    pub fn directory_path(&self) -> &Path {
        &self.directory_path
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&FileRecord> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Records in path order
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.entries.values()
    }

    /// Paths in order
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(PathBuf::as_path)
    }
}

/// Whether a walk error just means the entry disappeared after being listed
fn is_vanished(err: Option<&io::Error>) -> bool {
    matches!(err.map(io::Error::kind), Some(io::ErrorKind::NotFound))
}
