//! Point-in-time record of a single filesystem entry

use std::cmp::Ordering;
use std::fs::Metadata;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Observable attributes of one entry at capture time
///
/// Two records are equal when their paths are equal; the remaining
/// attributes never take part in equality, ordering or hashing.
#[derive(Debug, Clone)]
pub struct FileRecord {
    absolute_path: PathBuf,
    is_directory: bool,
    last_modified_epoch_millis: u64,
    size_bytes: u64,
    captured_at: SystemTime,
}

impl FileRecord {
    /// Build a record from explicit attribute values
    pub fn new(
        absolute_path: impl Into<PathBuf>,
        is_directory: bool,
        last_modified_epoch_millis: u64,
        size_bytes: u64,
        captured_at: SystemTime,
    ) -> Self {
        Self {
            absolute_path: absolute_path.into(),
            is_directory,
            last_modified_epoch_millis,
            size_bytes,
            captured_at,
        }
    }

    /// Build a record from a live stat
    ///
    /// An mtime the platform cannot report, or one before the epoch, is stored as 0.
    pub fn from_metadata(absolute_path: PathBuf, metadata: &Metadata, captured_at: SystemTime) -> Self {
        let last_modified_epoch_millis = metadata
            .modified()
            .ok()
            .and_then(|mtime| mtime.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            absolute_path,
            is_directory: metadata.is_dir(),
            last_modified_epoch_millis,
            size_bytes: metadata.len(),
            captured_at,
        }
    }

    pub fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn last_modified_epoch_millis(&self) -> u64 {
        self.last_modified_epoch_millis
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    /// Final path component, if any
    pub fn file_name(&self) -> Option<&str> {
        self.absolute_path.file_name().and_then(|n| n.to_str())
    }

    /// True when mtime or size differ
    pub fn differs_from(&self, other: &FileRecord) -> bool {
        self.last_modified_epoch_millis != other.last_modified_epoch_millis
            || self.size_bytes != other.size_bytes
    }
}

impl PartialEq for FileRecord {
    fn eq(&self, other: &Self) -> bool {
        self.absolute_path == other.absolute_path
    }
}

impl Eq for FileRecord {}

impl Hash for FileRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.absolute_path.hash(state);
    }
}

impl PartialOrd for FileRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FileRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.absolute_path.cmp(&other.absolute_path)
    }
}
