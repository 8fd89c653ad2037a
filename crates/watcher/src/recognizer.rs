//! Recognizers turn a snapshot diff into typed change events
//!
//! Each recognizer handles one change category and holds configuration
//! only; both snapshots are passed in on every call.

use crate::event::{ChangeEvent, ChangeKind};
use crate::filter::PathFilter;
use dirwatch_core::{DirectorySnapshot, FileRecord, Result, SnapshotDiff};
use std::sync::Arc;

/// Classifier for one category of change
pub trait ChangeRecognizer: Send + Sync {
    /// Name used in logs and status events
    fn name(&self) -> &str;

    /// Category of events this recognizer produces
    fn kind(&self) -> ChangeKind;

    /// Events for every matching entry, in path order
    ///
    /// Fails when the snapshots were taken of different directories.
    fn recognize(&self, before: &DirectorySnapshot, after: &DirectorySnapshot) -> Result<Vec<ChangeEvent>>;
}

fn passes(filter: &Option<PathFilter>, record: &FileRecord) -> bool {
    filter.as_ref().map_or(true, |f| f.accepts_record(record))
}

/// Reports entries that appeared
#[derive(Debug, Clone, Default)]
pub struct CreatedRecognizer {
    filter: Option<PathFilter>,
}

impl CreatedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: PathFilter) -> Self {
        Self { filter: Some(filter) }
    }
}

impl ChangeRecognizer for CreatedRecognizer {
    fn name(&self) -> &str {
        "created"
    }

    fn kind(&self) -> ChangeKind {
        ChangeKind::Created
    }

    fn recognize(&self, before: &DirectorySnapshot, after: &DirectorySnapshot) -> Result<Vec<ChangeEvent>> {
        let diff = SnapshotDiff::new(before, after)?;
        Ok(diff
            .created_files()
            .into_iter()
            .filter(|record| passes(&self.filter, record))
            .map(|record| ChangeEvent::created(record.clone()))
            .collect())
    }
}

/// Reports entries whose mtime or size changed
#[derive(Debug, Clone, Default)]
pub struct ChangedRecognizer {
    filter: Option<PathFilter>,
}

impl ChangedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: PathFilter) -> Self {
        Self { filter: Some(filter) }
    }
}

impl ChangeRecognizer for ChangedRecognizer {
    fn name(&self) -> &str {
        "changed"
    }

    fn kind(&self) -> ChangeKind {
        ChangeKind::Changed
    }

    fn recognize(&self, before: &DirectorySnapshot, after: &DirectorySnapshot) -> Result<Vec<ChangeEvent>> {
        let diff = SnapshotDiff::new(before, after)?;
        Ok(diff
            .modified_files()
            .into_iter()
            .filter(|(_, new)| passes(&self.filter, new))
            .map(|(old, new)| ChangeEvent::changed(old.clone(), new.clone()))
            .collect())
    }
}

/// Reports entries that disappeared
#[derive(Debug, Clone, Default)]
pub struct DeletedRecognizer {
    filter: Option<PathFilter>,
}

impl DeletedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: PathFilter) -> Self {
        Self { filter: Some(filter) }
    }
}

impl ChangeRecognizer for DeletedRecognizer {
    fn name(&self) -> &str {
        "deleted"
    }

    fn kind(&self) -> ChangeKind {
        ChangeKind::Deleted
    }

    fn recognize(&self, before: &DirectorySnapshot, after: &DirectorySnapshot) -> Result<Vec<ChangeEvent>> {
        let diff = SnapshotDiff::new(before, after)?;
        Ok(diff
            .deleted_files()
            .into_iter()
            .filter(|record| passes(&self.filter, record))
            .map(|record| ChangeEvent::deleted(record.clone()))
            .collect())
    }
}

/// Created, Changed and Deleted recognizers sharing one optional filter
pub fn standard_recognizers(filter: Option<PathFilter>) -> Vec<Arc<dyn ChangeRecognizer>> {
    match filter {
        Some(filter) => vec![
            Arc::new(CreatedRecognizer::with_filter(filter.clone())),
            Arc::new(ChangedRecognizer::with_filter(filter.clone())),
            Arc::new(DeletedRecognizer::with_filter(filter)),
        ],
        None => vec![
            Arc::new(CreatedRecognizer::new()),
            Arc::new(ChangedRecognizer::new()),
            Arc::new(DeletedRecognizer::new()),
        ],
    }
}
