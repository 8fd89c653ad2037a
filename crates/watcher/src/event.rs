//! Change and status events delivered to listeners

use dirwatch_core::FileRecord;
use std::fmt;
use std::path::{Path, PathBuf};

/// Category of a detected change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Entry appeared
    Created,
    /// Entry's mtime or size changed
    Changed,
    /// Entry disappeared
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::Created => "created",
            ChangeKind::Changed => "changed",
            ChangeKind::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// One detected change
///
/// `before` is present for Changed and Deleted, `after` for Created and Changed.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    kind: ChangeKind,
    before: Option<FileRecord>,
    after: Option<FileRecord>,
}

impl ChangeEvent {
    pub fn created(after: FileRecord) -> Self {
        Self {
            kind: ChangeKind::Created,
            before: None,
            after: Some(after),
        }
    }

    pub fn changed(before: FileRecord, after: FileRecord) -> Self {
        Self {
            kind: ChangeKind::Changed,
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn deleted(before: FileRecord) -> Self {
        Self {
            kind: ChangeKind::Deleted,
            before: Some(before),
            after: None,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn before(&self) -> Option<&FileRecord> {
        self.before.as_ref()
    }

    pub fn after(&self) -> Option<&FileRecord> {
        self.after.as_ref()
    }

    /// Path of the affected entry
    pub fn path(&self) -> &Path {
        self.after
            .as_ref()
            .or(self.before.as_ref())
            .map(FileRecord::absolute_path)
            .unwrap_or_else(|| Path::new(""))
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path().display())
    }
}

/// Lifecycle transitions and transient failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorStatus {
    Started { root: PathBuf },
    Suspended,
    Resumed,
    Stopped,
    /// Snapshot capture failed this tick; retried on the next one
    ScanFailed { path: PathBuf, message: String },
    RecognizerFailed { recognizer: String, message: String },
    /// A listener returned an error or panicked while handling an event
    ListenerFailed { message: String },
}

impl MonitorStatus {
    /// Whether this status reports a failure rather than a transition
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            MonitorStatus::ScanFailed { .. }
                | MonitorStatus::RecognizerFailed { .. }
                | MonitorStatus::ListenerFailed { .. }
        )
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorStatus::Started { root } => write!(f, "monitoring started on {}", root.display()),
            MonitorStatus::Suspended => f.write_str("monitoring suspended"),
            MonitorStatus::Resumed => f.write_str("monitoring resumed"),
            MonitorStatus::Stopped => f.write_str("monitoring stopped"),
            MonitorStatus::ScanFailed { path, message } => {
                write!(f, "scan of {} failed: {}", path.display(), message)
            }
            MonitorStatus::RecognizerFailed { recognizer, message } => {
                write!(f, "recognizer {} failed: {}", recognizer, message)
            }
            MonitorStatus::ListenerFailed { message } => write!(f, "listener failed: {}", message),
        }
    }
}

/// Either kind of notification, as carried over a channel
#[derive(Debug, Clone)]
pub enum MonitorMessage {
    Change(ChangeEvent),
    Status(MonitorStatus),
}
