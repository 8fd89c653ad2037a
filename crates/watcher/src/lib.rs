//! Polling directory monitor for dirwatch
//!
//! This crate provides:
//! - A background polling loop with start/suspend/resume/stop lifecycle
//! - Created/Changed/Deleted recognizers over snapshot diffs
//! - Include/exclude path filters (gitignore syntax)
//! - Listener fan-out with per-listener failure isolation
//! - TOML configuration

pub mod config;
pub mod event;
pub mod filter;
pub mod listener;
pub mod monitor;
pub mod recognizer;

// Re-exports
pub use config::MonitorConfig;
pub use dirwatch_core::{DirectorySnapshot, FileRecord, MonitorError, Result, SnapshotDiff};
pub use event::{ChangeEvent, ChangeKind, MonitorMessage, MonitorStatus};
pub use filter::PathFilter;
pub use listener::{ChannelListener, FnListener, MonitorListener};
pub use monitor::{DirectoryMonitor, MonitorState};
pub use recognizer::{
    standard_recognizers, ChangeRecognizer, ChangedRecognizer, CreatedRecognizer, DeletedRecognizer,
};
