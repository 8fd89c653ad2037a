//! Error taxonomy shared by the snapshot model and the monitor

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for dirwatch operations
pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Error, Debug)]
pub enum MonitorError {
    /// Root or subdirectory missing or unreadable at snapshot time
    #[error("cannot access directory {}: {source}", path.display())]
    FilesystemAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Two snapshots of different directories were compared
    #[error("cannot diff snapshots of different directories: {} vs {}", before.display(), after.display())]
    MismatchedSnapshot { before: PathBuf, after: PathBuf },

    /// Lifecycle operation invoked from a state that does not permit it
    #[error("cannot {operation} a monitor that is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("polling delay must be greater than zero")]
    InvalidDelay,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to spawn polling thread: {0}")]
    Spawn(#[source] io::Error),
}

impl MonitorError {
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FilesystemAccess {
            path: path.into(),
            source,
        }
    }
}
