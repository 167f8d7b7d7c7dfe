//! Error types for the watchers and the record builder.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from constructing, refreshing or closing a watcher.
///
/// Reasons are carried as rendered strings so the same outcome can be handed
/// to every caller of an idempotent `close()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatchError {
    #[error("Failed to initialize change notifier: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Cannot read {path}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("Failed to spawn {worker} worker: {reason}")]
    SpawnFailed { worker: String, reason: String },

    #[error("{worker} worker panicked")]
    WorkerPanicked { worker: String },
}

impl WatchError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        WatchError::SourceUnreadable {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}

/// Per-file failure while building a catalog record.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Cannot stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} has no file name")]
    NoFileName { path: PathBuf },
}
