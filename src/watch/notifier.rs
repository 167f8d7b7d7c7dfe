//! Change notifier built on `notify`.
//!
//! Wraps a `RecommendedWatcher` whose callback forwards raw events into a
//! crossbeam channel. Watches are registered one directory at a time
//! (non-recursive), so callers decide which subtrees are observed.

use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, unbounded};
use notify::event::{EventKind, ModifyKind};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::WatchError;

/// Raw notifier output, consumed by the event pump.
pub type EventStream = Receiver<notify::Result<notify::Event>>;

/// Kind of change reported for a path.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChangeOp {
    Create,
    Write,
    Remove,
    Rename,
}

impl ChangeOp {
    /// Map a `notify` event kind; access and metadata-only events map to `None`.
    pub fn from_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(ChangeOp::Create),
            EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeOp::Rename),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(ChangeOp::Write),
            EventKind::Remove(_) => Some(ChangeOp::Remove),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
        }
    }

    /// Removals and renames may concern a path that no longer exists.
    pub fn is_removal(self) -> bool {
        matches!(self, ChangeOp::Remove | ChangeOp::Rename)
    }
}

/// A single path-level change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub op: ChangeOp,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, op: ChangeOp) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }

    /// Split a `notify` event into one change per reported path.
    pub fn from_notify(event: notify::Event) -> Vec<ChangeEvent> {
        let Some(op) = ChangeOp::from_kind(&event.kind) else {
            return Vec::new();
        };
        event
            .paths
            .into_iter()
            .map(|path| ChangeEvent { path, op })
            .collect()
    }
}

/// Owns the OS watcher. Closing drops it, which ends the event stream.
pub struct Notifier {
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl Notifier {
    /// Create a notifier and the stream its events arrive on.
    pub fn new() -> Result<(Self, EventStream), WatchError> {
        let (tx, rx) = unbounded();
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            // The receiver is gone once the pump has exited; nothing to do.
            let _ = tx.send(res);
        })?;

        Ok((
            Self {
                watcher: Mutex::new(Some(watcher)),
            },
            rx,
        ))
    }

    /// Register a non-recursive watch. A closed notifier ignores the request.
    pub fn watch(&self, path: &Path) -> Result<(), WatchError> {
        let mut guard = self.watcher.lock();
        let Some(watcher) = guard.as_mut() else {
            debug!(path = %path.display(), "notifier closed; watch not registered");
            return Ok(());
        };
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Drop the OS watcher, ending the event stream. Closing twice is a no-op.
    pub fn close(&self) {
        drop(self.watcher.lock().take());
    }

    pub fn is_closed(&self) -> bool {
        self.watcher.lock().is_none()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("closed", &self.is_closed())
            .finish()
    }
}
