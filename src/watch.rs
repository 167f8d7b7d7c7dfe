//! Watch-debounce-refresh engine shared by the catalog and the token store.
//!
//! ```text
//! notify ──► Notifier ──► event pump thread ──► RefreshScheduler ──► refresh()
//!                          (filters events)       (debounce timer)      │
//!                                                                       ▼
//!                                        readers ◄── Snapshot<T> ◄── publish
//! ```
//!
//! Two locks are involved and they never nest: the scheduler's timer lock
//! and the snapshot's reader/writer lock.

mod debounce;
mod engine;
mod notifier;
mod snapshot;

pub use debounce::RefreshScheduler;
pub(crate) use engine::Engine;
pub use notifier::{ChangeEvent, ChangeOp, EventStream, Notifier};
pub use snapshot::Snapshot;

use std::path::{Component, Path, PathBuf};

/// Lexically normalise a path: drops `.` components and redundant
/// separators so notifier paths compare equal to configured ones.
pub fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Absolute, normalised form of `path` (no symlink resolution).
pub(crate) fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    Ok(normalize(&std::path::absolute(path)?))
}

#[cfg(test)]
mod tests;
