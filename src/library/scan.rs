use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::metadata::RecordBuilder;
use super::model::Record;
use crate::error::WatchError;
use crate::watch::Notifier;

/// Accepted file extensions (case-insensitive, stored without the dot).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions(HashSet<String>);

impl Extensions {
    pub fn new<I, S>(exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            exts.into_iter()
                .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        )
    }

    /// Case-insensitive extension match. Dotfiles such as `.mp3` have no
    /// extension and never match.
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(OsStr::to_str)
            .map(|ext| self.0.contains(&ext.to_ascii_lowercase()))
            .unwrap_or(false)
    }
}

/// Register a watch on `dir` and every directory already below it.
///
/// Failures are logged and skipped; returns how many directories are watched.
pub(crate) fn watch_tree(notifier: &Notifier, dir: &Path) -> usize {
    let mut watched = 0;
    for entry in WalkDir::new(dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "walk error while registering watches");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        match notifier.watch(entry.path()) {
            Ok(()) => {
                debug!(path = %entry.path().display(), "watching");
                watched += 1;
            }
            Err(e) => warn!(error = %e, "watch registration failed"),
        }
    }
    watched
}

/// Walk `root` and build a record for every accepted file, sorted by
/// relative path then filename.
///
/// Only an unreadable root fails the scan; errors below it and per-file
/// builder errors are logged and skipped.
pub fn scan(
    root: &Path,
    extensions: &Extensions,
    builder: &dyn RecordBuilder,
) -> Result<Vec<Record>, WatchError> {
    let mut records: Vec<Record> = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(WatchError::unreadable(root, e)),
            Err(e) => {
                let path = e.path().unwrap_or(root).display().to_string();
                warn!(%path, error = %e, "walk error");
                continue;
            }
        };

        let path = entry.path();
        if entry.file_type().is_dir() || !extensions.matches(path) {
            continue;
        }

        match builder.build(path, root) {
            Ok(record) => records.push(record),
            Err(e) => warn!(path = %path.display(), error = %e, "metadata error; skipping file"),
        }
    }

    records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    Ok(records)
}
