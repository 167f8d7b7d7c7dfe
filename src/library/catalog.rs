//! [`Catalog`]: a watched, always-sorted list of the audio files under one
//! root directory.
//!
//! Every directory below the root gets its own non-recursive watch; new or
//! moved-in directories are registered as their events arrive. A failed
//! rescan leaves the previous list published.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, info_span, warn};

use super::metadata::{RecordBuilder, TagReader};
use super::model::Record;
use super::scan::{Extensions, scan, watch_tree};
use super::EpisodeSource;
use crate::error::WatchError;
use crate::watch::{
    ChangeEvent, ChangeOp, Engine, Notifier, RefreshScheduler, Snapshot, absolutize,
};

/// Source of truth for a catalog: the root, its filter and the builder.
struct CatalogSource {
    root: PathBuf,
    extensions: Extensions,
    builder: Box<dyn RecordBuilder>,
    records: Snapshot<Vec<Record>>,
}

impl CatalogSource {
    /// Rescan from scratch and publish; the write lock is held only for the swap.
    fn refresh(&self) -> Result<(), WatchError> {
        let records = scan(&self.root, &self.extensions, self.builder.as_ref())?;
        let count = records.len();
        self.records.publish(records);
        info!(count, "library refreshed");
        Ok(())
    }

    /// Whether a change can affect the catalog.
    ///
    /// Removals and renames always count: the path may have lost its
    /// extension or have been a tracked file.
    fn wants_refresh(&self, change: &ChangeEvent) -> bool {
        change.op.is_removal() || self.extensions.matches(&change.path)
    }
}

/// Live, ordered catalog of the audio files under a directory root.
///
/// Reads return a copy of the last published scan and never touch the disk.
pub struct Catalog {
    source: Arc<CatalogSource>,
    engine: Engine,
}

impl Catalog {
    /// Open a catalog using the tag-reading [`TagReader`] builder.
    pub fn open<S: AsRef<str>>(
        root: &Path,
        extensions: &[S],
        debounce: Duration,
    ) -> Result<Self, WatchError> {
        Self::with_builder(root, extensions, debounce, TagReader)
    }

    /// Open a catalog with a custom record builder.
    ///
    /// Watches the root and every existing subdirectory, performs one
    /// synchronous scan, then starts the background pump. Fails if the
    /// notifier cannot start or the root cannot be read.
    pub fn with_builder<S, B>(
        root: &Path,
        extensions: &[S],
        debounce: Duration,
        builder: B,
    ) -> Result<Self, WatchError>
    where
        S: AsRef<str>,
        B: RecordBuilder + 'static,
    {
        let root = absolutize(root).map_err(|e| WatchError::unreadable(root, e))?;
        let span = info_span!("catalog", root = %root.display());
        let _entered = span.enter();

        let (notifier, events) = Notifier::new()?;
        let notifier = Arc::new(notifier);
        let watched = watch_tree(&notifier, &root);
        debug!(directories = watched, "watches registered");

        let source = Arc::new(CatalogSource {
            root,
            extensions: Extensions::new(extensions),
            builder: Box::new(builder),
            records: Snapshot::default(),
        });

        // Dropping the notifier on the error path ends its stream.
        source.refresh()?;

        let scheduler = {
            let source = Arc::clone(&source);
            Arc::new(RefreshScheduler::spawn("catalog", debounce, move || {
                source.refresh()
            })?)
        };

        let handler = {
            let source = Arc::clone(&source);
            let notifier = Arc::clone(&notifier);
            let scheduler = Arc::clone(&scheduler);
            move |change: ChangeEvent| {
                // Moved-in directories arrive as renames; either may already be populated.
                if matches!(change.op, ChangeOp::Create | ChangeOp::Rename) && change.path.is_dir() {
                    watch_tree(&notifier, &change.path);
                }
                if source.wants_refresh(&change) {
                    debug!(path = %change.path.display(), op = ?change.op, "scheduling refresh");
                    scheduler.notify();
                }
            }
        };

        let engine = Engine::start("catalog", notifier, events, scheduler, handler)?;
        Ok(Self { source, engine })
    }

    /// Copy of the current records, sorted by relative path.
    pub fn list(&self) -> Vec<Record> {
        self.source.records.get()
    }

    pub fn len(&self) -> usize {
        self.source.records.with(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn root(&self) -> &Path {
        &self.source.root
    }

    /// Stop watching. Idempotent; the last snapshot stays readable.
    pub fn close(&self) -> Result<(), WatchError> {
        self.engine.close()
    }
}

impl EpisodeSource for Catalog {
    fn list(&self) -> Vec<Record> {
        Catalog::list(self)
    }
}

impl Drop for Catalog {
    fn drop(&mut self) {
        if !self.engine.is_closed()
            && let Err(e) = self.engine.close()
        {
            warn!(error = %e, "closing library watcher on drop failed");
        }
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("root", &self.source.root)
            .field("records", &self.len())
            .field("closed", &self.engine.is_closed())
            .finish()
    }
}
