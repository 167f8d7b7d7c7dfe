//! Audio library catalog.
//!
//! A [`Catalog`] keeps an ordered list of [`Record`]s for every accepted
//! audio file below a root directory and rescans (debounced) whenever the
//! tree changes, including inside directories created after startup.

mod catalog;
mod metadata;
mod model;
mod scan;

pub use catalog::Catalog;
pub use metadata::{RecordBuilder, TagReader};
pub use model::Record;
pub use scan::{Extensions, scan};

/// Read-only view of the catalog used by the serving layer.
pub trait EpisodeSource: Send + Sync {
    /// Current records, sorted by relative path. The caller owns the copy.
    fn list(&self) -> Vec<Record>;
}
