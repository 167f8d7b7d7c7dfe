//! Live, watched snapshots of a local audio library and its feed tokens.
//!
//! [`Catalog`] keeps an ordered list of [`Record`]s for an audio directory;
//! [`TokenStore`] keeps the set of feed tokens from a token file. Both rescan
//! their source (debounced) when the file system reports changes and publish
//! the result atomically, so reads are cheap and never touch the disk.
//!
//! ```no_run
//! use std::path::Path;
//! use std::time::Duration;
//!
//! let catalog = homecast::Catalog::open(Path::new("audio"), &["mp3", "ogg"], Duration::from_millis(500))?;
//! for record in catalog.list() {
//!     println!("{}  {}", record.relative_path, record.title);
//! }
//! catalog.close()?;
//! # Ok::<(), homecast::WatchError>(())
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod library;
pub mod logging;
pub mod watch;

pub use auth::{TokenStore, TokenValidator};
pub use error::{MetadataError, WatchError};
pub use library::{Catalog, EpisodeSource, Record, RecordBuilder, TagReader};
