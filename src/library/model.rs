use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata exposed for a single audio file under the library root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Stable identifier; always equal to `relative_path`.
    pub id: String,
    pub filename: String,
    /// Path relative to the library root, `/`-separated on every platform.
    pub relative_path: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// Only known for mp3 files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    pub filesize_bytes: u64,
    /// Whole seconds, UTC.
    pub modified_at: DateTime<Utc>,
}

impl Record {
    /// Ordering used for published snapshots: relative path, then filename.
    pub fn sort_key(&self) -> (&str, &str) {
        (&self.relative_path, &self.filename)
    }
}
