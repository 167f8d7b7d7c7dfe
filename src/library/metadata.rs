//! Building a [`Record`] from a file on disk.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path};

use chrono::{DateTime, SubsecRound, Utc};
use lofty::file::TaggedFile;
use lofty::prelude::*;

use super::model::Record;
use crate::error::MetadataError;

/// Turns one file under the library root into a [`Record`].
///
/// Implementations must not block for long; a failure only drops that file
/// from the catalog.
pub trait RecordBuilder: Send + Sync {
    fn build(&self, path: &Path, root: &Path) -> Result<Record, MetadataError>;
}

impl<F> RecordBuilder for F
where
    F: Fn(&Path, &Path) -> Result<Record, MetadataError> + Send + Sync,
{
    fn build(&self, path: &Path, root: &Path) -> Result<Record, MetadataError> {
        self(path, root)
    }
}

/// Default builder: file system metadata plus tags read with `lofty`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TagReader;

impl RecordBuilder for TagReader {
    fn build(&self, path: &Path, root: &Path) -> Result<Record, MetadataError> {
        let stat_err = |source| MetadataError::Stat {
            path: path.to_path_buf(),
            source,
        };
        let info = fs::metadata(path).map_err(stat_err)?;
        let modified = info.modified().map_err(stat_err)?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| MetadataError::NoFileName {
                path: path.to_path_buf(),
            })?;
        let relative_path = relative_id(path, root).unwrap_or_else(|| filename.clone());

        let tagged = lofty::read_from_path(path).ok();
        let tags = tagged.as_ref().map(read_tags).unwrap_or_default();

        let title = tags.title.unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| filename.clone())
        });

        let (duration_seconds, bitrate_kbps) = match tagged.as_ref() {
            Some(t) if is_mp3(path) => mp3_timing(t, info.len()),
            _ => (None, None),
        };

        Ok(Record {
            id: relative_path.clone(),
            filename,
            relative_path,
            title,
            artist: tags.artist,
            album: tags.album,
            duration_seconds,
            bitrate_kbps,
            filesize_bytes: info.len(),
            modified_at: DateTime::<Utc>::from(modified).trunc_subsecs(0),
        })
    }
}

#[derive(Debug, Default)]
struct Tags {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
}

fn read_tags(tagged: &TaggedFile) -> Tags {
    let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
        return Tags::default();
    };
    Tags {
        title: non_blank(tag.title()),
        artist: non_blank(tag.artist()),
        album: non_blank(tag.album()),
    }
}

fn non_blank(value: Option<Cow<'_, str>>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_mp3(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mp3"))
}

/// Duration in seconds and average bitrate derived from file size.
fn mp3_timing(tagged: &TaggedFile, size: u64) -> (Option<f64>, Option<u32>) {
    let secs = tagged.properties().duration().as_secs_f64();
    if secs <= 0.0 {
        return (None, None);
    }
    let kbps = ((size as f64 * 8.0) / secs / 1000.0).round();
    let bitrate = (kbps >= 1.0).then_some(kbps as u32);
    (Some(secs), bitrate)
}

/// `path` relative to `root`, `/`-joined. `None` when `path` is not under `root`.
pub(crate) fn relative_id(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<Cow<'_, str>> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn relative_id_uses_forward_slashes() {
        let root = Path::new("/srv/audio");
        assert_eq!(
            relative_id(Path::new("/srv/audio/shows/ep1.mp3"), root).as_deref(),
            Some("shows/ep1.mp3")
        );
        assert_eq!(relative_id(Path::new("/elsewhere/ep1.mp3"), root), None);
        assert_eq!(relative_id(root, root), None);
    }

    #[test]
    fn is_mp3_is_case_insensitive() {
        assert!(is_mp3(Path::new("/tmp/a.mp3")));
        assert!(is_mp3(Path::new("/tmp/a.MP3")));
        assert!(!is_mp3(Path::new("/tmp/a.wav")));
        assert!(!is_mp3(Path::new("/tmp/mp3")));
    }

    #[test]
    fn untagged_file_falls_back_to_filename() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("shows").join("weekly");
        fs::create_dir_all(&nested).unwrap();
        let file = nested.join("Episode One.wav");
        fs::write(&file, b"not really audio").unwrap();

        let record = TagReader.build(&file, dir.path()).unwrap();
        assert_eq!(record.id, "shows/weekly/Episode One.wav");
        assert_eq!(record.relative_path, record.id);
        assert_eq!(record.filename, "Episode One.wav");
        assert_eq!(record.title, "Episode One");
        assert_eq!(record.artist, None);
        assert_eq!(record.album, None);
        assert_eq!(record.filesize_bytes, 16);
        assert_eq!(record.modified_at.nanosecond(), 0);
    }

    #[test]
    fn unreadable_mp3_has_no_duration_or_bitrate() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("broken.mp3");
        fs::write(&file, b"garbage").unwrap();

        let record = TagReader.build(&file, dir.path()).unwrap();
        assert_eq!(record.duration_seconds, None);
        assert_eq!(record.bitrate_kbps, None);
    }

    #[test]
    fn file_outside_root_uses_filename_as_id() {
        let root = tempdir().unwrap();
        let other = tempdir().unwrap();
        let file = other.path().join("stray.ogg");
        fs::write(&file, b"x").unwrap();

        let record = TagReader.build(&file, root.path()).unwrap();
        assert_eq!(record.id, "stray.ogg");
    }

    #[test]
    fn missing_file_is_a_stat_error() {
        let dir = tempdir().unwrap();
        let err = TagReader
            .build(&dir.path().join("gone.mp3"), dir.path())
            .unwrap_err();
        assert!(matches!(err, MetadataError::Stat { .. }));
    }

    #[test]
    fn serialized_record_omits_absent_optionals() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain.wav");
        fs::write(&file, b"x").unwrap();

        let record = TagReader.build(&file, dir.path()).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "plain.wav");
        assert_eq!(json["title"], "plain");
        assert!(json.get("artist").is_none());
        assert!(json.get("duration_seconds").is_none());
        assert!(json.get("bitrate_kbps").is_none());
        assert!(json.get("modified_at").is_some());
    }
}
