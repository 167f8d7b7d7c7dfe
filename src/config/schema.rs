use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/homecast/config.toml` or `~/.config/homecast/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `HOMECAST__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub library: LibrarySettings,
    pub tokens: TokenSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Directory scanned for audio files. A leading `~` is expanded.
    pub root: PathBuf,
    /// File extensions to treat as audio (case-insensitive, dot optional).
    pub extensions: Vec<String>,
    /// Quiet period before a rescan after file system changes (milliseconds).
    /// 0 rescans on the next tick without coalescing.
    pub debounce_ms: u64,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("audio"),
            extensions: ["mp3", "m4a", "aac", "wav", "flac", "ogg"]
                .into_iter()
                .map(String::from)
                .collect(),
            debounce_ms: 500,
        }
    }
}

impl LibrarySettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    /// Token file, one token per line. Unset disables token checks.
    pub file: Option<PathBuf>,
    /// Quiet period before the token file is re-read (milliseconds).
    pub debounce_ms: u64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            file: None,
            debounce_ms: 500,
        }
    }
}

impl TokenSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive, e.g. `info` or `homecast=debug`.
    /// `RUST_LOG` overrides it when set.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
