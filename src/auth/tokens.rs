//! Token file format: one token per line, surrounding whitespace trimmed,
//! blank lines ignored.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::info;

use crate::error::WatchError;

pub type TokenSet = HashSet<String>;

pub fn parse(contents: &str) -> TokenSet {
    contents
        .lines()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read and parse the token file. A missing file yields an empty set; any
/// other read failure is an error so the caller can keep its old tokens.
pub fn load(path: &Path) -> Result<TokenSet, WatchError> {
    match fs::read(path) {
        Ok(bytes) => Ok(parse(&String::from_utf8_lossy(&bytes))),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(file = %path.display(), "token file missing; no tokens loaded");
            Ok(TokenSet::new())
        }
        Err(e) => Err(WatchError::unreadable(path, e)),
    }
}
