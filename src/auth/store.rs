use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, info_span, trace, warn};

use super::TokenValidator;
use super::tokens::{TokenSet, load};
use crate::error::WatchError;
use crate::watch::{
    ChangeEvent, Engine, Notifier, RefreshScheduler, Snapshot, absolutize, normalize,
};

struct TokenSource {
    file: PathBuf,
    tokens: Snapshot<TokenSet>,
}

impl TokenSource {
    fn refresh(&self) -> Result<(), WatchError> {
        let tokens = load(&self.file)?;
        let count = tokens.len();
        self.tokens.publish(tokens);
        info!(count, "feed tokens loaded");
        Ok(())
    }

    /// Only the token file itself matters; siblings in the watched
    /// directory are ignored.
    fn concerns(&self, change: &ChangeEvent) -> bool {
        normalize(&change.path) == self.file
    }
}

/// Set of authorised feed tokens backed by a single file.
///
/// The parent directory is watched so editors that replace the file by
/// rename are still noticed. A missing file means no token is valid.
pub struct TokenStore {
    source: Arc<TokenSource>,
    engine: Engine,
}

impl TokenStore {
    /// Watch `file`, load it once, then keep it fresh.
    ///
    /// Fails if the notifier cannot start, the parent directory cannot be
    /// watched or the file exists but cannot be read.
    pub fn open(file: &Path, debounce: Duration) -> Result<Self, WatchError> {
        let file = absolutize(file).map_err(|e| WatchError::unreadable(file, e))?;
        let span = info_span!("tokens", file = %file.display());
        let _entered = span.enter();

        let dir = file
            .parent()
            .ok_or_else(|| WatchError::unreadable(&file, "token file has no parent directory"))?
            .to_path_buf();

        let (notifier, events) = Notifier::new()?;
        let notifier = Arc::new(notifier);
        notifier.watch(&dir)?;
        if let Err(e) = notifier.watch(&file) {
            debug!(error = %e, "token file not watched directly; relying on directory watch");
        }

        let source = Arc::new(TokenSource {
            file,
            tokens: Snapshot::default(),
        });
        source.refresh()?;

        let scheduler = {
            let source = Arc::clone(&source);
            Arc::new(RefreshScheduler::spawn("tokens", debounce, move || {
                source.refresh()
            })?)
        };

        let handler = {
            let source = Arc::clone(&source);
            let scheduler = Arc::clone(&scheduler);
            move |change: ChangeEvent| {
                if source.concerns(&change) {
                    debug!(op = ?change.op, "token file changed; scheduling reload");
                    scheduler.notify();
                } else {
                    trace!(path = %change.path.display(), "ignoring sibling change");
                }
            }
        };

        let engine = Engine::start("tokens", notifier, events, scheduler, handler)?;
        Ok(Self { source, engine })
    }

    /// Whether `token` (trimmed) is currently authorised. Blank is never valid.
    pub fn is_valid(&self, token: &str) -> bool {
        let token = token.trim();
        if token.is_empty() {
            return false;
        }
        self.source.tokens.with(|tokens| tokens.contains(token))
    }

    pub fn len(&self) -> usize {
        self.source.tokens.with(TokenSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn file(&self) -> &Path {
        &self.source.file
    }

    /// Stop watching. Idempotent; validation keeps using the last token set.
    pub fn close(&self) -> Result<(), WatchError> {
        self.engine.close()
    }
}

impl TokenValidator for TokenStore {
    fn is_valid(&self, token: &str) -> bool {
        TokenStore::is_valid(self, token)
    }
}

impl Drop for TokenStore {
    fn drop(&mut self) {
        if !self.engine.is_closed()
            && let Err(e) = self.engine.close()
        {
            warn!(error = %e, "closing token watcher on drop failed");
        }
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("file", &self.source.file)
            .field("tokens", &self.len())
            .field("closed", &self.engine.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::ChangeOp;

    #[test]
    fn only_the_token_file_is_a_concern() {
        let source = TokenSource {
            file: PathBuf::from("/srv/feed/tokens.txt"),
            tokens: Snapshot::default(),
        };
        let change = |path: &str, op| ChangeEvent::new(path, op);

        assert!(source.concerns(&change("/srv/feed/tokens.txt", ChangeOp::Write)));
        assert!(source.concerns(&change("/srv/feed/./tokens.txt", ChangeOp::Rename)));
        assert!(!source.concerns(&change("/srv/feed/other.txt", ChangeOp::Write)));
        assert!(!source.concerns(&change("/srv/feed/tokens.txt.swp", ChangeOp::Create)));
        assert!(!source.concerns(&change("/srv/feed", ChangeOp::Write)));
    }
}
