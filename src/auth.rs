//! Feed token authorisation backed by a watched token file.

mod store;
mod tokens;

pub use store::TokenStore;
pub use tokens::{TokenSet, load, parse};

/// Narrow view used by request handlers to check a feed token.
pub trait TokenValidator: Send + Sync {
    fn is_valid(&self, token: &str) -> bool;
}
