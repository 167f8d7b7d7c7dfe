//! Configuration loader and schema types.
//!
//! This module exposes the settings schema used to wire the watchers and
//! helpers to load it from disk and the environment.

mod load;
mod schema;

pub use load::{
    default_config_path, expand_home, resolve_audio_root, resolve_config_path, resolve_token_file,
};
pub use schema::*;
