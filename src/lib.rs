//! Shortcut folders
//!
//! Data layer for an app-shortcut organizer: named folders of app shortcuts
//! kept in a key-value store, plus additive sync against a per-user remote
//! document. Presentation is left to callers, which use [`commands`] to get
//! results ready to show.

pub mod apps;
pub mod commands;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod folders;
pub mod models;
pub mod storage;
pub mod sync;

pub use error::{FolderError, RemoteError, Result, StorageError};
pub use folders::FolderStore;
pub use models::{AppRef, Folder, MergeOutcome, MergeReport};

/// Initialises logging once. `RUST_LOG` overrides `default_level`.
pub fn init_logging(default_level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .try_init();
}
