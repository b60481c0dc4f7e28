//! Store configuration
//!
//! A store is configured in code; `StoreConfig` derives serde so it can be
//! embedded in an application's own configuration file.

use serde::{Deserialize, Serialize};
use snapdb_durability::{DurabilityOptions, DEFAULT_FILE_MODE};

/// Configuration for a [`Store`](crate::Store).
///
/// # Example
///
/// ```text
/// use snapdb_engine::{Store, StoreConfig};
///
/// let config = StoreConfig::default().with_file_mode(0o600).with_pretty(true);
/// let store: Store<Settings> = Store::open_with_config("settings.json", config)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Permission bits for the persisted file (ignored without POSIX permissions).
    #[serde(default = "default_file_mode")]
    pub file_mode: u32,
    /// Pretty-print the persisted JSON.
    #[serde(default)]
    pub pretty: bool,
    /// fsync the parent directory after each rename.
    ///
    /// When this sync fails, `save` reports the error although the file
    /// already holds the new document.
    #[serde(default)]
    pub sync_parent_dir: bool,
}

fn default_file_mode() -> u32 {
    DEFAULT_FILE_MODE
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file_mode: default_file_mode(),
            pretty: false,
            sync_parent_dir: false,
        }
    }
}

impl StoreConfig {
    /// Set the permission bits of the persisted file
    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    /// Enable or disable pretty-printed JSON
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Enable or disable the parent directory fsync
    pub fn with_sync_parent_dir(mut self, sync: bool) -> Self {
        self.sync_parent_dir = sync;
        self
    }

    /// Writer options derived from this config
    pub fn durability_options(&self) -> DurabilityOptions {
        DurabilityOptions::default()
            .with_mode(self.file_mode)
            .with_sync_parent_dir(self.sync_parent_dir)
    }
}
