//! Snapshot store
//!
//! [`Store`] holds one document of type `T` in memory and mirrors it to a
//! single JSON file. Every value crossing the store boundary is deep-copied
//! through the JSON codec, so callers never share containers with the
//! store's internal document.
//!
//! # Locking
//!
//! Readers share a `parking_lot::RwLock`. A save holds the write lock for
//! the copy, the encode and the whole atomic file write, so memory and disk
//! are updated in one critical section and readers never observe a document
//! that is not yet on disk. The price is that storage latency shows up as
//! lock-wait latency for every other caller; stores are meant for
//! low-frequency state and configuration snapshots.
//!
//! If the file write fails, the in-memory document has already been
//! replaced and memory is ahead of disk until the next successful save.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use snapdb_core::{codec, Error, Result};
use snapdb_durability::write_file_with;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;

/// A typed document persisted to one file.
///
/// Share between threads with `Arc<Store<T>>`. Separate stores opened on
/// the same path do not coordinate with each other.
pub struct Store<T> {
    document: RwLock<T>,
    path: PathBuf,
    config: StoreConfig,
}

impl<T> Store<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Open the document stored at `path`.
    ///
    /// The file must exist and hold a valid JSON document of type `T`.
    /// Nothing is written.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    /// Open the document stored at `path` with an explicit configuration.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = fs::read(&path).map_err(|e| Error::io("read", &path, e))?;
        let document = codec::decode(&content)?;

        info!(
            target: "snapdb::store",
            path = %path.display(),
            bytes = content.len(),
            "Opened store"
        );

        Ok(Self::live(path, document, config))
    }

    /// Durably write `initial` to `path` and return a store holding it.
    ///
    /// Replaces any existing regular file at `path`.
    pub fn create<P: AsRef<Path>>(path: P, initial: &T) -> Result<Self> {
        Self::create_with_config(path, initial, StoreConfig::default())
    }

    /// [`Store::create`] with an explicit configuration.
    pub fn create_with_config<P: AsRef<Path>>(
        path: P,
        initial: &T,
        config: StoreConfig,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let document = codec::deep_copy(initial)?;
        let content = codec::encode(&document, config.pretty)?;
        write_file_with(&path, &content, &config.durability_options())?;

        info!(
            target: "snapdb::store",
            path = %path.display(),
            bytes = content.len(),
            "Created store"
        );

        Ok(Self::live(path, document, config))
    }

    /// Open `path`, or create it holding `default()` when it does not exist.
    ///
    /// Any other open failure (unreadable, malformed) is returned as is.
    pub fn open_or_create<P, F>(path: P, default: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: FnOnce() -> T,
    {
        Self::open_or_create_with_config(path, StoreConfig::default(), default)
    }

    /// [`Store::open_or_create`] with an explicit configuration.
    pub fn open_or_create_with_config<P, F>(path: P, config: StoreConfig, default: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: FnOnce() -> T,
    {
        match Self::open_with_config(path.as_ref(), config.clone()) {
            Err(e) if e.is_not_found() => Self::create_with_config(path, &default(), config),
            other => other,
        }
    }

    fn live(path: PathBuf, document: T, config: StoreConfig) -> Self {
        Store {
            document: RwLock::new(document),
            path,
            config,
        }
    }

    /// Replace the document with a copy of `value` and persist it.
    ///
    /// The write lock is held until the file write finishes. An encoding
    /// failure is returned before anything changes. A write failure is
    /// returned after the in-memory document was replaced.
    pub fn save(&self, value: &T) -> Result<()> {
        let mut document = self.document.write();
        *document = codec::deep_copy(value)?;
        self.persist(&document)
    }

    /// Read-modify-write under a single write lock.
    ///
    /// `f` receives a private copy of the current document; the modified
    /// copy is then stored and persisted exactly like [`Store::save`].
    /// Returns whatever `f` returns.
    pub fn update<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut document = self.document.write();
        let mut working = codec::deep_copy(&*document)?;
        let out = f(&mut working);
        *document = codec::deep_copy(&working)?;
        self.persist(&document)?;
        Ok(out)
    }

    /// Return a copy of the current document.
    ///
    /// Never touches disk.
    ///
    /// # Panics
    ///
    /// Panics if the document cannot be copied through JSON. Every stored
    /// document has already survived that round trip once, so this only
    /// happens for types whose serialization is not deterministic; use
    /// [`Store::try_read`] to get the error instead.
    pub fn read(&self) -> T {
        match self.try_read() {
            Ok(document) => document,
            Err(e) => panic!(
                "document in store {} cannot be copied: {}",
                self.path.display(),
                e
            ),
        }
    }

    /// Return a copy of the current document, or the copy error.
    pub fn try_read(&self) -> Result<T> {
        let document = self.document.read();
        codec::deep_copy(&*document)
    }

    /// Encode `document` and hand it to the atomic writer.
    ///
    /// Callers hold the write lock.
    fn persist(&self, document: &T) -> Result<()> {
        let content = codec::encode(document, self.config.pretty)?;
        if let Err(e) = write_file_with(&self.path, &content, &self.config.durability_options()) {
            warn!(
                target: "snapdb::store",
                path = %self.path.display(),
                error = %e,
                "Durable write failed; in-memory document is ahead of disk"
            );
            return Err(e);
        }

        debug!(
            target: "snapdb::store",
            path = %self.path.display(),
            bytes = content.len(),
            "Saved document"
        );
        Ok(())
    }
}

impl<T> Store<T> {
    /// Path of the file backing this store
    pub fn filepath(&self) -> &Path {
        &self.path
    }

    /// Configuration this store was opened with
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl<T> std::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
