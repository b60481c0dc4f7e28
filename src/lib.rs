//! SnapDB - embedded single-document store
//!
//! SnapDB keeps one typed value in memory and mirrors it to a JSON file.
//! Saves replace the file atomically (write to a temporary file, fsync,
//! rename), so a crash never leaves a half-written document behind.
//!
//! # Quick Start
//!
//! ```ignore
//! use snapdb::Store;
//!
//! #[derive(serde::Serialize, serde::Deserialize)]
//! struct Counter { count: i64 }
//!
//! // db.json contains {"count":1}
//! let store: Store<Counter> = Store::open("db.json")?;
//! let mut counter = store.read();
//! counter.count += 1;
//! store.save(&counter)?;
//! ```
//!
//! # Architecture
//!
//! - [`Store`]: the document behind a reader/writer lock, copied on every
//!   read and save so callers never alias its internals
//! - [`write_file`]: the crash-safe file replacement used by every save
//! - [`Error`]: one error type for both layers

pub use snapdb_core::{Error, Result};
pub use snapdb_durability::{
    cleanup_temp_files, leftover_temp_files, temp_file_prefix, write_file, write_file_with,
    DurabilityOptions, DEFAULT_FILE_MODE,
};
pub use snapdb_engine::{Store, StoreConfig};

/// Crash simulation helpers for testing applications built on SnapDB
pub mod testing {
    pub use snapdb_durability::testing::{write_file_until, CrashPoint};
}
