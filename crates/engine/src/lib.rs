//! Document store engine for SnapDB
//!
//! This crate ties the lower layers together:
//! - Store: typed in-memory document behind a reader/writer lock
//! - Copy-on-access isolation through the JSON codec
//! - Persistence through the atomic file writer
//! - StoreConfig: file mode, pretty printing, directory sync

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod store;

pub use config::StoreConfig;
pub use store::Store;
