//! Durability layer for SnapDB
//!
//! This crate handles everything that touches disk on the write path:
//!
//! - Atomic file replacement (write-fsync-rename into the same directory)
//! - Platform-dependent permission bits
//! - Sweeping temporary files orphaned by killed processes
//! - Crash testing infrastructure
//!
//! It knows nothing about documents or locking; callers hand it bytes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod atomic_file; // write-fsync-rename protocol
pub mod testing; // Crash harness

pub use atomic_file::{
    cleanup_temp_files, leftover_temp_files, temp_file_prefix, write_file, write_file_with,
    DurabilityOptions, DEFAULT_FILE_MODE, TEMP_SUFFIX,
};
