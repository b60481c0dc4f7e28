//! Testing utilities for durability
//!
//! - **Crash Harness**: stop the atomic write protocol at a chosen step and
//!   leave the filesystem exactly as a killed process would
//!
//! # Example
//!
//! ```ignore
//! use snapdb_durability::testing::{write_file_until, CrashPoint};
//!
//! // Previous content survives a crash before the rename
//! let orphan = write_file_until(&path, b"{\"count\":2}", 0o644, CrashPoint::BeforeRename)?;
//! assert_eq!(std::fs::read(&path)?, b"{\"count\":1}");
//! ```

mod crash_harness;

pub use crash_harness::{write_file_until, CrashPoint};
