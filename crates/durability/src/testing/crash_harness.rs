//! Crash harness for the atomic write protocol
//!
//! # Crash Points
//!
//! Each point sits between two steps of the protocol:
//! - After the temporary file is created (empty)
//! - After the payload is written, before fsync
//! - After fsync, before close
//! - After close, before the rename
//!
//! Every point precedes the rename, so the target must still hold its
//! previous content after recovery.

use std::path::{Path, PathBuf};

use snapdb_core::{Error, Result};

use crate::atomic_file::{run_protocol, DurabilityOptions, WriteOutcome};

/// Crash injection points in the atomic write protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrashPoint {
    /// Temporary file created, nothing written
    AfterTempCreate,
    /// Payload written, not yet synced
    AfterTempWrite,
    /// Payload synced, file still open
    AfterSync,
    /// Temporary file closed, rename not started
    BeforeRename,
}

impl CrashPoint {
    /// Get all crash points
    pub fn all() -> Vec<CrashPoint> {
        vec![
            CrashPoint::AfterTempCreate,
            CrashPoint::AfterTempWrite,
            CrashPoint::AfterSync,
            CrashPoint::BeforeRename,
        ]
    }

    /// Get description of crash point
    pub fn description(&self) -> &'static str {
        match self {
            CrashPoint::AfterTempCreate => "After temporary file creation",
            CrashPoint::AfterTempWrite => "After payload write, before fsync",
            CrashPoint::AfterSync => "After fsync, before close",
            CrashPoint::BeforeRename => "After close, before atomic rename",
        }
    }

    /// True when the temporary file holds the whole payload at this point
    pub fn payload_written(&self) -> bool {
        !matches!(self, CrashPoint::AfterTempCreate)
    }
}

/// Run the atomic write of `data` to `path` and simulate a crash at `point`.
///
/// The temporary file is closed but neither deleted nor renamed. Returns
/// its path. Errors from the steps before `point` are returned as usual.
pub fn write_file_until(
    path: impl AsRef<Path>,
    data: &[u8],
    mode: u32,
    point: CrashPoint,
) -> Result<PathBuf> {
    let options = DurabilityOptions::default().with_mode(mode);
    match run_protocol(path.as_ref(), data, &options, Some(point))? {
        WriteOutcome::Abandoned(temp) => Ok(temp),
        WriteOutcome::Replaced => Err(Error::io(
            "simulate crash before rename of",
            path.as_ref(),
            std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("{:?} was not reached", point),
            ),
        )),
    }
}
