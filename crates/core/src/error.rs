//! Error types for SnapDB
//!
//! Every failure in the durable writer and the snapshot store is reported
//! through [`Error`]. Nothing is retried or swallowed; the variant tells the
//! caller which step failed and which path was involved.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for SnapDB operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for SnapDB
#[derive(Debug, Error)]
pub enum Error {
    /// An entry exists at the target path but is not a regular file
    #[error("{} already exists and is not a regular file", path.display())]
    NotRegularFile {
        /// The offending path (left untouched)
        path: PathBuf,
    },

    /// I/O error while reading the document or preparing the temporary file
    #[error("I/O error: failed to {op} {}: {source}", path.display())]
    Io {
        /// Short description of the operation that failed
        op: &'static str,
        /// Path the operation was applied to
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// The final rename onto the target failed; the temporary file was kept
    #[error("failed to rename {} to {}: {source}", from.display(), to.display())]
    Rename {
        /// Temporary file left in place for diagnosis
        from: PathBuf,
        /// Target path (untouched)
        to: PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// The document could not be serialized to JSON
    #[error("Encoding error: {0}")]
    Encode(#[source] serde_json::Error),

    /// The content is not a valid JSON document of the expected shape
    #[error("Decoding error: {0}")]
    Decode(#[source] serde_json::Error),
}

impl Error {
    /// Build an [`Error::Io`] for `op` applied to `path`.
    pub fn io(op: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
        Error::Io {
            op,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Kind of the underlying OS error, if this error came from the filesystem.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Error::Io { source, .. } | Error::Rename { source, .. } => Some(source.kind()),
            _ => None,
        }
    }

    /// True when the error means the file does not exist.
    pub fn is_not_found(&self) -> bool {
        self.io_kind() == Some(io::ErrorKind::NotFound)
    }
}
