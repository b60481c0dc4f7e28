//! Crash-safe file replacement
//!
//! Uses the write-fsync-rename pattern so the target path always holds
//! either its previous complete content or the new complete content.
//!
//! # Crash Safety
//!
//! A write follows this pattern:
//! 1. Refuse a target that exists but is not a regular file
//! 2. Create a uniquely named temporary file next to the target
//!    (`.<name>.XXXXXX.tmp`, same directory so the rename stays on one volume)
//! 3. Write the full payload
//! 4. Apply permission bits (platforms with a POSIX permission model only)
//! 5. fsync the temporary file
//! 6. Close the temporary file
//! 7. Atomic rename onto the target
//!
//! Nothing is ever written to the target directly. A failure in steps 2-6
//! removes the temporary file; a failed rename keeps it for diagnosis.
//! A process killed between steps 2 and 7 leaves the temporary file
//! behind, see [`cleanup_temp_files`].

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use snapdb_core::{Error, Result};
use tempfile::{NamedTempFile, PathPersistError, TempPath};
use tracing::{debug, warn};

use crate::testing::CrashPoint;

/// Permission bits used when the caller does not choose any
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Suffix of every temporary write artifact
pub const TEMP_SUFFIX: &str = ".tmp";

/// Length of the random component in temporary file names
const TEMP_RAND_LEN: usize = 6;

/// Options controlling a single atomic write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurabilityOptions {
    /// Permission bits applied to the new file (ignored without POSIX permissions)
    pub mode: u32,
    /// fsync the parent directory after the rename
    ///
    /// Makes the rename itself durable. A failure here is reported even
    /// though the target already holds the new content.
    pub sync_parent_dir: bool,
}

impl Default for DurabilityOptions {
    fn default() -> Self {
        DurabilityOptions {
            mode: DEFAULT_FILE_MODE,
            sync_parent_dir: false,
        }
    }
}

impl DurabilityOptions {
    /// Set the permission bits
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Enable or disable the parent directory fsync
    pub fn with_sync_parent_dir(mut self, sync: bool) -> Self {
        self.sync_parent_dir = sync;
        self
    }
}

/// Atomically replace the content of `path` with `data`.
///
/// `mode` is applied on platforms with POSIX permission bits and ignored
/// elsewhere. If `path` exists but is not a regular file, returns
/// [`Error::NotRegularFile`] without touching it.
pub fn write_file(path: impl AsRef<Path>, data: &[u8], mode: u32) -> Result<()> {
    write_file_with(path, data, &DurabilityOptions::default().with_mode(mode))
}

/// [`write_file`] with explicit [`DurabilityOptions`].
pub fn write_file_with(
    path: impl AsRef<Path>,
    data: &[u8],
    options: &DurabilityOptions,
) -> Result<()> {
    // Without a crash point the protocol only returns after the rename
    run_protocol(path.as_ref(), data, options, None).map(drop)
}

/// How a run of the write protocol ended
pub(crate) enum WriteOutcome {
    /// The target now holds the new content
    Replaced,
    /// Stopped at a crash point; the temporary file was left behind
    Abandoned(PathBuf),
}

/// Run the write protocol, optionally stopping at `crash_at` the way a
/// killed process would (no cleanup, no rename).
pub(crate) fn run_protocol(
    path: &Path,
    data: &[u8],
    options: &DurabilityOptions,
    crash_at: Option<CrashPoint>,
) -> Result<WriteOutcome> {
    // Step 1: refuse directories, devices and symlinks to them
    ensure_regular_or_absent(path)?;

    // Step 2: temporary file in the target's directory
    let dir = parent_dir(path);
    let mut tmp = tempfile::Builder::new()
        .prefix(&temp_file_prefix(path))
        .suffix(TEMP_SUFFIX)
        .rand_bytes(TEMP_RAND_LEN)
        .tempfile_in(&dir)
        .map_err(|e| Error::io("create temporary file in", &dir, e))?;
    if crash_at == Some(CrashPoint::AfterTempCreate) {
        return abandon_file(tmp);
    }

    // Step 3: payload. Dropping `tmp` on any error below closes and deletes it.
    tmp.write_all(data)
        .map_err(|e| Error::io("write temporary file", tmp.path(), e))?;
    if crash_at == Some(CrashPoint::AfterTempWrite) {
        return abandon_file(tmp);
    }

    // Step 4: permissions
    apply_mode(tmp.as_file(), options.mode)
        .map_err(|e| Error::io("set permissions on", tmp.path(), e))?;

    // Step 5: fsync
    tmp.as_file()
        .sync_all()
        .map_err(|e| Error::io("sync temporary file", tmp.path(), e))?;
    if crash_at == Some(CrashPoint::AfterSync) {
        return abandon_file(tmp);
    }

    // Step 6: close, keeping only the path
    let temp_path = tmp.into_temp_path();
    if crash_at == Some(CrashPoint::BeforeRename) {
        return abandon_path(temp_path);
    }

    // Step 7: atomic rename
    if let Err(PathPersistError { error, path: temp }) = temp_path.persist(path) {
        let from = temp.to_path_buf();
        if let Err(keep_err) = temp.keep() {
            warn!(
                target: "snapdb::durability",
                temp = %from.display(),
                error = %keep_err.error,
                "Could not keep temporary file after failed rename"
            );
        }
        warn!(
            target: "snapdb::durability",
            path = %path.display(),
            temp = %from.display(),
            error = %error,
            "Rename failed; temporary file left in place"
        );
        return Err(Error::Rename {
            from,
            to: path.to_path_buf(),
            source: error,
        });
    }

    if options.sync_parent_dir {
        sync_dir(&dir).map_err(|e| Error::io("sync directory", &dir, e))?;
    }

    debug!(
        target: "snapdb::durability",
        path = %path.display(),
        bytes = data.len(),
        "Atomic write complete"
    );
    Ok(WriteOutcome::Replaced)
}

fn ensure_regular_or_absent(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if !meta.is_file() => Err(Error::NotRegularFile {
            path: path.to_path_buf(),
        }),
        // Absent, regular, or unreadable metadata: the later steps decide
        _ => Ok(()),
    }
}

/// Directory that holds `path` (the current directory for bare file names)
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Name prefix shared by all temporary files written for `target`.
pub fn temp_file_prefix(target: &Path) -> String {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapdb".to_string());
    format!(".{}.", name)
}

fn is_temp_artifact(file_name: &str, prefix: &str) -> bool {
    file_name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(TEMP_SUFFIX))
        .is_some_and(|rand| {
            rand.len() == TEMP_RAND_LEN && rand.bytes().all(|b| b.is_ascii_alphanumeric())
        })
}

/// List temporary artifacts left next to `target` by interrupted writes.
pub fn leftover_temp_files(target: &Path) -> io::Result<Vec<PathBuf>> {
    let dir = parent_dir(target);
    let prefix = temp_file_prefix(target);
    let mut found = Vec::new();

    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if is_temp_artifact(&name, &prefix) {
            found.push(entry.path());
        }
    }

    found.sort();
    Ok(found)
}

/// Clean up temporary files left behind by crashed writes to `target`.
///
/// Only call this while no write to `target` is in flight; an in-progress
/// temporary file is indistinguishable from an orphan.
pub fn cleanup_temp_files(target: &Path) -> io::Result<usize> {
    let mut count = 0;
    for path in leftover_temp_files(target)? {
        match fs::remove_file(&path) {
            Ok(()) => count += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(
                    target: "snapdb::durability",
                    temp = %path.display(),
                    error = %e,
                    "Failed to remove leftover temporary file"
                );
                return Err(e);
            }
        }
    }
    Ok(count)
}

#[cfg(unix)]
fn apply_mode(file: &File, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_mode(_file: &File, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

fn abandon_file(tmp: NamedTempFile) -> Result<WriteOutcome> {
    // The handle is dropped (closed) like the kernel would on process exit
    let (_file, path) = tmp
        .keep()
        .map_err(|e| Error::io("keep temporary file", e.file.path(), e.error))?;
    Ok(WriteOutcome::Abandoned(path))
}

fn abandon_path(temp: TempPath) -> Result<WriteOutcome> {
    temp.keep()
        .map(WriteOutcome::Abandoned)
        .map_err(|PathPersistError { error, path }| {
            Error::io("keep temporary file", &path, error)
        })
}
