//! Atomic write protocol tests
//!
//! Validates that the target file only ever holds a complete payload,
//! across crashes, concurrent writers and arbitrary content.

use proptest::prelude::*;
use snapdb_core::Error;
use snapdb_durability::testing::{write_file_until, CrashPoint};
use snapdb_durability::{cleanup_temp_files, leftover_temp_files, write_file, DEFAULT_FILE_MODE};
use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::tempdir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// ============================================================================
// Crash Recovery
// ============================================================================

#[test]
fn test_recovery_after_crash_then_successful_write() {
    init_tracing();
    let dir = tempdir().unwrap();
    let target = dir.path().join("db.json");
    write_file(&target, b"{\"count\":1}", DEFAULT_FILE_MODE).unwrap();

    write_file_until(&target, b"{\"count\":2}", DEFAULT_FILE_MODE, CrashPoint::AfterSync).unwrap();
    assert_eq!(fs::read(&target).unwrap(), b"{\"count\":1}");

    // A later write is unaffected by the orphan
    write_file(&target, b"{\"count\":3}", DEFAULT_FILE_MODE).unwrap();
    assert_eq!(fs::read(&target).unwrap(), b"{\"count\":3}");
    assert_eq!(leftover_temp_files(&target).unwrap().len(), 1);

    assert_eq!(cleanup_temp_files(&target).unwrap(), 1);
    assert!(leftover_temp_files(&target).unwrap().is_empty());
    assert_eq!(fs::read(&target).unwrap(), b"{\"count\":3}");
}

#[test]
fn test_repeated_crashes_leave_distinct_orphans() {
    init_tracing();
    let dir = tempdir().unwrap();
    let target = dir.path().join("db.json");
    write_file(&target, b"v0", DEFAULT_FILE_MODE).unwrap();

    let mut orphans = Vec::new();
    for point in CrashPoint::all() {
        orphans.push(write_file_until(&target, b"v1", DEFAULT_FILE_MODE, point).unwrap());
    }

    orphans.sort();
    orphans.dedup();
    assert_eq!(orphans.len(), CrashPoint::all().len());
    assert_eq!(leftover_temp_files(&target).unwrap(), orphans);
    assert_eq!(fs::read(&target).unwrap(), b"v0");
}

#[test]
fn test_orphans_of_other_targets_are_kept() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");

    let orphan_a = write_file_until(&a, b"a", DEFAULT_FILE_MODE, CrashPoint::BeforeRename).unwrap();
    let orphan_b = write_file_until(&b, b"b", DEFAULT_FILE_MODE, CrashPoint::BeforeRename).unwrap();

    assert_eq!(cleanup_temp_files(&a).unwrap(), 1);
    assert!(!orphan_a.exists());
    assert!(orphan_b.exists());
}

// ============================================================================
// Target Validation
// ============================================================================

#[test]
fn test_directory_target_is_untouched() {
    init_tracing();
    let dir = tempdir().unwrap();
    let target = dir.path().join("nested");
    fs::create_dir(&target).unwrap();

    let err = write_file(&target, b"payload", DEFAULT_FILE_MODE).unwrap_err();

    assert!(matches!(err, Error::NotRegularFile { ref path } if *path == target));
    assert!(target.is_dir());
    assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    // Nothing was created next to it either
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[cfg(unix)]
#[test]
fn test_symlink_to_regular_file_is_replaced() {
    let dir = tempdir().unwrap();
    let real = dir.path().join("real.json");
    let link = dir.path().join("link.json");
    fs::write(&real, b"old").unwrap();
    std::os::unix::fs::symlink(&real, &link).unwrap();

    write_file(&link, b"new", DEFAULT_FILE_MODE).unwrap();

    // The rename replaces the link itself, the old target keeps its content
    assert_eq!(fs::read(&link).unwrap(), b"new");
    assert!(!fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(fs::read(&real).unwrap(), b"old");
}

/// Test: a failed rename keeps the temporary file and reports its path
#[cfg(unix)]
#[test]
fn test_failed_rename_keeps_temp_file() {
    init_tracing();
    let dir = tempdir().unwrap();
    let target = dir.path().join("db.json");
    // The trailing slash passes the metadata check but makes rename(2) fail
    let slashed = dir.path().join("db.json/");

    let err = write_file(&slashed, b"{\"count\":1}", DEFAULT_FILE_MODE).unwrap_err();

    let from = match err {
        Error::Rename { from, to, .. } => {
            assert_eq!(to, slashed);
            from
        }
        other => panic!("expected a rename error, got {:?}", other),
    };
    assert!(from.exists());
    assert_eq!(fs::read(&from).unwrap(), b"{\"count\":1}");
    assert_eq!(leftover_temp_files(&target).unwrap(), vec![from]);
    assert!(!target.exists());
}

// ============================================================================
// Concurrent Writers
// ============================================================================

/// Test: writers racing on one path never produce a mixed file
#[test]
fn test_concurrent_writers_never_mix() {
    init_tracing();
    let dir = tempdir().unwrap();
    let target = Arc::new(dir.path().join("db.json"));
    write_file(&*target, &[b'0'; 4096], DEFAULT_FILE_MODE).unwrap();

    let writers = 8;
    let barrier = Arc::new(Barrier::new(writers));
    let handles: Vec<_> = (0..writers)
        .map(|i| {
            let target = Arc::clone(&target);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let byte = b'a' + i as u8;
                barrier.wait();
                for _ in 0..10 {
                    write_file(&*target, &vec![byte; 4096], DEFAULT_FILE_MODE).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let content = fs::read(&*target).unwrap();
    assert_eq!(content.len(), 4096);
    assert!(content.iter().all(|b| *b == content[0]));
    assert!(leftover_temp_files(&target).unwrap().is_empty());
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_target_holds_exact_payload(
        previous in proptest::collection::vec(any::<u8>(), 0..512),
        next in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let dir = tempdir().unwrap();
        let target = dir.path().join("blob.bin");
        write_file(&target, &previous, DEFAULT_FILE_MODE).unwrap();

        write_file_until(&target, &next, DEFAULT_FILE_MODE, CrashPoint::BeforeRename).unwrap();
        prop_assert_eq!(fs::read(&target).unwrap(), previous);

        write_file(&target, &next, DEFAULT_FILE_MODE).unwrap();
        prop_assert_eq!(fs::read(&target).unwrap(), next);
    }
}
