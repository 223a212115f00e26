//! Tests for the k-way merge
//!
//! These tests verify:
//! - Global ordering across many sorted files
//! - Deterministic tie-break by source index
//! - Buffered cursors across the read-ahead boundary
//! - Empty inputs

use std::fs;
use std::path::{Path, PathBuf};

use cellstore::record::{self, KeyRecord};
use cellstore::sort::{self, SortedFileCursor, READ_AHEAD_RECORDS};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn write_sorted(dir: &Path, name: &str, records: &[KeyRecord]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, record::encode(records)).unwrap();
    path
}

fn read_records(path: &Path) -> Vec<KeyRecord> {
    record::decode(&fs::read(path).unwrap()).unwrap()
}

// =============================================================================
// Cursor Tests
// =============================================================================

#[test]
fn test_cursor_walks_past_read_ahead_boundary() {
    let temp = TempDir::new().unwrap();
    let count = READ_AHEAD_RECORDS as u64 * 2 + 5;
    let records: Vec<KeyRecord> = (0..count).map(|i| KeyRecord::new(i, 0, 0)).collect();
    let path = write_sorted(temp.path(), "a.tmp", &records);

    let mut cursor = SortedFileCursor::open(&path).unwrap();
    let mut seen = 0u64;
    while let Some(record) = cursor.next_record().unwrap() {
        assert_eq!(record.key(), seen);
        seen += 1;
    }

    assert_eq!(seen, count);
    assert!(cursor.is_exhausted());
}

#[test]
fn test_cursor_current_does_not_advance() {
    let temp = TempDir::new().unwrap();
    let path = write_sorted(
        temp.path(),
        "a.tmp",
        &[KeyRecord::new(1, 0, 0), KeyRecord::new(2, 0, 0)],
    );

    let mut cursor = SortedFileCursor::open(&path).unwrap();

    assert_eq!(cursor.current().unwrap().map(|r| r.key()), Some(1));
    assert_eq!(cursor.current().unwrap().map(|r| r.key()), Some(1));
    assert_eq!(cursor.next_record().unwrap().map(|r| r.key()), Some(1));
    assert_eq!(cursor.current().unwrap().map(|r| r.key()), Some(2));
}

// =============================================================================
// Merge Tests
// =============================================================================

#[test]
fn test_merge_interleaves_files() {
    let temp = TempDir::new().unwrap();
    let a = write_sorted(
        temp.path(),
        "a.tmp",
        &[KeyRecord::new(0, 0, 0), KeyRecord::new(5, 0, 0), KeyRecord::new(9, 0, 0)],
    );
    let b = write_sorted(
        temp.path(),
        "b.tmp",
        &[KeyRecord::new(1, 0, 0), KeyRecord::new(6, 0, 0)],
    );
    let c = write_sorted(temp.path(), "c.tmp", &[KeyRecord::new(3, 0, 0)]);
    let output = temp.path().join("out.sortedKeys");

    let written = sort::merge_sorted_files(&[a, b, c], &output).unwrap();

    assert_eq!(written, 6);
    let keys: Vec<u64> = read_records(&output).iter().map(|r| r.key()).collect();
    assert_eq!(keys, vec![0, 1, 3, 5, 6, 9]);
}

#[test]
fn test_merge_ties_follow_source_order() {
    let temp = TempDir::new().unwrap();
    // payload_a tags the source file, payload_b the position within it
    let a = write_sorted(
        temp.path(),
        "a.tmp",
        &[KeyRecord::new(7, 0, 0), KeyRecord::new(7, 0, 1), KeyRecord::new(8, 0, 2)],
    );
    let b = write_sorted(
        temp.path(),
        "b.tmp",
        &[KeyRecord::new(7, 1, 0), KeyRecord::new(8, 1, 1)],
    );
    let c = write_sorted(
        temp.path(),
        "c.tmp",
        &[KeyRecord::new(6, 2, 0), KeyRecord::new(7, 2, 1)],
    );
    let output = temp.path().join("out.sortedKeys");

    sort::merge_sorted_files(&[a, b, c], &output).unwrap();

    let order: Vec<(u64, u32, u32)> = read_records(&output)
        .iter()
        .map(|r| (r.key(), r.payload_a, r.payload_b))
        .collect();
    assert_eq!(
        order,
        vec![
            (6, 2, 0),
            (7, 0, 0),
            (7, 0, 1),
            (7, 1, 0),
            (7, 2, 1),
            (8, 0, 2),
            (8, 1, 1),
        ]
    );
}

#[test]
fn test_merge_ties_reverse_file_order() {
    let temp = TempDir::new().unwrap();
    let a = write_sorted(temp.path(), "a.tmp", &[KeyRecord::new(1, 0, 0)]);
    let b = write_sorted(temp.path(), "b.tmp", &[KeyRecord::new(1, 1, 0)]);
    let output = temp.path().join("out.sortedKeys");

    // Swapping the input list swaps the tie order
    sort::merge_sorted_files(&[b, a], &output).unwrap();

    let sources: Vec<u32> = read_records(&output).iter().map(|r| r.payload_a).collect();
    assert_eq!(sources, vec![1, 0]);
}

#[test]
fn test_merge_large_files_across_write_batches() {
    let temp = TempDir::new().unwrap();
    let evens: Vec<KeyRecord> = (0..3000u64).map(|i| KeyRecord::new(i * 2, 0, 0)).collect();
    let odds: Vec<KeyRecord> = (0..3000u64).map(|i| KeyRecord::new(i * 2 + 1, 1, 0)).collect();
    let a = write_sorted(temp.path(), "a.tmp", &evens);
    let b = write_sorted(temp.path(), "b.tmp", &odds);
    let output = temp.path().join("out.sortedKeys");

    let written = sort::merge_sorted_files(&[a, b], &output).unwrap();

    assert_eq!(written, 6000);
    let keys: Vec<u64> = read_records(&output).iter().map(|r| r.key()).collect();
    assert_eq!(keys, (0..6000).collect::<Vec<u64>>());
}

#[test]
fn test_merge_skips_empty_files() {
    let temp = TempDir::new().unwrap();
    let empty = write_sorted(temp.path(), "empty.tmp", &[]);
    let a = write_sorted(temp.path(), "a.tmp", &[KeyRecord::new(4, 0, 0)]);
    let output = temp.path().join("out.sortedKeys");

    let written = sort::merge_sorted_files(&[empty, a], &output).unwrap();

    assert_eq!(written, 1);
}

#[test]
fn test_merge_no_inputs_creates_empty_output() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("out.sortedKeys");

    let written = sort::merge_sorted_files(&[], &output).unwrap();

    assert_eq!(written, 0);
    assert_eq!(fs::metadata(&output).unwrap().len(), 0);
}

#[test]
fn test_merge_missing_input_fails() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("out.sortedKeys");

    let result = sort::merge_sorted_files(&[temp.path().join("nope.tmp")], &output);

    assert!(result.is_err());
}
