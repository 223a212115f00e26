//! Tests for the vector stores
//!
//! These tests verify:
//! - Ordinal access into key order
//! - Key lookup returning the first value pushed under a key
//! - Equal keys keep push order
//! - KeyNotFound for missing positions and keys
//! - File, mmap and in-memory vectors agree

use cellstore::{
    layout, CellStoreError, FileVector, MemoryVector, MmapVector, StoreConfig, VectorKey,
    VectorStore,
};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TestKey {
    a: u32,
    cell: u64,
}

impl VectorKey for TestKey {
    fn key(&self) -> u64 {
        self.cell
    }
}

fn item(a: u32, cell: u64) -> TestKey {
    TestKey { a, cell }
}

fn config(temp: &TempDir) -> StoreConfig {
    StoreConfig::builder().tmp_dir(temp.path()).build()
}

/// Pushes the sample values and checks the shared contract
fn check_vector<S: VectorStore<TestKey>>(store: &mut S) {
    assert_eq!(store.len(), 0);
    store.push(item(1, 0)).unwrap();
    assert_eq!(store.len(), 1);
    store.push(item(7, 5_000_001)).unwrap();
    store.push(item(2, 1)).unwrap();
    store.push(item(4, 12_345_678_900_001)).unwrap();
    store.push(item(5, 12_345_678_900_000)).unwrap();
    store.push(item(3, 5_000_001)).unwrap();
    store.sort().unwrap();

    assert_eq!(store.len(), 6);
    assert_eq!(store.get_at(0).unwrap(), item(1, 0));
    assert_eq!(store.get_at(1).unwrap(), item(2, 1));
    assert_eq!(store.get_at(3).unwrap(), item(3, 5_000_001));

    let values: Vec<TestKey> = store.values().unwrap().map(|v| v.unwrap()).collect();
    assert_eq!(
        values,
        vec![
            item(1, 0),
            item(2, 1),
            item(7, 5_000_001),
            item(3, 5_000_001),
            item(5, 12_345_678_900_000),
            item(4, 12_345_678_900_001),
        ]
    );

    assert_eq!(store.get_by_key(5_000_001).unwrap(), item(7, 5_000_001));
    assert_eq!(store.get_by_key(12_345_678_900_001).unwrap(), item(4, 12_345_678_900_001));
    assert!(store.has(1).unwrap());
    assert!(!store.has(2).unwrap());

    assert!(matches!(store.get_at(6), Err(CellStoreError::KeyNotFound)));
    assert!(matches!(store.get_by_key(2), Err(CellStoreError::KeyNotFound)));
}

// =============================================================================
// Vector Tests
// =============================================================================

#[test]
fn test_file_vector() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("vector");
    let mut store: FileVector<TestKey> = FileVector::open(&base, config(&temp)).unwrap();

    check_vector(&mut store);

    store.close().unwrap();
    assert!(!layout::keys_path(&base).exists());
    assert!(!layout::values_path(&base).exists());
}

#[test]
fn test_mmap_vector() {
    let temp = TempDir::new().unwrap();
    let mut store: MmapVector<TestKey> =
        MmapVector::open(temp.path().join("vector"), config(&temp)).unwrap();

    check_vector(&mut store);

    store.close().unwrap();
}

#[test]
fn test_memory_vector() {
    let mut store: MemoryVector<TestKey> = MemoryVector::new();

    check_vector(&mut store);
}

#[test]
fn test_lookup_sorts_lazily() {
    let temp = TempDir::new().unwrap();
    let mut file: FileVector<TestKey> =
        FileVector::open(temp.path().join("vector"), config(&temp)).unwrap();
    let mut memory: MemoryVector<TestKey> = MemoryVector::new();
    for store in [&mut file as &mut dyn VectorStore<TestKey>, &mut memory] {
        store.push(item(2, 20)).unwrap();
        store.push(item(1, 10)).unwrap();
        // No explicit sort
        assert_eq!(store.get_at(0).unwrap(), item(1, 10));
    }
}

#[test]
fn test_sparse_keys_use_ordinals() {
    let mut store: MemoryVector<TestKey> = MemoryVector::new();
    store.push(item(1, 1_000)).unwrap();
    store.push(item(2, 1_000_000)).unwrap();

    assert_eq!(store.get_at(1).unwrap(), item(2, 1_000_000));
    assert!(matches!(store.get_by_key(1), Err(CellStoreError::KeyNotFound)));
}

#[test]
fn test_memory_vector_push_after_read() {
    let mut store: MemoryVector<TestKey> = MemoryVector::new();
    store.push(item(1, 5)).unwrap();
    assert_eq!(store.get_by_key(5).unwrap(), item(1, 5));

    store.push(item(2, 1)).unwrap();

    assert_eq!(store.get_at(0).unwrap(), item(2, 1));
    assert_eq!(store.len(), 2);
}
