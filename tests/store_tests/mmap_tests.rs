//! Tests for the memory-mapped Store backend
//!
//! These tests verify:
//! - Same results as the positioned-I/O backend
//! - Empty stores and empty values (unmappable files)
//! - Concurrent readers over shared maps
//! - Write-after-read is rejected exactly as on the file backend

use std::path::Path;
use std::thread;

use cellstore::store::{ReadBackend, StoreState};
use cellstore::{
    CellStoreError, FileStore, IntegerCodec, MmapStore, Mode, Store, StoreConfig, ValueCodec,
};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Cell {
    a: u32,
    tag: String,
}

fn cell(a: u32) -> Cell {
    Cell {
        a,
        tag: format!("cell-{}", a),
    }
}

fn config(tmp: &Path) -> StoreConfig {
    StoreConfig::builder()
        .memory_budget_records(3)
        .tmp_dir(tmp)
        .build()
}

fn fill<B: ReadBackend>(store: &mut Store<Cell, cellstore::BincodeCodec<Cell>, B>) {
    for (i, key) in [9807u64, 456, 55, 12, 7, 100, 9807, 456, 22, 22, 0]
        .into_iter()
        .enumerate()
    {
        store.set(key, &cell(i as u32)).unwrap();
    }
}

fn dump<V, C: ValueCodec<V>, B: ReadBackend>(store: &Store<V, C, B>) -> Vec<(u64, V)> {
    store
        .entries()
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            (entry.key, entry.value)
        })
        .collect()
}

// =============================================================================
// Parity Tests
// =============================================================================

#[test]
fn test_mmap_matches_file_backend() {
    let temp = TempDir::new().unwrap();
    let mut file_store: FileStore<Cell> =
        FileStore::open(temp.path().join("file"), config(temp.path())).unwrap();
    let mut mmap_store: MmapStore<Cell> =
        MmapStore::open(temp.path().join("mmap"), config(temp.path())).unwrap();
    fill(&mut file_store);
    fill(&mut mmap_store);

    assert_eq!(dump(&file_store), dump(&mmap_store));
    for key in [0u64, 22, 456, 9807, 1, 10_000] {
        assert_eq!(
            file_store.get(key, None).unwrap(),
            mmap_store.get(key, None).unwrap()
        );
        assert_eq!(file_store.has(key).unwrap(), mmap_store.has(key).unwrap());
    }
}

#[test]
fn test_mmap_get_with_max() {
    let temp = TempDir::new().unwrap();
    let mut store: MmapStore<Cell> =
        MmapStore::open(temp.path().join("store"), config(temp.path())).unwrap();
    fill(&mut store);

    assert_eq!(store.get(22, Some(1)).unwrap(), Some(vec![cell(8)]));
    assert_eq!(store.get(22, None).unwrap(), Some(vec![cell(8), cell(9)]));
    assert_eq!(store.get(23, None).unwrap(), None);
}

#[test]
fn test_mmap_get_at() {
    let temp = TempDir::new().unwrap();
    let mut store: MmapStore<Cell> =
        MmapStore::open(temp.path().join("store"), config(temp.path())).unwrap();
    fill(&mut store);

    let first = store.get_at(0).unwrap().unwrap();
    assert_eq!((first.key, first.value), (0, cell(10)));
    assert!(store.get_at(11).unwrap().is_none());
}

// =============================================================================
// Edge Case Tests
// =============================================================================

#[test]
fn test_mmap_empty_store() {
    let temp = TempDir::new().unwrap();
    let store: MmapStore<Cell> =
        MmapStore::open(temp.path().join("store"), config(temp.path())).unwrap();

    assert_eq!(store.get(1, None).unwrap(), None);
    assert!(!store.has(1).unwrap());
    assert_eq!(store.entries().unwrap().count(), 0);
}

#[test]
fn test_mmap_empty_values() {
    let temp = TempDir::new().unwrap();
    let mut store: MmapStore<Vec<u8>> =
        MmapStore::open(temp.path().join("store"), config(temp.path())).unwrap();
    store.set(3, &Vec::new()).unwrap();
    store.set(1, &vec![1, 2, 3]).unwrap();

    assert_eq!(dump(&store), vec![(1, vec![1, 2, 3]), (3, Vec::new())]);
}

#[test]
fn test_mmap_inline_mode() {
    let temp = TempDir::new().unwrap();
    let config = StoreConfig::builder()
        .mode(Mode::InlineInteger)
        .tmp_dir(temp.path())
        .build();
    let mut store: MmapStore<u64, IntegerCodec> =
        MmapStore::open(temp.path().join("store"), config).unwrap();
    store.set(2, &20).unwrap();
    store.set(1, &10).unwrap();

    assert_eq!(dump(&store), vec![(1, 10), (2, 20)]);
}

#[test]
fn test_mmap_set_after_read_is_state_violation() {
    let temp = TempDir::new().unwrap();
    let mut store: MmapStore<Cell> =
        MmapStore::open(temp.path().join("store"), config(temp.path())).unwrap();
    fill(&mut store);
    assert!(store.has(7).unwrap());

    let result = store.set(1, &cell(1));

    assert!(matches!(result, Err(CellStoreError::StateViolation(_))));
    assert_eq!(store.state(), StoreState::Read);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_mmap_concurrent_readers() {
    let temp = TempDir::new().unwrap();
    let mut store: MmapStore<Cell> =
        MmapStore::open(temp.path().join("store"), config(temp.path())).unwrap();
    fill(&mut store);
    store.sort().unwrap();

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..50 {
                    assert_eq!(store.get(9807, None).unwrap(), Some(vec![cell(0), cell(6)]));
                    assert_eq!(store.entries().unwrap().count(), 11);
                }
            });
        }
    });
}
