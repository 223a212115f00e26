//! Vector Store Module
//!
//! An ordered sequence of values that carry their own 64-bit key. Values are
//! pushed in any order; reads see them in ascending key order, ties in push
//! order.
//!
//! - [`FileVector`] / [`MmapVector`]: backed by a [`Store`](crate::store::Store)
//! - [`MemoryVector`]: a plain `Vec`, sorted lazily on first lookup

mod file;

use parking_lot::Mutex;

use crate::error::{CellStoreError, Result};
use crate::record;

pub use file::{FileVector, MmapVector};

/// A value whose key is derived from the value itself
pub trait VectorKey {
    fn key(&self) -> u64;
}

/// Common contract of every vector flavour
pub trait VectorStore<V> {
    /// Append a value under its own key
    fn push(&mut self, value: V) -> Result<()>;

    /// Number of values pushed
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Put the values in key order; repeated calls are no-ops
    fn sort(&self) -> Result<()>;

    /// Value at position `index` of sorted order, or `KeyNotFound`
    fn get_at(&self, index: u64) -> Result<V>;

    /// First value whose key is `key`, or `KeyNotFound`
    fn get_by_key(&self, key: u64) -> Result<V>;

    fn has(&self, key: u64) -> Result<bool>;

    /// Every value in sorted order
    fn values(&self) -> Result<Box<dyn Iterator<Item = Result<V>> + '_>>;
}

// =============================================================================
// In-Memory Vector
// =============================================================================

struct MemoryState<V> {
    items: Vec<V>,
    sorted: bool,
}

/// Vector kept entirely in memory
pub struct MemoryVector<V> {
    state: Mutex<MemoryState<V>>,
}

impl<V> Default for MemoryVector<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MemoryVector<V> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                items: Vec::new(),
                sorted: true,
            }),
        }
    }
}

impl<V: VectorKey + Clone> MemoryVector<V> {
    /// Run `f` over the items in sorted order
    fn with_sorted<T>(&self, f: impl FnOnce(&[V]) -> T) -> T {
        let mut state = self.state.lock();
        if !state.sorted {
            // Stable, so equal keys keep push order
            state
                .items
                .sort_by(|a, b| record::compare_keys(a.key(), b.key()));
            state.sorted = true;
        }
        f(&state.items)
    }

    fn lower_bound(items: &[V], key: u64) -> usize {
        items.partition_point(|item| record::compare_keys(item.key(), key).is_lt())
    }
}

impl<V: VectorKey + Clone> VectorStore<V> for MemoryVector<V> {
    fn push(&mut self, value: V) -> Result<()> {
        let state = self.state.get_mut();
        state.items.push(value);
        state.sorted = false;
        Ok(())
    }

    fn len(&self) -> u64 {
        self.state.lock().items.len() as u64
    }

    fn sort(&self) -> Result<()> {
        self.with_sorted(|_| ());
        Ok(())
    }

    fn get_at(&self, index: u64) -> Result<V> {
        self.with_sorted(|items| {
            usize::try_from(index)
                .ok()
                .and_then(|index| items.get(index))
                .cloned()
                .ok_or(CellStoreError::KeyNotFound)
        })
    }

    fn get_by_key(&self, key: u64) -> Result<V> {
        self.with_sorted(|items| {
            items
                .get(Self::lower_bound(items, key))
                .filter(|item| item.key() == key)
                .cloned()
                .ok_or(CellStoreError::KeyNotFound)
        })
    }

    fn has(&self, key: u64) -> Result<bool> {
        Ok(self.with_sorted(|items| {
            items
                .get(Self::lower_bound(items, key))
                .is_some_and(|item| item.key() == key)
        }))
    }

    fn values(&self) -> Result<Box<dyn Iterator<Item = Result<V>> + '_>> {
        let snapshot = self.with_sorted(|items| items.to_vec());
        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }
}
