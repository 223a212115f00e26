//! Multimap
//!
//! Many values per key on top of [`Store`]. Sorted iteration emits equal keys
//! contiguously, so grouping is a single pass over consecutive runs.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::path::Path;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::record;
use crate::store::{BincodeCodec, Entries, Entry, FileBackend, ReadBackend, Store, ValueCodec};

/// A key with every value stored under it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<V> {
    pub key: u64,
    pub values: Vec<V>,
}

/// File-backed multimap
pub struct Multimap<V, C = BincodeCodec<V>, B = FileBackend> {
    store: Store<V, C, B>,
}

impl<V, C, B> Multimap<V, C, B>
where
    C: ValueCodec<V> + Default,
    B: ReadBackend,
{
    pub fn open(base: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        Ok(Self {
            store: Store::open(base, config)?,
        })
    }
}

impl<V, C, B> Multimap<V, C, B>
where
    C: ValueCodec<V>,
    B: ReadBackend,
{
    /// Wrap an existing store
    pub fn from_store(store: Store<V, C, B>) -> Self {
        Self { store }
    }

    /// Add one more value under `key`
    pub fn set(&mut self, key: u64, value: &V) -> Result<()> {
        self.store.set(key, value)
    }

    /// Every value under `key`, in sorted order
    pub fn get(&self, key: u64) -> Result<Option<Vec<V>>> {
        self.store.get(key, None)
    }

    pub fn has(&self, key: u64) -> Result<bool> {
        self.store.has(key)
    }

    /// Total number of values (not keys)
    pub fn len(&self) -> u64 {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn sort(&self) -> Result<()> {
        self.store.sort()
    }

    /// Walk `(key, values)` groups in ascending key order
    pub fn entries(&self) -> Result<Groups<'_, V, C, B>> {
        Ok(Groups {
            entries: self.store.entries()?.peekable(),
        })
    }

    pub fn store(&self) -> &Store<V, C, B> {
        &self.store
    }

    pub fn close(self, cleanup: bool) -> Result<()> {
        self.store.close(cleanup)
    }
}

/// Iterator grouping consecutive equal keys
pub struct Groups<'a, V, C, B>
where
    C: ValueCodec<V>,
    B: ReadBackend,
{
    entries: Peekable<Entries<'a, V, C, B>>,
}

impl<V, C, B> Iterator for Groups<'_, V, C, B>
where
    C: ValueCodec<V>,
    B: ReadBackend,
{
    type Item = Result<Group<V>>;

    fn next(&mut self) -> Option<Self::Item> {
        let Entry { key, value } = match self.entries.next()? {
            Ok(entry) => entry,
            Err(e) => return Some(Err(e)),
        };

        let mut values = vec![value];
        loop {
            let same_key = match self.entries.peek() {
                Some(Ok(next)) => record::compare_keys(next.key, key) == Ordering::Equal,
                // Surface the error on the following call
                Some(Err(_)) | None => false,
            };
            if !same_key {
                break;
            }
            match self.entries.next() {
                Some(Ok(next)) => values.push(next.value),
                Some(Err(e)) => return Some(Err(e)),
                None => break,
            }
        }

        Some(Ok(Group { key, values }))
    }
}
