//! Single-value key-value view over [`Store`]
//!
//! `get` returns the first value stored under a key.

use std::path::Path;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::store::{BincodeCodec, FileBackend, ReadBackend, Store, ValueCodec};

pub struct Kv<V, C = BincodeCodec<V>, B = FileBackend> {
    store: Store<V, C, B>,
}

impl<V, C, B> Kv<V, C, B>
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

impl<V, C, B> Kv<V, C, B>
where
    C: ValueCodec<V>,
    B: ReadBackend,
{
    pub fn set(&mut self, key: u64, value: &V) -> Result<()> {
        self.store.set(key, value)
    }

    pub fn get(&self, key: u64) -> Result<Option<V>> {
        Ok(self
            .store
            .get(key, Some(1))?
            .and_then(|values| values.into_iter().next()))
    }

    pub fn has(&self, key: u64) -> Result<bool> {
        self.store.has(key)
    }

    pub fn len(&self) -> u64 {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Values in ascending key order
    pub fn values(&self) -> Result<impl Iterator<Item = Result<V>> + '_> {
        Ok(self.store.entries()?.map(|entry| entry.map(|entry| entry.value)))
    }

    pub fn close(self, cleanup: bool) -> Result<()> {
        self.store.close(cleanup)
    }
}
