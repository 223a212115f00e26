//! Store-backed vector

use std::path::Path;

use crate::config::StoreConfig;
use crate::error::{CellStoreError, Result};
use crate::store::{BincodeCodec, FileBackend, MmapBackend, ReadBackend, Store, ValueCodec};

use super::{VectorKey, VectorStore};

/// Vector persisted in a store at `base`
pub struct FileVector<V, C = BincodeCodec<V>, B = FileBackend> {
    store: Store<V, C, B>,
}

/// Vector read through memory maps
pub type MmapVector<V, C = BincodeCodec<V>> = FileVector<V, C, MmapBackend>;

impl<V, C, B> FileVector<V, C, B>
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

impl<V, C, B> FileVector<V, C, B>
where
    C: ValueCodec<V>,
    B: ReadBackend,
{
    pub fn with_codec(base: impl AsRef<Path>, config: StoreConfig, codec: C) -> Result<Self> {
        Ok(Self {
            store: Store::with_codec(base, config, codec)?,
        })
    }

    pub fn store(&self) -> &Store<V, C, B> {
        &self.store
    }

    /// Release handles and delete the vector's files
    pub fn close(self) -> Result<()> {
        self.store.close(true)
    }
}

impl<V, C, B> VectorStore<V> for FileVector<V, C, B>
where
    V: VectorKey,
    C: ValueCodec<V>,
    B: ReadBackend,
{
    fn push(&mut self, value: V) -> Result<()> {
        self.store.set(value.key(), &value)
    }

    fn len(&self) -> u64 {
        self.store.len()
    }

    fn sort(&self) -> Result<()> {
        self.store.sort()
    }

    fn get_at(&self, index: u64) -> Result<V> {
        self.store
            .get_at(index)?
            .map(|entry| entry.value)
            .ok_or(CellStoreError::KeyNotFound)
    }

    fn get_by_key(&self, key: u64) -> Result<V> {
        self.store
            .get(key, Some(1))?
            .and_then(|values| values.into_iter().next())
            .ok_or(CellStoreError::KeyNotFound)
    }

    fn has(&self, key: u64) -> Result<bool> {
        self.store.has(key)
    }

    fn values(&self) -> Result<Box<dyn Iterator<Item = Result<V>> + '_>> {
        let entries = self.store.entries()?;
        Ok(Box::new(entries.map(|entry| entry.map(|entry| entry.value))))
    }
}
