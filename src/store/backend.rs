//! Read backends
//!
//! How read-state bytes are fetched once a store is sorted.

use std::borrow::Cow;
use std::path::Path;

use crate::error::{CellStoreError, Result};
use crate::record::KeyRecord;

/// Random access to a sorted key file and its value blob
///
/// Implementations are opened read-only and never mutate, so a shared
/// reference is enough for concurrent readers.
pub trait ReadBackend: Sized + Send + Sync {
    /// Open a sorted key file and, in blob mode, the value blob
    fn open(keys: &Path, values: Option<&Path>) -> Result<Self>;

    /// Number of records in the key file
    fn record_count(&self) -> u64;

    /// Only the 8 key bytes of the record at `index`
    fn key_at(&self, index: u64) -> Result<u64>;

    /// The full record at `index`
    fn record_at(&self, index: u64) -> Result<KeyRecord>;

    /// `len` bytes at `offset` of the value blob
    fn value_bytes(&self, offset: u32, len: u32) -> Result<Cow<'_, [u8]>>;
}

pub(crate) fn check_index(index: u64, count: u64) -> Result<()> {
    if index >= count {
        return Err(CellStoreError::InvalidRecord(format!(
            "record index {} out of range for {} records",
            index, count
        )));
    }
    Ok(())
}
