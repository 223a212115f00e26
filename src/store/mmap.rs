//! Memory-mapped backend
//!
//! Maps the sorted key file and value blob once and serves reads as slices.

use std::borrow::Cow;
use std::fs::File;
use std::path::Path;

use memmap2::{Mmap, MmapOptions};

use crate::error::{CellStoreError, IoContext, Result};
use crate::record::{self, KeyRecord, KEY_SIZE, RECORD_SIZE};

use super::backend::{check_index, ReadBackend};

/// Read backend over memory maps
pub struct MmapBackend {
    /// `None` for an empty file, which cannot be mapped
    keys: Option<Mmap>,
    values: Option<Mmap>,
    count: u64,
}

impl MmapBackend {
    fn record_slice(&self, index: u64, len: usize) -> Result<&[u8]> {
        check_index(index, self.count)?;
        let start = index as usize * RECORD_SIZE;
        self.keys
            .as_ref()
            .and_then(|map| map.get(start..start + len))
            .ok_or_else(|| {
                CellStoreError::InvalidRecord(format!("record {} is outside the key map", index))
            })
    }
}

impl ReadBackend for MmapBackend {
    fn open(keys: &Path, values: Option<&Path>) -> Result<Self> {
        let (keys_map, size) = map_file(keys)?;
        if size % RECORD_SIZE as u64 != 0 {
            return Err(CellStoreError::InvalidRecord(format!(
                "{:?} holds {} bytes, not a multiple of {}",
                keys, size, RECORD_SIZE
            )));
        }

        let values_map = match values {
            Some(path) => map_file(path)?.0,
            None => None,
        };

        tracing::debug!("mapped {:?} ({} bytes)", keys, size);

        Ok(Self {
            keys: keys_map,
            values: values_map,
            count: size / RECORD_SIZE as u64,
        })
    }

    fn record_count(&self) -> u64 {
        self.count
    }

    fn key_at(&self, index: u64) -> Result<u64> {
        record::read_key(self.record_slice(index, KEY_SIZE)?)
    }

    fn record_at(&self, index: u64) -> Result<KeyRecord> {
        let mut records = record::decode(self.record_slice(index, RECORD_SIZE)?)?;
        records
            .pop()
            .ok_or_else(|| CellStoreError::InvalidRecord("empty record slice".to_string()))
    }

    fn value_bytes(&self, offset: u32, len: u32) -> Result<Cow<'_, [u8]>> {
        if len == 0 {
            return Ok(Cow::Borrowed(&[]));
        }
        let start = offset as usize;
        self.values
            .as_ref()
            .and_then(|map| map.get(start..start + len as usize))
            .map(Cow::Borrowed)
            .ok_or_else(|| {
                CellStoreError::InvalidRecord(format!(
                    "value range {}+{} is outside the value map",
                    offset, len
                ))
            })
    }
}

/// Map a whole file read-only; empty files yield no map
fn map_file(path: &Path) -> Result<(Option<Mmap>, u64)> {
    let file = File::open(path).at("opening for mmap", path)?;
    let size = file.metadata().at("reading size of", path)?.len();
    if size == 0 {
        return Ok((None, 0));
    }

    // SAFETY: the store only maps files after the read transition; nothing in
    // the crate writes to them afterwards.
    let map = unsafe { MmapOptions::new().map(&file) }.at("mapping", path)?;
    Ok((Some(map), size))
}
