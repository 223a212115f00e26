//! Store Module
//!
//! An append-then-sort key-value store over 16-byte key records.
//!
//! ## Lifecycle
//! ```text
//!   ┌─────────┐   first get/has/entries/sort   ┌─────────┐
//!   │  Write  │ ─────────────────────────────▶ │  Read   │
//!   │ (set)   │   flush, external sort, open   │ (final) │
//!   └─────────┘                                └─────────┘
//! ```
//! - **Write**: `set()` appends to `{base}.keys` (and `{base}.values` in blob
//!   mode). Keys arrive in any order.
//! - **Read**: lookups binary-search `{base}.sortedKeys`. `set()` now fails
//!   with `StateViolation`.
//!
//! ## Concurrency
//! - `set()` takes `&mut self`: one writer, no internal write locks
//! - Read operations take `&self`; after the transition they only touch the
//!   read-only backend, so any number of threads may read at once
//! - The transition itself is serialized by `writer`'s mutex, so concurrent
//!   first readers sort exactly once

mod backend;
mod codec;
mod file;
mod iterator;
mod mmap;
mod writer;

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::config::{Mode, StoreConfig};
use crate::error::{CellStoreError, IoContext, Result};
use crate::layout;
use crate::record::{self, KeyRecord, RECORD_SIZE};
use crate::sort;

pub use backend::ReadBackend;
pub use codec::{BincodeCodec, IntegerCodec, PairCodec, ValueCodec};
pub use file::FileBackend;
pub use iterator::{Entries, Records};
pub use mmap::MmapBackend;

use writer::StoreWriter;

/// Store with positioned-I/O reads
pub type FileStore<V, C = BincodeCodec<V>> = Store<V, C, FileBackend>;

/// Store with memory-mapped reads
pub type MmapStore<V, C = BincodeCodec<V>> = Store<V, C, MmapBackend>;

/// Which half of the lifecycle a store is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Write,
    Read,
}

/// One key and its decoded value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<V> {
    pub key: u64,
    pub value: V,
}

/// Out-of-core sorted key-value store
pub struct Store<V, C = BincodeCodec<V>, B = FileBackend> {
    /// Path + file name without extension
    base: PathBuf,
    config: StoreConfig,
    codec: C,
    /// Number of records written
    len: u64,
    /// Append handles; `None` once the store is read-only
    writer: Mutex<Option<StoreWriter>>,
    /// Set exactly once, on the read transition
    reader: OnceLock<B>,
    _marker: PhantomData<fn() -> V>,
}

impl<V, C, B> Store<V, C, B>
where
    C: ValueCodec<V> + Default,
    B: ReadBackend,
{
    /// Open or create a store at `base` with the default codec
    pub fn open(base: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        Self::with_codec(base, config, C::default())
    }
}

impl<V, C, B> Store<V, C, B>
where
    C: ValueCodec<V>,
    B: ReadBackend,
{
    /// Open or create a store at `base` with an explicit codec
    ///
    /// A store configured as `sorted` starts read-only and reads
    /// `{base}.sortedKeys`, or `{base}.keys` if no sorted file exists.
    /// Otherwise the append logs are opened (or resumed) for writing.
    pub fn with_codec(base: impl AsRef<Path>, config: StoreConfig, codec: C) -> Result<Self> {
        config.validate()?;
        let base = base.as_ref().to_path_buf();

        let (writer, len) = if config.sorted {
            let keys = Self::read_keys_path(&base);
            let bytes = fs::metadata(&keys).at("reading size of", &keys)?.len();
            (None, bytes / RECORD_SIZE as u64)
        } else {
            let (writer, len) = StoreWriter::open(&base, config.mode)?;
            (Some(writer), len)
        };

        tracing::debug!("opened store {:?} with {} records ({:?})", base, len, config.mode);

        Ok(Self {
            base,
            config,
            codec,
            len,
            writer: Mutex::new(writer),
            reader: OnceLock::new(),
            _marker: PhantomData,
        })
    }

    // =========================================================================
    // Write State
    // =========================================================================

    /// Append a value under `key`
    ///
    /// Fails with `StateViolation` once the store is read-only, and with
    /// `TypeMismatch` in inline mode if the codec cannot inline the value.
    pub fn set(&mut self, key: u64, value: &V) -> Result<()> {
        let writer = match self.writer.get_mut().as_mut() {
            Some(writer) => writer,
            None => {
                return Err(CellStoreError::StateViolation(format!(
                    "cannot write to {:?} after it has been sorted",
                    self.base
                )))
            }
        };

        match self.config.mode {
            Mode::Blob => {
                let bytes = self.codec.encode(value)?;
                writer.append_blob(key, &bytes)?;
            }
            Mode::InlineInteger => {
                let raw = self.codec.to_inline(value)?;
                writer.append_record(KeyRecord::inline(key, raw))?;
            }
        }

        self.len += 1;
        Ok(())
    }

    // =========================================================================
    // Read State
    // =========================================================================

    /// All values stored under `key`, in sorted order
    ///
    /// Stops after `max` values when given (`Some(0)` means no limit).
    /// Returns `None` when the key is absent.
    pub fn get(&self, key: u64, max: Option<usize>) -> Result<Option<Vec<V>>> {
        let reader = self.reader()?;
        let count = reader.record_count();
        let limit = max.filter(|&max| max > 0);

        let mut index = lower_bound(reader, key)?;
        let mut values = Vec::new();
        while index < count {
            let record = reader.record_at(index)?;
            if record::compare_key(&record, key) != Ordering::Equal {
                break;
            }
            values.push(self.decode_value(reader, &record)?);
            if limit.is_some_and(|max| values.len() >= max) {
                break;
            }
            index += 1;
        }

        Ok(if values.is_empty() { None } else { Some(values) })
    }

    /// True if at least one value is stored under `key`
    pub fn has(&self, key: u64) -> Result<bool> {
        let reader = self.reader()?;
        let index = lower_bound(reader, key)?;
        if index >= reader.record_count() {
            return Ok(false);
        }
        Ok(record::compare_keys(reader.key_at(index)?, key) == Ordering::Equal)
    }

    /// Entry at ordinal `index` of sorted order
    pub fn get_at(&self, index: u64) -> Result<Option<Entry<V>>> {
        let reader = self.reader()?;
        if index >= reader.record_count() {
            return Ok(None);
        }
        let record = reader.record_at(index)?;
        let value = self.decode_value(reader, &record)?;
        Ok(Some(Entry {
            key: record.key(),
            value,
        }))
    }

    /// Walk every entry in ascending key order
    ///
    /// Each call starts a fresh walk from the beginning.
    pub fn entries(&self) -> Result<Entries<'_, V, C, B>> {
        let reader = self.reader()?;
        Ok(Entries::new(self, reader))
    }

    /// Walk the raw sorted records
    pub fn records(&self) -> Result<Records<'_, B>> {
        let reader = self.reader()?;
        Ok(Records::new(reader))
    }

    /// Force the read transition; a no-op once sorted
    pub fn sort(&self) -> Result<()> {
        self.reader().map(|_| ())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of records
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once the keys on disk are in sorted order
    pub fn is_sorted(&self) -> bool {
        self.config.sorted || self.reader.get().is_some()
    }

    /// Current lifecycle state; never waits on an in-progress sort
    pub fn state(&self) -> StoreState {
        if self.config.sorted || self.reader.get().is_some() {
            StoreState::Read
        } else {
            StoreState::Write
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Release every handle; with `cleanup`, delete the store's files
    pub fn close(self, cleanup: bool) -> Result<()> {
        let Store {
            base,
            writer,
            reader,
            ..
        } = self;

        if let Some(mut writer) = writer.into_inner() {
            writer.flush()?;
        }
        drop(reader);

        if cleanup {
            for path in [
                layout::keys_path(&base),
                layout::values_path(&base),
                layout::sorted_keys_path(&base),
            ] {
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e).at("removing", &path),
                }
            }
            tracing::debug!("removed store files for {:?}", base);
        }
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// The read backend, performing the one-time transition if needed
    fn reader(&self) -> Result<&B> {
        if let Some(reader) = self.reader.get() {
            return Ok(reader);
        }

        let mut writer = self.writer.lock();
        // Another reader may have finished the transition while we waited
        if let Some(reader) = self.reader.get() {
            return Ok(reader);
        }

        if let Some(writer) = writer.as_mut() {
            writer.flush()?;
        }

        let keys = if self.config.sorted {
            Self::read_keys_path(&self.base)
        } else {
            let summary = sort::external_sort(
                std::slice::from_ref(&self.base),
                &self.base,
                &self.config.sort,
            )?;
            tracing::debug!(
                "store {:?} sorted: {} records in {} chunks",
                self.base,
                summary.records,
                summary.chunks
            );
            layout::sorted_keys_path(&self.base)
        };

        let values = layout::values_path(&self.base);
        let values = (self.config.mode == Mode::Blob && values.exists()).then_some(values);
        let backend = B::open(&keys, values.as_deref())?;

        // Drops the append handles; the store is read-only from here on
        *writer = None;
        Ok(self.reader.get_or_init(|| backend))
    }

    /// Key file a read-only store reads from
    fn read_keys_path(base: &Path) -> PathBuf {
        let sorted_keys = layout::sorted_keys_path(base);
        if sorted_keys.exists() {
            sorted_keys
        } else {
            layout::keys_path(base)
        }
    }

    pub(crate) fn decode_value(&self, reader: &B, record: &KeyRecord) -> Result<V> {
        match self.config.mode {
            Mode::Blob => {
                let bytes = reader.value_bytes(record.value_offset(), record.value_len())?;
                self.codec.decode(&bytes)
            }
            Mode::InlineInteger => self.codec.from_inline(record.inline_value()),
        }
    }
}

/// First index whose key is not less than `key`, or the record count
///
/// Compares only the 8 key bytes of each record the search visits.
pub fn lower_bound<B: ReadBackend>(reader: &B, key: u64) -> Result<u64> {
    let mut lo = 0u64;
    let mut hi = reader.record_count();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if record::compare_keys(reader.key_at(mid)?, key) == Ordering::Less {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}
