//! Store Writer
//!
//! Append handles held while a store is in the write state.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use bytes::BytesMut;

use crate::config::Mode;
use crate::error::{CellStoreError, IoContext, Result};
use crate::layout;
use crate::record::{self, KeyRecord, RECORD_SIZE};

/// Appends records to `{base}.keys` and values to `{base}.values`
pub(crate) struct StoreWriter {
    keys_path: PathBuf,
    keys: BufWriter<File>,
    values: Option<(PathBuf, BufWriter<File>)>,
    /// Byte offset of the next value in the blob
    value_offset: u64,
    /// Reused encode buffer for one record
    scratch: BytesMut,
}

impl StoreWriter {
    /// Open (or resume) the append logs of a store
    ///
    /// Returns the writer and the number of records already on disk.
    pub(crate) fn open(base: &Path, mode: Mode) -> Result<(Self, u64)> {
        let keys_path = layout::keys_path(base);
        let keys = open_append(&keys_path)?;
        let key_bytes = keys.metadata().at("reading size of", &keys_path)?.len();
        if key_bytes % RECORD_SIZE as u64 != 0 {
            return Err(CellStoreError::InvalidRecord(format!(
                "{:?} holds {} bytes, not a multiple of {}",
                keys_path, key_bytes, RECORD_SIZE
            )));
        }

        let (values, value_offset) = match mode {
            Mode::Blob => {
                let values_path = layout::values_path(base);
                let file = open_append(&values_path)?;
                let len = file.metadata().at("reading size of", &values_path)?.len();
                (Some((values_path, BufWriter::new(file))), len)
            }
            Mode::InlineInteger => (None, 0),
        };

        let writer = Self {
            keys_path,
            keys: BufWriter::new(keys),
            values,
            value_offset,
            scratch: BytesMut::with_capacity(RECORD_SIZE),
        };
        Ok((writer, key_bytes / RECORD_SIZE as u64))
    }

    /// Append a value to the blob and a record pointing at it
    pub(crate) fn append_blob(&mut self, key: u64, value: &[u8]) -> Result<()> {
        let (offset, length) = match (u32::try_from(self.value_offset), u32::try_from(value.len())) {
            (Ok(offset), Ok(length)) if offset.checked_add(length).is_some() => (offset, length),
            _ => {
                return Err(CellStoreError::Storage(format!(
                    "value of {} bytes at offset {} exceeds the 4 GiB blob limit",
                    value.len(),
                    self.value_offset
                )))
            }
        };

        let (values_path, values) = self.values.as_mut().ok_or_else(|| {
            CellStoreError::StateViolation("store has no value blob in inline mode".to_string())
        })?;
        values.write_all(value).at("appending value", values_path)?;
        self.value_offset += value.len() as u64;

        self.append_record(KeyRecord::blob(key, offset, length))
    }

    /// Append a bare record
    pub(crate) fn append_record(&mut self, record: KeyRecord) -> Result<()> {
        self.scratch.clear();
        record::encode_into(&[record], &mut self.scratch);
        self.keys
            .write_all(&self.scratch[..])
            .at("appending key record", &self.keys_path)
    }

    /// Push buffered bytes to the files
    pub(crate) fn flush(&mut self) -> Result<()> {
        self.keys.flush().at("flushing keys", &self.keys_path)?;
        if let Some((path, values)) = self.values.as_mut() {
            values.flush().at("flushing values", path)?;
        }
        Ok(())
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .at("opening for append", path)
}
