//! Positioned-I/O backend
//!
//! Reads records and values with `pread`-style calls on read-only
//! descriptors. No file cursor is shared, so readers do not contend.

use std::borrow::Cow;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{CellStoreError, IoContext, Result};
use crate::record::{self, KeyRecord, KEY_SIZE, RECORD_SIZE};

use super::backend::{check_index, ReadBackend};

/// Read backend over plain file descriptors
pub struct FileBackend {
    keys_path: PathBuf,
    keys: File,
    values: Option<(PathBuf, File)>,
    count: u64,
}

impl ReadBackend for FileBackend {
    fn open(keys: &Path, values: Option<&Path>) -> Result<Self> {
        let keys_file = File::open(keys).at("opening sorted keys", keys)?;
        let size = keys_file.metadata().at("reading size of", keys)?.len();
        if size % RECORD_SIZE as u64 != 0 {
            return Err(CellStoreError::InvalidRecord(format!(
                "{:?} holds {} bytes, not a multiple of {}",
                keys, size, RECORD_SIZE
            )));
        }

        let values = match values {
            Some(path) => Some((
                path.to_path_buf(),
                File::open(path).at("opening value blob", path)?,
            )),
            None => None,
        };

        Ok(Self {
            keys_path: keys.to_path_buf(),
            keys: keys_file,
            values,
            count: size / RECORD_SIZE as u64,
        })
    }

    fn record_count(&self) -> u64 {
        self.count
    }

    fn key_at(&self, index: u64) -> Result<u64> {
        check_index(index, self.count)?;
        let mut buf = [0u8; KEY_SIZE];
        read_exact_at(&self.keys, &mut buf, index * RECORD_SIZE as u64)
            .at("reading key", &self.keys_path)?;
        record::read_key(&buf)
    }

    fn record_at(&self, index: u64) -> Result<KeyRecord> {
        check_index(index, self.count)?;
        let mut buf = [0u8; RECORD_SIZE];
        read_exact_at(&self.keys, &mut buf, index * RECORD_SIZE as u64)
            .at("reading record", &self.keys_path)?;
        let mut records = record::decode(&buf)?;
        records
            .pop()
            .ok_or_else(|| CellStoreError::InvalidRecord("empty record buffer".to_string()))
    }

    fn value_bytes(&self, offset: u32, len: u32) -> Result<Cow<'_, [u8]>> {
        if len == 0 {
            return Ok(Cow::Borrowed(&[]));
        }
        let (path, file) = self.values.as_ref().ok_or_else(|| {
            CellStoreError::InvalidRecord(format!("record references {} value bytes but no value blob exists", len))
        })?;
        let mut buf = vec![0u8; len as usize];
        read_exact_at(file, &mut buf, offset as u64).at("reading value", path)?;
        Ok(Cow::Owned(buf))
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
