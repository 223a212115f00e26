//! K-Way Merge
//!
//! Streams many pre-sorted record files into one globally ordered output.
//!
//! Ties between files are broken by source index (position in the input
//! list), so the merge is deterministic and stable with respect to input
//! order.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::BytesMut;

use crate::error::{IoContext, Result};
use crate::record::{self, KeyRecord, RECORD_SIZE};

/// Records read ahead per source file
pub const READ_AHEAD_RECORDS: usize = 1024;

/// Records buffered before each write to the output
pub const WRITE_BATCH_RECORDS: usize = 1024;

/// Buffered read position in one sorted file
pub struct SortedFileCursor {
    path: PathBuf,
    file: File,
    /// Total bytes in the file
    total_size: u64,
    /// Next unread byte
    read_offset: u64,
    /// Decoded records not yet taken
    buffered: VecDeque<KeyRecord>,
}

impl SortedFileCursor {
    /// Open a sorted file for merging
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).at("opening sorted chunk", path)?;
        let total_size = file.metadata().at("reading size of", path)?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            total_size,
            read_offset: 0,
            buffered: VecDeque::with_capacity(READ_AHEAD_RECORDS),
        })
    }

    /// The record that would be returned next, refilling the buffer if needed
    pub fn current(&mut self) -> Result<Option<&KeyRecord>> {
        self.prepare()?;
        Ok(self.buffered.front())
    }

    /// Take the next record, or `None` once the file is exhausted
    pub fn next_record(&mut self) -> Result<Option<KeyRecord>> {
        self.prepare()?;
        Ok(self.buffered.pop_front())
    }

    /// True once every record has been taken
    pub fn is_exhausted(&self) -> bool {
        self.buffered.is_empty() && self.read_offset >= self.total_size
    }

    /// Refill the read-ahead buffer when it runs empty
    fn prepare(&mut self) -> Result<()> {
        if !self.buffered.is_empty() || self.read_offset >= self.total_size {
            return Ok(());
        }

        let remaining = self.total_size - self.read_offset;
        let length = remaining.min((READ_AHEAD_RECORDS * RECORD_SIZE) as u64) as usize;
        let mut buffer = vec![0u8; length];

        self.file
            .seek(SeekFrom::Start(self.read_offset))
            .at("seeking sorted chunk", &self.path)?;
        self.file
            .read_exact(&mut buffer)
            .at("reading sorted chunk", &self.path)?;

        self.buffered.extend(record::decode(&buffer)?);
        self.read_offset += length as u64;
        Ok(())
    }
}

/// Entry in the merge heap
struct HeapEntry {
    record: KeyRecord,
    source: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        record::compare(&self.record, &other.record).then(self.source.cmp(&other.source))
    }
}

/// Merge sorted record files into `output`, returning the number of records
///
/// An empty input list produces an empty output file.
pub fn merge_sorted_files(inputs: &[PathBuf], output: &Path) -> Result<u64> {
    let mut cursors = inputs
        .iter()
        .map(|path| SortedFileCursor::open(path))
        .collect::<Result<Vec<_>>>()?;

    // Seed the heap with the head of every file
    let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::with_capacity(cursors.len());
    for (source, cursor) in cursors.iter_mut().enumerate() {
        if let Some(record) = cursor.next_record()? {
            heap.push(Reverse(HeapEntry { record, source }));
        }
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(output)
        .at("creating merge output", output)?;
    let mut writer = BufWriter::new(file);

    let mut batch: Vec<KeyRecord> = Vec::with_capacity(WRITE_BATCH_RECORDS);
    let mut encoded = BytesMut::with_capacity(WRITE_BATCH_RECORDS * RECORD_SIZE);
    let mut written = 0u64;

    while let Some(Reverse(entry)) = heap.pop() {
        batch.push(entry.record);
        if batch.len() >= WRITE_BATCH_RECORDS {
            written += flush_batch(&mut batch, &mut encoded, &mut writer, output)?;
        }

        // Next record from the same file
        if let Some(record) = cursors[entry.source].next_record()? {
            heap.push(Reverse(HeapEntry {
                record,
                source: entry.source,
            }));
        }
    }

    written += flush_batch(&mut batch, &mut encoded, &mut writer, output)?;
    writer.flush().at("flushing merge output", output)?;

    Ok(written)
}

fn flush_batch(
    batch: &mut Vec<KeyRecord>,
    encoded: &mut BytesMut,
    writer: &mut BufWriter<File>,
    output: &Path,
) -> Result<u64> {
    if batch.is_empty() {
        return Ok(0);
    }
    encoded.clear();
    record::encode_into(batch, encoded);
    writer.write_all(&encoded[..]).at("writing merge output", output)?;

    let count = batch.len() as u64;
    batch.clear();
    Ok(count)
}
