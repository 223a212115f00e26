//! Chunk Sorter
//!
//! Sorts one byte range of a key file in memory and writes it to its own
//! temporary file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use crate::error::{CellStoreError, IoContext, Result};
use crate::record::{self, KeyRecord};

/// A byte-range slice of a key file assigned to one sort task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Name of the input this chunk came from
    pub source_name: String,
    /// Position of that input in the sort's input list
    pub input_index: usize,
    /// Key file to read
    pub input_path: PathBuf,
    /// Directory for the sorted output
    pub out_dir: PathBuf,
    /// First byte (inclusive), multiple of 16
    pub start_byte: u64,
    /// Last byte (exclusive), multiple of 16
    pub end_byte: u64,
    /// Added to every blob offset; `None` when the input has no value blob
    pub value_offset: Option<u64>,
    /// Identifies the sort run, keeps concurrent sorts from sharing file names
    pub run_id: String,
}

impl Chunk {
    /// Number of bytes covered by this chunk
    pub fn len(&self) -> u64 {
        self.end_byte - self.start_byte
    }

    pub fn is_empty(&self) -> bool {
        self.end_byte <= self.start_byte
    }

    /// Number of records covered by this chunk
    pub fn record_count(&self) -> u64 {
        self.len() / record::RECORD_SIZE as u64
    }

    /// Unique temporary output path for this chunk
    /// "es_{name}_{run}_{input}_{start}_{end}.tmp"
    ///
    /// The input index keeps same-named inputs from different directories
    /// apart.
    pub fn output_path(&self) -> PathBuf {
        self.out_dir.join(format!(
            "es_{}_{}_{}_{}_{}.tmp",
            self.source_name, self.run_id, self.input_index, self.start_byte, self.end_byte
        ))
    }
}

/// Sort one chunk and return the path of its sorted output
///
/// The sort is stable, so equal keys keep their order within the chunk.
pub fn sort_chunk(chunk: &Chunk) -> Result<PathBuf> {
    // Read the byte range
    let mut input = File::open(&chunk.input_path).at("opening chunk input", &chunk.input_path)?;
    input
        .seek(SeekFrom::Start(chunk.start_byte))
        .at("seeking chunk input", &chunk.input_path)?;
    let mut buffer = vec![0u8; chunk.len() as usize];
    input
        .read_exact(&mut buffer)
        .at("reading chunk input", &chunk.input_path)?;

    let mut records = record::decode(&buffer)?;
    records.sort_by(record::compare);

    if let Some(offset) = chunk.value_offset.filter(|&offset| offset > 0) {
        rebase_offsets(&mut records, offset)?;
    }

    // Write the sorted chunk (truncate: a retried chunk replaces its own file)
    let output = chunk.output_path();
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&output)
        .at("creating sorted chunk", &output)?;
    file.write_all(&record::encode(&records))
        .at("writing sorted chunk", &output)?;
    file.flush().at("flushing sorted chunk", &output)?;

    tracing::trace!(
        "sorted chunk {}[{}..{}) -> {:?}",
        chunk.source_name,
        chunk.start_byte,
        chunk.end_byte,
        output
    );

    Ok(output)
}

/// Shift blob offsets into the concatenated value blob
fn rebase_offsets(records: &mut [KeyRecord], offset: u64) -> Result<()> {
    for record in records {
        let shifted = record.payload_a as u64 + offset;
        record.payload_a = u32::try_from(shifted).map_err(|_| {
            CellStoreError::Storage(format!(
                "merged value offset {} exceeds the 4 GiB blob limit",
                shifted
            ))
        })?;
    }
    Ok(())
}
