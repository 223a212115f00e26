//! External Sort Module
//!
//! Sorts key files larger than memory by sorting bounded chunks on disk and
//! merging them.
//!
//! ## Pipeline
//! ```text
//!   {input}.keys ──▶ chunks ≤ budget ──▶ sort_chunk (sequential or pool)
//!                                              │
//!                                              ▼
//!                         es_*.tmp  ──▶ k-way merge ──▶ {output}.sortedKeys
//!
//!   {input}.values ──▶ concatenated onto {output}.values (offsets rebased)
//! ```
//!
//! Inputs and the output are store base paths (see [`crate::layout`]).

mod chunk;
mod merge;
mod pool;

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crate::config::SortConfig;
use crate::error::{CellStoreError, IoContext, Result};
use crate::layout;
use crate::record::RECORD_SIZE;

pub use chunk::{sort_chunk, Chunk};
pub use merge::{merge_sorted_files, SortedFileCursor, READ_AHEAD_RECORDS, WRITE_BATCH_RECORDS};
pub use pool::sort_chunks_parallel;

/// At or below this many chunks the sort stays on the calling thread
pub const PARALLEL_CHUNK_THRESHOLD: usize = 10;

/// Sequence for unique temporary file names within this process
static NEXT_RUN: AtomicU64 = AtomicU64::new(0);

/// Size information for one sort input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSize {
    /// File name of the base path, used to name temporaries
    pub name: String,
    /// Store base path
    pub base: PathBuf,
    /// Bytes in `{base}.keys`
    pub key_bytes: u64,
    /// Bytes in `{base}.values`, `None` if there is no value blob
    pub value_bytes: Option<u64>,
    /// Where this input's blob starts in the concatenated output blob
    pub merged_value_offset: Option<u64>,
    /// This input is also the sort output
    pub is_output: bool,
}

/// What a completed sort did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSummary {
    /// Number of inputs merged
    pub inputs: usize,
    /// Number of chunks sorted
    pub chunks: usize,
    /// Records written to the sorted output
    pub records: u64,
    /// Worker threads used (1 for the sequential path)
    pub workers: usize,
    /// Value bytes appended to the output blob
    pub value_bytes: u64,
}

/// Sort the keys of every input store into `{output}.sortedKeys`
///
/// Blocks until all chunks are sorted and merged. Temporary chunk files are
/// always removed; the inputs' own files are left for the caller. A failed
/// merge is logged, cleaned up and returned as [`CellStoreError::MergeFailure`].
pub fn external_sort(inputs: &[PathBuf], output: &Path, config: &SortConfig) -> Result<SortSummary> {
    config.validate()?;

    // 1) Sizes and merged value offsets
    let sizes = input_sizes(inputs, output)?;

    // 2) Chunk plan
    fs::create_dir_all(&config.tmp_dir).at("creating temporary directory", &config.tmp_dir)?;
    let run_id = format!("{}-{}", std::process::id(), NEXT_RUN.fetch_add(1, Ordering::Relaxed));
    let chunks = build_chunks(&sizes, &config.tmp_dir, config.memory_budget_records, &run_id);
    let chunk_count = chunks.len();
    tracing::debug!(
        "external sort {}: {} inputs, {} chunks of <= {} records",
        run_id,
        sizes.len(),
        chunk_count,
        config.memory_budget_records
    );

    // 3) Sort chunks
    let (sorted_files, workers) =
        if config.thread_count <= 1 || chunk_count <= PARALLEL_CHUNK_THRESHOLD {
            (sort_chunks_sequential(chunks)?, 1)
        } else {
            let workers = worker_count(config.thread_count, chunk_count);
            tracing::debug!("sorting {} chunks on {} workers", chunk_count, workers);
            (sort_chunks_parallel(chunks, workers)?, workers)
        };

    // 4) Merge, 5) concatenate values
    let sorted_keys = layout::sorted_keys_path(output);
    let merged = merge_sorted_files(&sorted_files, &sorted_keys).map_err(|e| {
        tracing::error!("merge into {:?} failed: {}", sorted_keys, e);
        CellStoreError::MergeFailure(Box::new(e))
    });
    let result = merged.and_then(|records| {
        let value_bytes = concat_values(&sizes, output)?;
        Ok(SortSummary {
            inputs: sizes.len(),
            chunks: chunk_count,
            records,
            workers,
            value_bytes,
        })
    });

    // 6) Cleanup
    for file in &sorted_files {
        remove_temporary(file);
    }
    match &result {
        Ok(summary) => tracing::info!(
            "sorted {} records from {} inputs into {:?}",
            summary.records,
            summary.inputs,
            sorted_keys
        ),
        Err(_) => remove_temporary(&sorted_keys),
    }
    result
}

/// Stat every input and assign merged value offsets
///
/// The output's own blob (when the output is an input) is placed first, at
/// offset 0, so it can be extended in place. Inputs and the output are matched
/// by resolved file path, so `dir/sub/../a`, `dir/a` and symlinks to it are
/// the same store.
pub fn input_sizes(inputs: &[PathBuf], output: &Path) -> Result<Vec<InputSize>> {
    let output_keys = resolve(&layout::keys_path(output))?;
    let mut resolved_keys: Vec<PathBuf> = Vec::with_capacity(inputs.len());
    let mut sizes = Vec::with_capacity(inputs.len());
    for base in inputs {
        let keys = layout::keys_path(base);
        let key_bytes = fs::metadata(&keys).at("reading size of", &keys)?.len();
        let resolved = fs::canonicalize(&keys).at("resolving", &keys)?;
        if resolved_keys.contains(&resolved) {
            return Err(CellStoreError::Config(format!(
                "{:?} is listed more than once as a sort input",
                base
            )));
        }
        if key_bytes % RECORD_SIZE as u64 != 0 {
            return Err(CellStoreError::InvalidRecord(format!(
                "{:?} holds {} bytes, not a multiple of {}",
                keys, key_bytes, RECORD_SIZE
            )));
        }

        let values = layout::values_path(base);
        let value_bytes = match fs::metadata(&values) {
            Ok(meta) => Some(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e).at("reading size of", &values),
        };

        sizes.push(InputSize {
            name: layout::base_name(base),
            base: base.clone(),
            key_bytes,
            value_bytes,
            merged_value_offset: None,
            is_output: output_keys.as_ref() == Some(&resolved),
        });
        resolved_keys.push(resolved);
    }

    // A fresh output blob is truncated; it must not be some input's blob
    if !sizes.iter().any(|size| size.is_output) {
        if let Some(target) = resolve(&layout::values_path(output))? {
            for size in &sizes {
                if resolve(&layout::values_path(&size.base))?.as_ref() == Some(&target) {
                    return Err(CellStoreError::Config(format!(
                        "output value blob {:?} belongs to input {:?}",
                        target, size.base
                    )));
                }
            }
        }
    }

    // Output first, then input order
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by_key(|&i| !sizes[i].is_output);

    let mut running = 0u64;
    for i in order {
        if let Some(bytes) = sizes[i].value_bytes {
            sizes[i].merged_value_offset = Some(running);
            running += bytes;
        }
    }

    Ok(sizes)
}

/// Split every input's key file into chunks of at most `budget_records`
pub fn build_chunks(
    sizes: &[InputSize],
    out_dir: &Path,
    budget_records: usize,
    run_id: &str,
) -> Vec<Chunk> {
    let step = (budget_records.max(1) * RECORD_SIZE) as u64;
    let mut chunks = Vec::new();

    for (input_index, size) in sizes.iter().enumerate() {
        let input_path = layout::keys_path(&size.base);
        let mut start = 0u64;
        while start < size.key_bytes {
            let end = (start + step).min(size.key_bytes);
            chunks.push(Chunk {
                source_name: size.name.clone(),
                input_index,
                input_path: input_path.clone(),
                out_dir: out_dir.to_path_buf(),
                start_byte: start,
                end_byte: end,
                value_offset: size.merged_value_offset,
                run_id: run_id.to_string(),
            });
            start = end;
        }
    }

    chunks
}

/// Sort chunks one after another on the calling thread
fn sort_chunks_sequential(chunks: Vec<Chunk>) -> Result<Vec<PathBuf>> {
    let mut sorted = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        match sort_chunk(chunk) {
            Ok(path) => sorted.push(path),
            Err(e) => {
                for path in &sorted {
                    remove_temporary(path);
                }
                return Err(e);
            }
        }
    }
    Ok(sorted)
}

/// min(requested, hardware parallelism, chunks)
fn worker_count(requested: usize, chunk_count: usize) -> usize {
    let hardware = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    requested.min(hardware).min(chunk_count).max(1)
}

/// Append every other input's value blob onto `{output}.values`
///
/// Blobs are copied in ascending merged offset order, skipping empty ones and
/// the output's own. Returns the number of bytes copied.
fn concat_values(sizes: &[InputSize], output: &Path) -> Result<u64> {
    let output_is_input = sizes.iter().any(|size| size.is_output);
    let target = layout::values_path(output);

    if sizes.iter().all(|size| size.value_bytes.is_none()) {
        // Drop a blob left by an earlier run so it never pairs with these keys
        if !output_is_input {
            match fs::remove_file(&target) {
                Ok(()) => tracing::debug!("removed stale value blob {:?}", target),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e).at("removing stale value blob", &target),
            }
        }
        return Ok(0);
    }

    let mut sources: Vec<&InputSize> = sizes
        .iter()
        .filter(|size| !size.is_output && size.value_bytes.unwrap_or(0) > 0)
        .collect();
    sources.sort_by_key(|size| size.merged_value_offset);

    if sources.is_empty() && output_is_input {
        return Ok(0);
    }

    let opened = if output_is_input {
        OpenOptions::new().create(true).append(true).open(&target)
    } else {
        OpenOptions::new().create(true).write(true).truncate(true).open(&target)
    };
    let file = opened.at("opening merged value blob", &target)?;
    let mut writer = BufWriter::new(file);

    let mut copied = 0u64;
    for source in sources {
        let path = layout::values_path(&source.base);
        let mut reader = File::open(&path).at("opening value blob", &path)?;
        copied += io::copy(&mut reader, &mut writer).at("copying value blob", &path)?;
    }
    writer.flush().at("flushing merged value blob", &target)?;

    Ok(copied)
}

/// Resolved path of an existing file, `None` if it does not exist
fn resolve(path: &Path) -> Result<Option<PathBuf>> {
    match fs::canonicalize(path) {
        Ok(resolved) => Ok(Some(resolved)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).at("resolving", path),
    }
}

/// Best-effort removal of a temporary file
pub(crate) fn remove_temporary(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!("failed to remove {:?}: {}", path, e);
        }
    }
}
