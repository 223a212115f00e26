//! # cellstore
//!
//! Out-of-core sorted key-value storage for 64-bit spatial cell keys:
//! - Append-only writes of 16-byte key records, values in a side blob
//! - Chunked external sort with a deterministic k-way merge
//! - Optional worker pool for sorting chunks in parallel
//! - Binary-search reads over positioned I/O or memory maps
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │              Multimap  /  Kv  /  FileVector                  │
//! └─────────────────────┬────────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼────────────────────────────────────────┐
//! │                        Store                                 │
//! │          (Write: append  ──▶  Read: binary search)           │
//! └──────────┬───────────────────────────────────┬───────────────┘
//!            │ first read                        │
//!            ▼                                   ▼
//!   ┌─────────────────┐                 ┌─────────────────┐
//!   │  External Sort  │                 │  Read Backend   │
//!   │ chunk ▸ merge   │                 │  file │ mmap    │
//!   └────────┬────────┘                 └─────────────────┘
//!            │
//!            ▼
//!   ┌─────────────────┐
//!   │   Worker Pool   │
//!   │  (crossbeam)    │
//!   └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod layout;

pub mod record;
pub mod sort;
pub mod store;
pub mod multimap;
pub mod kv;
pub mod vector;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CellStoreError, Result};
pub use config::{Mode, SortConfig, StoreConfig};
pub use record::KeyRecord;
pub use sort::{external_sort, SortSummary};
pub use store::{
    BincodeCodec, Entry, FileBackend, FileStore, IntegerCodec, MmapBackend, MmapStore, PairCodec,
    Store, StoreState, ValueCodec,
};
pub use multimap::{Group, Multimap};
pub use kv::Kv;
pub use vector::{FileVector, MemoryVector, MmapVector, VectorKey, VectorStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of cellstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
