//! Configuration for cellstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{CellStoreError, Result};

/// How a store keeps its values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Values are encoded into `<base>.values`; records carry `{offset, length}`
    #[default]
    Blob,

    /// Values are small integers packed into the record payload; no value blob
    InlineInteger,
}

/// Options for the external sort
#[derive(Debug, Clone)]
pub struct SortConfig {
    /// Max number of 16-byte records sorted in memory at once (chunk size)
    pub memory_budget_records: usize,

    /// Requested worker threads; 1 keeps the sort on the calling thread
    pub thread_count: usize,

    /// Directory for temporary per-chunk sorted files
    pub tmp_dir: PathBuf,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            memory_budget_records: 100_000,
            thread_count: 1,
            tmp_dir: std::env::temp_dir(),
        }
    }
}

impl SortConfig {
    /// Create a new sort config builder
    pub fn builder() -> SortConfigBuilder {
        SortConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.memory_budget_records == 0 {
            return Err(CellStoreError::Config(
                "memory_budget_records must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for SortConfig
#[derive(Default)]
pub struct SortConfigBuilder {
    config: SortConfig,
}

impl SortConfigBuilder {
    /// Set the number of records sorted in memory per chunk
    pub fn memory_budget_records(mut self, records: usize) -> Self {
        self.config.memory_budget_records = records;
        self
    }

    /// Set the requested worker thread count
    pub fn thread_count(mut self, count: usize) -> Self {
        self.config.thread_count = count;
        self
    }

    /// Set the directory for temporary chunk files
    pub fn tmp_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tmp_dir = path.into();
        self
    }

    pub fn build(self) -> SortConfig {
        self.config
    }
}

/// Configuration for a single store instance
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    // -------------------------------------------------------------------------
    // Layout
    // -------------------------------------------------------------------------
    /// Inline integers or a separate value blob
    pub mode: Mode,

    /// The keys on disk are already sorted; skip the external sort
    pub sorted: bool,

    // -------------------------------------------------------------------------
    // Sort
    // -------------------------------------------------------------------------
    /// Options used by the one-time sort on the read transition
    pub sort: SortConfig,
}

impl StoreConfig {
    /// Create a new config builder
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.sort.validate()
    }
}

/// Builder for StoreConfig
#[derive(Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Set the value mode
    pub fn mode(mut self, mode: Mode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Mark the on-disk keys as already sorted
    pub fn sorted(mut self, sorted: bool) -> Self {
        self.config.sorted = sorted;
        self
    }

    /// Set the number of records sorted in memory per chunk
    pub fn memory_budget_records(mut self, records: usize) -> Self {
        self.config.sort.memory_budget_records = records;
        self
    }

    /// Set the requested worker thread count
    pub fn thread_count(mut self, count: usize) -> Self {
        self.config.sort.thread_count = count;
        self
    }

    /// Set the directory for temporary chunk files
    pub fn tmp_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.sort.tmp_dir = path.into();
        self
    }

    /// Replace the whole sort configuration
    pub fn sort_config(mut self, sort: SortConfig) -> Self {
        self.config.sort = sort;
        self
    }

    pub fn build(self) -> StoreConfig {
        self.config
    }
}
