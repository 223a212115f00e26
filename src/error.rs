//! Error types for cellstore
//!
//! Provides a unified error type for all operations.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias using CellStoreError
pub type Result<T> = std::result::Result<T, CellStoreError>;

/// Unified error type for cellstore operations
#[derive(Debug, Error)]
pub enum CellStoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("IO error while {action} {path:?}: {source}")]
    IoAt {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Invalid key record data: {0}")]
    InvalidRecord(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Key not found")]
    KeyNotFound,

    #[error("Store state violation: {0}")]
    StateViolation(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    // -------------------------------------------------------------------------
    // Sort Errors
    // -------------------------------------------------------------------------
    #[error("Merge of sorted chunks failed: {0}")]
    MergeFailure(#[source] Box<CellStoreError>),

    #[error("Sort worker failed: {0}")]
    Worker(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Attaches the failing path to an I/O error
pub(crate) trait IoContext<T> {
    fn at(self, action: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, action: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| CellStoreError::IoAt {
            action,
            path: path.to_path_buf(),
            source,
        })
    }
}
