//! On-disk layout of a store
//!
//! A store lives at a *base path* (path + file name without extension):
//! ```text
//! {base}.keys        unsorted append log of 16-byte records
//! {base}.sortedKeys  output of the external sort
//! {base}.values      append log of value blobs (absent in inline mode)
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const KEYS_EXT: &str = "keys";
pub const SORTED_KEYS_EXT: &str = "sortedKeys";
pub const VALUES_EXT: &str = "values";

/// `{base}.keys`
pub fn keys_path(base: &Path) -> PathBuf {
    with_suffix(base, KEYS_EXT)
}

/// `{base}.sortedKeys`
pub fn sorted_keys_path(base: &Path) -> PathBuf {
    with_suffix(base, SORTED_KEYS_EXT)
}

/// `{base}.values`
pub fn values_path(base: &Path) -> PathBuf {
    with_suffix(base, VALUES_EXT)
}

/// Name used to tag temporary files derived from this base
pub fn base_name(base: &Path) -> String {
    base.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store".to_string())
}

// Appends rather than replaces, so "a.b" becomes "a.b.keys"
fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
