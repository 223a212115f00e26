//! Key Record Module
//!
//! The fixed-width record every store, chunk and merge works on.
//!
//! ## Wire Format
//! ```text
//! ┌────────────┬────────────┬─────────────┬─────────────┐
//! │ KeyLow (4) │ KeyHigh(4) │ PayloadA(4) │ PayloadB(4) │
//! └────────────┴────────────┴─────────────┴─────────────┘
//! ```
//! All fields are little-endian u32. `(key_high, key_low)` is the 64-bit key.
//! The payload is either an inline value (low word, high word) or the
//! `{offset, length}` of a value in the companion value blob.

mod codec;

use std::cmp::Ordering;

pub use codec::{decode, encode, encode_into, read_key};

/// Size of one encoded record in bytes
pub const RECORD_SIZE: usize = 16;

/// Number of leading bytes of a record that hold the key
pub const KEY_SIZE: usize = 8;

/// One 16-byte key record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeyRecord {
    pub key_low: u32,
    pub key_high: u32,
    pub payload_a: u32,
    pub payload_b: u32,
}

impl KeyRecord {
    /// Build a record from a 64-bit key and raw payload words
    pub fn new(key: u64, payload_a: u32, payload_b: u32) -> Self {
        let (key_low, key_high) = split_key(key);
        Self {
            key_low,
            key_high,
            payload_a,
            payload_b,
        }
    }

    /// Record pointing at `length` bytes at `offset` of the value blob
    pub fn blob(key: u64, offset: u32, length: u32) -> Self {
        Self::new(key, offset, length)
    }

    /// Record carrying a 64-bit value in its payload
    pub fn inline(key: u64, value: u64) -> Self {
        let (low, high) = split_key(value);
        Self::new(key, low, high)
    }

    /// The 64-bit key
    pub fn key(&self) -> u64 {
        join_key(self.key_low, self.key_high)
    }

    /// Payload reinterpreted as a 64-bit integer
    pub fn inline_value(&self) -> u64 {
        join_key(self.payload_a, self.payload_b)
    }

    /// Blob offset (blob mode)
    pub fn value_offset(&self) -> u32 {
        self.payload_a
    }

    /// Blob length (blob mode)
    pub fn value_len(&self) -> u32 {
        self.payload_b
    }
}

/// Split a 64-bit key into its (low, high) words
pub fn split_key(key: u64) -> (u32, u32) {
    (key as u32, (key >> 32) as u32)
}

/// Join (low, high) words into a 64-bit key
pub fn join_key(low: u32, high: u32) -> u64 {
    ((high as u64) << 32) | low as u64
}

/// Orders records by key: high word first, then low word. Payload is ignored.
///
/// Every ordering decision in the crate (chunk sort, merge, binary search,
/// multimap grouping) goes through this function.
pub fn compare(a: &KeyRecord, b: &KeyRecord) -> Ordering {
    compare_words(a.key_low, a.key_high, b.key_low, b.key_high)
}

/// Same order as [`compare`] on a bare 64-bit key
pub fn compare_key(record: &KeyRecord, key: u64) -> Ordering {
    let (low, high) = split_key(key);
    compare_words(record.key_low, record.key_high, low, high)
}

/// Same order as [`compare`] on two bare 64-bit keys
pub fn compare_keys(a: u64, b: u64) -> Ordering {
    let (a_low, a_high) = split_key(a);
    let (b_low, b_high) = split_key(b);
    compare_words(a_low, a_high, b_low, b_high)
}

fn compare_words(a_low: u32, a_high: u32, b_low: u32, b_high: u32) -> Ordering {
    a_high.cmp(&b_high).then(a_low.cmp(&b_low))
}
