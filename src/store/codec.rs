//! Value codecs
//!
//! The store treats value bytes as opaque apart from their length. A codec
//! turns values into bytes for the value blob, and optionally into a 64-bit
//! integer for inline mode.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CellStoreError, Result};

/// Encodes and decodes store values
pub trait ValueCodec<V>: Send + Sync {
    /// Value → blob bytes
    fn encode(&self, value: &V) -> Result<Vec<u8>>;

    /// Blob bytes → value
    fn decode(&self, bytes: &[u8]) -> Result<V>;

    /// Value → inline payload. Codecs for non-numeric values keep the default.
    fn to_inline(&self, _value: &V) -> Result<u64> {
        Err(CellStoreError::TypeMismatch(
            "value cannot be stored inline, it is not an integer".to_string(),
        ))
    }

    /// Inline payload → value
    fn from_inline(&self, _raw: u64) -> Result<V> {
        Err(CellStoreError::TypeMismatch(
            "value cannot be read from an inline payload".to_string(),
        ))
    }
}

/// Serde values encoded with bincode. Blob mode only.
pub struct BincodeCodec<V> {
    _marker: PhantomData<fn() -> V>,
}

impl<V> BincodeCodec<V> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<V> Default for BincodeCodec<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for BincodeCodec<V> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for BincodeCodec<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BincodeCodec")
    }
}

impl<V> ValueCodec<V> for BincodeCodec<V>
where
    V: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| CellStoreError::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<V> {
        bincode::deserialize(bytes).map_err(|e| CellStoreError::Serialization(e.to_string()))
    }
}

/// `u64` values, e.g. an index into another store
///
/// Inline: `payload_a` holds the low word, `payload_b` the high word.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerCodec;

impl ValueCodec<u64> for IntegerCodec {
    fn encode(&self, value: &u64) -> Result<Vec<u8>> {
        Ok(value.to_le_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<u64> {
        let raw: [u8; 8] = bytes.try_into().map_err(|_| {
            CellStoreError::Serialization(format!("expected 8 bytes for u64, got {}", bytes.len()))
        })?;
        Ok(u64::from_le_bytes(raw))
    }

    fn to_inline(&self, value: &u64) -> Result<u64> {
        Ok(*value)
    }

    fn from_inline(&self, raw: u64) -> Result<u64> {
        Ok(raw)
    }
}

/// Packed `(u32, u32)` values
///
/// Inline: the first element is `payload_a`, the second `payload_b`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairCodec;

impl ValueCodec<(u32, u32)> for PairCodec {
    fn encode(&self, value: &(u32, u32)) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(8);
        bytes.extend_from_slice(&value.0.to_le_bytes());
        bytes.extend_from_slice(&value.1.to_le_bytes());
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<(u32, u32)> {
        let wide = IntegerCodec.decode(bytes)?;
        self.from_inline(wide)
    }

    fn to_inline(&self, value: &(u32, u32)) -> Result<u64> {
        Ok(crate::record::join_key(value.0, value.1))
    }

    fn from_inline(&self, raw: u64) -> Result<(u32, u32)> {
        Ok(crate::record::split_key(raw))
    }
}
