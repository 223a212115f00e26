//! Record codec
//!
//! Encoding and decoding of packed 16-byte key records.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{CellStoreError, Result};

use super::{join_key, KeyRecord, KEY_SIZE, RECORD_SIZE};

/// Encode records into a contiguous buffer
pub fn encode(records: &[KeyRecord]) -> Bytes {
    let mut buf = BytesMut::with_capacity(records.len() * RECORD_SIZE);
    encode_into(records, &mut buf);
    buf.freeze()
}

/// Append encoded records to an existing buffer
///
/// Format per record: key_low (4) + key_high (4) + payload_a (4) + payload_b (4)
pub fn encode_into(records: &[KeyRecord], buf: &mut BytesMut) {
    buf.reserve(records.len() * RECORD_SIZE);
    for record in records {
        buf.put_u32_le(record.key_low);
        buf.put_u32_le(record.key_high);
        buf.put_u32_le(record.payload_a);
        buf.put_u32_le(record.payload_b);
    }
}

/// Decode a buffer of packed records
///
/// Fails if the buffer is not a whole number of records.
pub fn decode(bytes: &[u8]) -> Result<Vec<KeyRecord>> {
    if bytes.len() % RECORD_SIZE != 0 {
        return Err(CellStoreError::InvalidRecord(format!(
            "buffer of {} bytes is not a multiple of {}",
            bytes.len(),
            RECORD_SIZE
        )));
    }

    let mut cursor = bytes;
    let mut records = Vec::with_capacity(bytes.len() / RECORD_SIZE);
    while cursor.has_remaining() {
        records.push(KeyRecord {
            key_low: cursor.get_u32_le(),
            key_high: cursor.get_u32_le(),
            payload_a: cursor.get_u32_le(),
            payload_b: cursor.get_u32_le(),
        });
    }
    Ok(records)
}

/// Read only the 8 key bytes at the front of an encoded record
pub fn read_key(bytes: &[u8]) -> Result<u64> {
    if bytes.len() < KEY_SIZE {
        return Err(CellStoreError::InvalidRecord(format!(
            "need {} key bytes, got {}",
            KEY_SIZE,
            bytes.len()
        )));
    }
    let mut cursor = &bytes[..KEY_SIZE];
    let low = cursor.get_u32_le();
    let high = cursor.get_u32_le();
    Ok(join_key(low, high))
}
