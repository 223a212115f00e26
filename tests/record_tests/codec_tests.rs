//! Tests for the 16-byte key record codec
//!
//! These tests verify:
//! - Byte layout of encoded records
//! - Round trips through encode/decode
//! - Rejection of truncated input
//! - Key ordering (high word, then low word)

use std::cmp::Ordering;

use bytes::BytesMut;
use cellstore::record::{self, KeyRecord, RECORD_SIZE};
use cellstore::CellStoreError;

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_layout_is_little_endian_words() {
    let record = KeyRecord {
        key_low: 0x0403_0201,
        key_high: 0x0807_0605,
        payload_a: 0x0c0b_0a09,
        payload_b: 0x100f_0e0d,
    };

    let bytes = record::encode(&[record]);

    assert_eq!(bytes.len(), RECORD_SIZE);
    assert_eq!(&bytes[..], &(1u8..=16).collect::<Vec<_>>()[..]);
}

#[test]
fn test_encode_splits_key_into_low_and_high() {
    // 987678987330 = 229 * 2^32 + 4131476546
    let record = KeyRecord::new(987_678_987_330, 7, 9);

    assert_eq!(record.key_high, 229);
    assert_eq!(record.key_low, 4_131_476_546);
    assert_eq!(record.key(), 987_678_987_330);
}

#[test]
fn test_encode_into_appends() {
    let mut buf = BytesMut::new();
    record::encode_into(&[KeyRecord::new(1, 0, 0)], &mut buf);
    record::encode_into(&[KeyRecord::new(2, 0, 0), KeyRecord::new(3, 0, 0)], &mut buf);

    assert_eq!(buf.len(), 3 * RECORD_SIZE);
    let keys: Vec<u64> = record::decode(&buf).unwrap().iter().map(|r| r.key()).collect();
    assert_eq!(keys, vec![1, 2, 3]);
}

#[test]
fn test_round_trip_preserves_every_field() {
    let records = vec![
        KeyRecord::new(0, 0, 0),
        KeyRecord::new(u64::MAX, u32::MAX, u32::MAX),
        KeyRecord::blob(5005, 1024, 17),
        KeyRecord::inline(22, 0xdead_beef_cafe_f00d),
    ];

    let decoded = record::decode(&record::encode(&records)).unwrap();

    assert_eq!(decoded, records);
}

#[test]
fn test_decode_empty() {
    assert!(record::decode(&[]).unwrap().is_empty());
}

#[test]
fn test_decode_rejects_partial_record() {
    let mut bytes = record::encode(&[KeyRecord::new(1, 2, 3)]).to_vec();
    bytes.pop();

    let result = record::decode(&bytes);

    assert!(matches!(result, Err(CellStoreError::InvalidRecord(_))));
}

#[test]
fn test_read_key_uses_first_eight_bytes() {
    let bytes = record::encode(&[KeyRecord::new(123_456_789_012, 1, 2)]);

    assert_eq!(record::read_key(&bytes).unwrap(), 123_456_789_012);
    assert!(record::read_key(&bytes[..7]).is_err());
}

// =============================================================================
// Payload Helper Tests
// =============================================================================

#[test]
fn test_inline_value_round_trip() {
    let record = KeyRecord::inline(9, 12_345_678_900_001);

    assert_eq!(record.inline_value(), 12_345_678_900_001);
    assert_eq!(record.key(), 9);
}

#[test]
fn test_blob_offset_and_length() {
    let record = KeyRecord::blob(9, 4096, 33);

    assert_eq!(record.value_offset(), 4096);
    assert_eq!(record.value_len(), 33);
}

#[test]
fn test_split_and_join_key() {
    for key in [0, 1, u32::MAX as u64, u32::MAX as u64 + 1, u64::MAX] {
        let (low, high) = record::split_key(key);
        assert_eq!(record::join_key(low, high), key);
    }
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_compare_high_word_first() {
    // Larger low word, smaller high word
    let a = KeyRecord {
        key_low: u32::MAX,
        key_high: 0,
        ..Default::default()
    };
    let b = KeyRecord {
        key_low: 0,
        key_high: 1,
        ..Default::default()
    };

    assert_eq!(record::compare(&a, &b), Ordering::Less);
    assert_eq!(record::compare(&b, &a), Ordering::Greater);
}

#[test]
fn test_compare_ignores_payload() {
    let a = KeyRecord::new(42, 1, 1);
    let b = KeyRecord::new(42, 9, 9);

    assert_eq!(record::compare(&a, &b), Ordering::Equal);
}

#[test]
fn test_compare_matches_numeric_order() {
    let keys = [
        0u64,
        1,
        22,
        5005,
        5_000_001,
        987_678_987_330,
        12_345_678_900_000,
        12_345_678_900_001,
        u64::MAX,
    ];

    for &x in &keys {
        for &y in &keys {
            let rx = KeyRecord::new(x, 0, 0);
            let ry = KeyRecord::new(y, 0, 0);
            assert_eq!(record::compare(&rx, &ry), x.cmp(&y));
            assert_eq!(record::compare_key(&rx, y), x.cmp(&y));
            assert_eq!(record::compare_keys(x, y), x.cmp(&y));
        }
    }
}

#[test]
fn test_sort_by_compare_is_stable() {
    let mut records = vec![
        KeyRecord::new(5, 0, 0),
        KeyRecord::new(1, 0, 0),
        KeyRecord::new(5, 1, 0),
        KeyRecord::new(1, 1, 0),
        KeyRecord::new(5, 2, 0),
    ];

    records.sort_by(record::compare);

    let order: Vec<(u64, u32)> = records.iter().map(|r| (r.key(), r.payload_a)).collect();
    assert_eq!(order, vec![(1, 0), (1, 1), (5, 0), (5, 1), (5, 2)]);
}
