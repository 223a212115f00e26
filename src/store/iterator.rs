//! Store Iterators
//!
//! Sequential walks over a sorted store in ascending key order.

use crate::error::Result;
use crate::record::KeyRecord;

use super::backend::ReadBackend;
use super::codec::ValueCodec;
use super::{Entry, Store};

/// Iterator over `(key, value)` entries in sorted key order
pub struct Entries<'a, V, C, B> {
    store: &'a Store<V, C, B>,
    reader: &'a B,
    /// Next record to read
    index: u64,
    count: u64,
}

impl<'a, V, C, B> Entries<'a, V, C, B>
where
    C: ValueCodec<V>,
    B: ReadBackend,
{
    pub(super) fn new(store: &'a Store<V, C, B>, reader: &'a B) -> Self {
        Self {
            store,
            reader,
            index: 0,
            count: reader.record_count(),
        }
    }
}

impl<V, C, B> Iterator for Entries<'_, V, C, B>
where
    C: ValueCodec<V>,
    B: ReadBackend,
{
    type Item = Result<Entry<V>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let index = self.index;
        self.index += 1;

        Some(self.reader.record_at(index).and_then(|record| {
            let value = self.store.decode_value(self.reader, &record)?;
            Ok(Entry {
                key: record.key(),
                value,
            })
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.index) as usize;
        (remaining, Some(remaining))
    }
}

/// Iterator over raw records in sorted order
pub struct Records<'a, B> {
    reader: &'a B,
    index: u64,
    count: u64,
}

impl<'a, B: ReadBackend> Records<'a, B> {
    pub(super) fn new(reader: &'a B) -> Self {
        Self {
            reader,
            index: 0,
            count: reader.record_count(),
        }
    }
}

impl<B: ReadBackend> Iterator for Records<'_, B> {
    type Item = Result<KeyRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let index = self.index;
        self.index += 1;
        Some(self.reader.record_at(index))
    }
}
