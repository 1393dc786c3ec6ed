//! Module: kv
//! Responsibility: the ordered key-value transaction contract the cache runs on.
//! Does not own: durability, compaction, or commit scheduling.
//! Boundary: every cache operation receives one transaction handle explicitly.

mod memory;

use crate::error::InternalError;

pub use memory::{MemoryCursor, MemoryKv, MemoryTransaction};

///
/// KvTransaction
///
/// One open transaction over an ordered byte-keyed map.
/// Keys compare lexicographically as unsigned bytes. Writes become visible to
/// later reads and cursors opened on the same transaction.
///

pub trait KvTransaction {
    type Cursor<'a>: KvCursor
    where
        Self: 'a;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, InternalError>;

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), InternalError>;

    /// Remove `key`; deleting an absent key is not an error.
    fn delete(&mut self, key: &[u8]) -> Result<(), InternalError>;

    /// Open an unpositioned cursor. Call `seek` before reading.
    fn cursor(&self) -> Result<Self::Cursor<'_>, InternalError>;
}

///
/// KvCursor
///
/// Forward cursor. `key`/`value` are only meaningful while `valid()` holds.
///

pub trait KvCursor {
    /// Position on the first key `>= key`.
    fn seek(&mut self, key: &[u8]) -> Result<(), InternalError>;

    fn valid(&self) -> bool;

    fn next(&mut self) -> Result<(), InternalError>;

    fn key(&self) -> &[u8];

    fn value(&self) -> &[u8];
}
