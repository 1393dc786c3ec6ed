use crate::{
    error::InternalError,
    kv::{KvCursor, KvTransaction},
};
use std::{collections::BTreeMap, ops::Bound};

type Rows = BTreeMap<Vec<u8>, Vec<u8>>;

///
/// MemoryKv
///
/// Ordered in-memory engine with staged transactions.
/// A transaction works on a private copy of the rows; `commit` publishes it
/// and dropping the transaction discards it.
///

#[derive(Clone, Debug, Default)]
pub struct MemoryKv {
    rows: Rows,
}

impl MemoryKv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a write transaction. The borrow keeps a single writer at a time.
    pub fn begin(&mut self) -> MemoryTransaction<'_> {
        let staged = self.rows.clone();

        MemoryTransaction { db: self, staged }
    }

    /// Read a committed value.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.rows.get(key).map(Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate committed rows in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.rows.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

///
/// MemoryTransaction
///

#[derive(Debug)]
pub struct MemoryTransaction<'db> {
    db: &'db mut MemoryKv,
    staged: Rows,
}

impl MemoryTransaction<'_> {
    /// Publish every staged write.
    pub fn commit(self) {
        self.db.rows = self.staged;
    }
}

impl KvTransaction for MemoryTransaction<'_> {
    type Cursor<'a>
        = MemoryCursor<'a>
    where
        Self: 'a;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, InternalError> {
        Ok(self.staged.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), InternalError> {
        self.staged.insert(key.to_vec(), value.to_vec());

        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), InternalError> {
        self.staged.remove(key);

        Ok(())
    }

    fn cursor(&self) -> Result<Self::Cursor<'_>, InternalError> {
        Ok(MemoryCursor {
            rows: &self.staged,
            current: None,
        })
    }
}

///
/// MemoryCursor
///

#[derive(Debug)]
pub struct MemoryCursor<'a> {
    rows: &'a Rows,
    current: Option<(&'a [u8], &'a [u8])>,
}

impl<'a> MemoryCursor<'a> {
    fn first_in(&self, lower: Bound<&[u8]>) -> Option<(&'a [u8], &'a [u8])> {
        let rows: &'a Rows = self.rows;

        rows.range::<[u8], _>((lower, Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

impl KvCursor for MemoryCursor<'_> {
    fn seek(&mut self, key: &[u8]) -> Result<(), InternalError> {
        self.current = self.first_in(Bound::Included(key));

        Ok(())
    }

    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn next(&mut self) -> Result<(), InternalError> {
        let Some((key, _)) = self.current else {
            return Err(InternalError::kv_internal("cursor advanced past the end"));
        };
        self.current = self.first_in(Bound::Excluded(key));

        Ok(())
    }

    fn key(&self) -> &[u8] {
        self.current.map_or(&[][..], |(k, _)| k)
    }

    fn value(&self) -> &[u8] {
        self.current.map_or(&[][..], |(_, v)| v)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_from<T: KvTransaction>(txn: &T, start: &[u8]) -> Vec<Vec<u8>> {
        let mut cursor = txn.cursor().unwrap();
        cursor.seek(start).unwrap();

        let mut keys = Vec::new();
        while cursor.valid() {
            keys.push(cursor.key().to_vec());
            cursor.next().unwrap();
        }

        keys
    }

    #[test]
    fn committed_writes_are_published() {
        let mut kv = MemoryKv::new();

        let mut txn = kv.begin();
        txn.put(b"a", b"1").unwrap();
        txn.commit();

        assert_eq!(kv.get(b"a"), Some(&b"1"[..]));
    }

    #[test]
    fn dropped_transaction_discards_writes() {
        let mut kv = MemoryKv::new();
        {
            let mut txn = kv.begin();
            txn.put(b"a", b"1").unwrap();
            assert_eq!(txn.get(b"a").unwrap(), Some(b"1".to_vec()));
        }

        assert!(kv.is_empty());

        let mut txn = kv.begin();
        txn.put(b"b", b"2").unwrap();
        drop(txn);

        assert!(kv.is_empty());
    }

    #[test]
    fn cursor_seeks_to_first_key_at_or_after_target() {
        let mut kv = MemoryKv::new();
        let mut txn = kv.begin();
        for key in [&b"a"[..], b"ab", b"b", b"b\x00", b"c"] {
            txn.put(key, b"").unwrap();
        }

        assert_eq!(
            collect_from(&txn, b"aa"),
            vec![b"ab".to_vec(), b"b".to_vec(), b"b\x00".to_vec(), b"c".to_vec()]
        );
        assert!(collect_from(&txn, b"d").is_empty());
    }

    #[test]
    fn cursor_sees_staged_deletes() {
        let mut kv = MemoryKv::new();
        let mut txn = kv.begin();
        txn.put(b"a", b"").unwrap();
        txn.put(b"b", b"").unwrap();
        txn.delete(b"a").unwrap();
        txn.delete(b"missing").unwrap();

        assert_eq!(collect_from(&txn, b""), vec![b"b".to_vec()]);
    }

    #[test]
    fn advancing_an_exhausted_cursor_is_an_error() {
        let mut kv = MemoryKv::new();
        let txn = kv.begin();
        let mut cursor = txn.cursor().unwrap();
        cursor.seek(b"").unwrap();

        assert!(!cursor.valid());
        assert!(cursor.next().is_err());
    }
}
