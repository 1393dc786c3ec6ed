//! Shared fixtures for unit tests.

use crate::{
    config::QueryCacheConfig,
    db::{CborTargetCodec, QueryCache, ReferenceDelegate, ensure_target_global},
    kv::{KvTransaction, MemoryKv},
    model::{
        DocumentKey, FilterOp, FilterValue, Query, ResourcePath, SequenceNumber, TargetData,
        TargetId, TargetPurpose,
    },
};

/// Document key from a slash path.
pub(crate) fn doc(path: &str) -> DocumentKey {
    DocumentKey::parse(path).expect("fixture document key")
}

/// Unfiltered query over a collection path.
pub(crate) fn query(path: &str) -> Query {
    Query::at(ResourcePath::parse(path).expect("fixture path"))
}

/// Query with a single equality filter.
pub(crate) fn query_eq(path: &str, field: &str, value: FilterValue) -> Query {
    query(path).filter(field, FilterOp::Equal, value)
}

pub(crate) fn target(query: Query, id: u32, seq: u64) -> TargetData<Query> {
    TargetData::new(
        query,
        TargetId::new(id),
        SequenceNumber::new(seq),
        TargetPurpose::Listen,
    )
}

/// Store with committed default metadata.
pub(crate) fn initialized_store() -> MemoryKv {
    let mut kv = MemoryKv::new();
    let mut txn = kv.begin();
    ensure_target_global(&mut txn, &CborTargetCodec::<Query>::new()).expect("init metadata");
    txn.commit();

    kv
}

pub(crate) fn start<T: KvTransaction>(txn: &T) -> QueryCache {
    QueryCache::start(txn, CborTargetCodec::new(), QueryCacheConfig::default())
        .expect("start query cache")
}

///
/// RecordingDelegate
///

#[derive(Debug, Default)]
pub(crate) struct RecordingDelegate {
    pub(crate) added: Vec<DocumentKey>,
    pub(crate) removed: Vec<DocumentKey>,
}

impl ReferenceDelegate for RecordingDelegate {
    fn add_reference(&mut self, key: &DocumentKey) {
        self.added.push(key.clone());
    }

    fn remove_reference(&mut self, key: &DocumentKey) {
        self.removed.push(key.clone());
    }
}
