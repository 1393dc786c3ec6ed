//! End-to-end lifecycle of a listen target against the in-memory engine:
//! registration, watch-driven membership, collection, and restart.

use querycache::{ErrorClass, obs, prelude::*};
use std::collections::HashSet;

///
/// GcDelegate
///
/// Minimal garbage-collection layer: remembers which documents lost a
/// reference so it can stamp sentinels for them after the call returns.
///

#[derive(Default)]
struct GcDelegate {
    released: Vec<DocumentKey>,
}

impl ReferenceDelegate for GcDelegate {
    fn add_reference(&mut self, _: &DocumentKey) {}

    fn remove_reference(&mut self, key: &DocumentKey) {
        self.released.push(key.clone());
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn doc(path: &str) -> DocumentKey {
    DocumentKey::parse(path).unwrap()
}

fn rooms_query() -> Query {
    Query::at(ResourcePath::parse("rooms").unwrap())
        .filter("open", FilterOp::Equal, FilterValue::Bool(true))
        .order_by("name", Direction::Ascending)
        .limit(20)
}

fn fresh_kv() -> MemoryKv {
    let mut kv = MemoryKv::new();
    let mut txn = kv.begin();
    ensure_target_global(&mut txn, &CborTargetCodec::<Query>::new()).unwrap();
    txn.commit();

    kv
}

#[test]
fn version_matches_the_workspace() {
    assert!(!querycache::VERSION.is_empty());
}

#[test]
fn listen_collect_and_restart() {
    init_tracing();
    obs::metrics_reset_all();
    let mut kv = fresh_kv();
    let live_id = TargetId::new(2);

    // Listen, receive matches, then stop listening to the first query.
    {
        let mut txn = kv.begin();
        let mut cache: QueryCache =
            QueryCache::start(&txn, CborTargetCodec::new(), QueryCacheConfig::default())
                .unwrap();
        let mut gc = GcDelegate::default();

        let rooms = TargetData::new(
            rooms_query(),
            TargetId::new(1),
            SequenceNumber::new(10),
            TargetPurpose::Listen,
        );
        let limbo = TargetData::new(
            Query::at(ResourcePath::parse("rooms/b").unwrap()),
            live_id,
            SequenceNumber::new(11),
            TargetPurpose::LimboResolution,
        );
        cache.add_target(&mut txn, &rooms).unwrap();
        cache.add_target(&mut txn, &limbo).unwrap();

        cache
            .add_matching_keys(
                &mut txn,
                &mut gc,
                [&doc("rooms/a"), &doc("rooms/b")],
                rooms.target_id(),
            )
            .unwrap();
        cache
            .add_matching_keys(&mut txn, &mut gc, [&doc("rooms/b")], live_id)
            .unwrap();

        let snapshot = SnapshotVersion::new(1_700_000_000, 5);
        cache
            .update_target(
                &mut txn,
                &rooms
                    .clone()
                    .with_resume_token(ResumeToken::from(&b"r1"[..]), snapshot),
            )
            .unwrap();
        cache
            .set_last_remote_snapshot_version(&mut txn, snapshot)
            .unwrap();

        // Stop listening: drop memberships, stamp sentinels for released docs.
        let matched = cache.get_matching_keys(&txn, rooms.target_id()).unwrap();
        cache
            .remove_matching_keys(&mut txn, &mut gc, &matched, rooms.target_id())
            .unwrap();
        for key in gc.released.drain(..) {
            cache
                .write_sentinel(&mut txn, &key, SequenceNumber::new(12))
                .unwrap();
        }

        txn.commit();
    }

    // Restart and collect.
    let mut txn = kv.begin();
    let mut cache: QueryCache =
        QueryCache::start(&txn, CborTargetCodec::new(), QueryCacheConfig::default()).unwrap();

    assert_eq!(cache.target_count(), 2);
    assert_eq!(cache.highest_target_id(), live_id);
    assert_eq!(
        cache.highest_listen_sequence_number(),
        SequenceNumber::new(11)
    );
    assert_eq!(
        cache.last_remote_snapshot_version(),
        SnapshotVersion::new(1_700_000_000, 5)
    );
    let rooms = cache.get_target(&txn, &rooms_query()).unwrap().unwrap();
    assert_eq!(rooms.resume_token().as_bytes(), b"r1");

    let live: HashSet<TargetId> = [live_id].into_iter().collect();
    let swept = cache
        .remove_targets(&mut txn, SequenceNumber::new(12), &live)
        .unwrap();
    assert_eq!(swept, 1);
    assert_eq!(cache.get_target(&txn, &rooms_query()).unwrap(), None);

    // rooms/b is still held by the live limbo target.
    let collected = cache
        .remove_orphaned_documents(&mut txn, SequenceNumber::new(12))
        .unwrap();
    assert_eq!(collected, [doc("rooms/a")]);
    assert!(cache.contains(&txn, &doc("rooms/b")).unwrap());
    assert!(!cache.contains(&txn, &doc("rooms/a")).unwrap());

    let report = obs::metrics_report();
    let counters = report.counters.unwrap();
    assert_eq!(counters.ops.target_adds, 2);
    assert_eq!(counters.ops.targets_swept, 1);
    assert_eq!(counters.ops.orphans_reported, 1);
}

#[test]
fn missing_metadata_is_reported_as_corruption() {
    let mut kv = MemoryKv::new();
    let txn = kv.begin();

    let err = QueryCache::<CborTargetCodec>::start(
        &txn,
        CborTargetCodec::new(),
        QueryCacheConfig::default(),
    )
    .unwrap_err();

    assert_eq!(err.class, ErrorClass::Corruption);
    assert!(err.is_corruption());
}
