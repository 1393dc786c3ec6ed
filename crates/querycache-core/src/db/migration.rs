//! Schema initialization for the target tables.
//!
//! The cache never creates its own metadata row: `QueryCache::start` treats a
//! missing row as corruption. Hosts run this once when the store is created.

use crate::{
    db::{codec, codec::TargetCodec, key},
    error::InternalError,
    kv::KvTransaction,
    model::{SnapshotVersion, TargetGlobal},
    obs::sink::{self, MetricsEvent},
};
use tracing::debug;

/// Write a default metadata row if none exists.
/// Returns whether a row was written.
pub fn ensure_target_global<T, C>(txn: &mut T, codec: &C) -> Result<bool, InternalError>
where
    T: KvTransaction,
    C: TargetCodec,
{
    let key = key::target_global_key();
    if txn.get(&key)?.is_some() {
        return Ok(false);
    }

    let metadata = TargetGlobal {
        last_remote_snapshot_version: codec.encode_version(SnapshotVersion::NONE)?,
        ..TargetGlobal::default()
    };
    txn.put(&key, &codec::serialize_metadata(&metadata)?)?;

    sink::record(MetricsEvent::MetadataWrite);
    debug!("initialized target metadata");

    Ok(true)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::CborTargetCodec, kv::MemoryKv, model::Query};

    #[test]
    fn writes_metadata_once() {
        let mut kv = MemoryKv::new();
        let codec = CborTargetCodec::<Query>::new();
        let mut txn = kv.begin();

        assert!(ensure_target_global(&mut txn, &codec).unwrap());
        let first = txn.get(&key::target_global_key()).unwrap();
        assert!(!ensure_target_global(&mut txn, &codec).unwrap());

        assert_eq!(txn.get(&key::target_global_key()).unwrap(), first);
    }

    #[test]
    fn default_metadata_decodes_to_zero_marks() {
        let mut kv = MemoryKv::new();
        let codec = CborTargetCodec::<Query>::new();
        let mut txn = kv.begin();
        ensure_target_global(&mut txn, &codec).unwrap();

        let bytes = txn.get(&key::target_global_key()).unwrap().unwrap();
        let metadata = codec::deserialize_metadata(&bytes, 1024).unwrap();

        assert_eq!(metadata.target_count, 0);
        assert_eq!(
            codec
                .decode_version(&metadata.last_remote_snapshot_version)
                .unwrap(),
            SnapshotVersion::NONE
        );
    }
}
