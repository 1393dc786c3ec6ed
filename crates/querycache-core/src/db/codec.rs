use crate::{
    config::DEFAULT_MAX_TARGET_BYTES,
    error::InternalError,
    model::{Query, SnapshotVersion, TargetData, TargetGlobal, TargetQuery},
    serialize::{SerializeError, deserialize_bounded, serialize},
};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

///
/// DB Codec
///
/// Payload formats for the rows the cache persists.
///
/// Policy lives here:
/// - payload size limits for persisted formats
/// - error classification/origin for persisted payload failures
///
/// Format logic lives in `crate::serialize`.
///

/// Upper bound for an encoded snapshot version.
pub(crate) const MAX_VERSION_BYTES: usize = 64;

///
/// TargetCodec
///
/// Encodes target records and snapshot versions for storage.
/// Decode failures must surface as corruption.
///

pub trait TargetCodec {
    type Query: TargetQuery;

    fn encode_target(&self, target: &TargetData<Self::Query>) -> Result<Vec<u8>, InternalError>;

    fn decode_target(&self, bytes: &[u8]) -> Result<TargetData<Self::Query>, InternalError>;

    fn encode_version(&self, version: SnapshotVersion) -> Result<Vec<u8>, InternalError>;

    fn decode_version(&self, bytes: &[u8]) -> Result<SnapshotVersion, InternalError>;
}

///
/// CborTargetCodec
///
/// CBOR codec for any serde-capable query type.
///

#[derive(Debug)]
pub struct CborTargetCodec<Q = Query> {
    max_target_bytes: usize,
    _marker: PhantomData<fn() -> Q>,
}

impl<Q> CborTargetCodec<Q> {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_max_target_bytes(DEFAULT_MAX_TARGET_BYTES)
    }

    /// Codec with a custom decode bound for target rows.
    #[must_use]
    pub const fn with_max_target_bytes(max_target_bytes: usize) -> Self {
        Self {
            max_target_bytes,
            _marker: PhantomData,
        }
    }
}

impl<Q> Clone for CborTargetCodec<Q> {
    fn clone(&self) -> Self {
        Self::with_max_target_bytes(self.max_target_bytes)
    }
}

impl<Q> Default for CborTargetCodec<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q: TargetQuery> TargetCodec for CborTargetCodec<Q> {
    type Query = Q;

    fn encode_target(&self, target: &TargetData<Q>) -> Result<Vec<u8>, InternalError> {
        Ok(serialize(target)?)
    }

    fn decode_target(&self, bytes: &[u8]) -> Result<TargetData<Q>, InternalError> {
        deserialize_with_limit(bytes, self.max_target_bytes, "target")
    }

    fn encode_version(&self, version: SnapshotVersion) -> Result<Vec<u8>, InternalError> {
        Ok(serialize(&version)?)
    }

    fn decode_version(&self, bytes: &[u8]) -> Result<SnapshotVersion, InternalError> {
        deserialize_with_limit(bytes, MAX_VERSION_BYTES, "snapshot version")
    }
}

/// Encode the metadata singleton.
pub(in crate::db) fn serialize_metadata(metadata: &TargetGlobal) -> Result<Vec<u8>, InternalError> {
    Ok(serialize(metadata)?)
}

/// Decode the metadata singleton using the configured bound.
pub(in crate::db) fn deserialize_metadata(
    bytes: &[u8],
    max_bytes: usize,
) -> Result<TargetGlobal, InternalError> {
    deserialize_with_limit(bytes, max_bytes, "target metadata")
}

// Shared bounded decode wrapper for persisted payload policy.
fn deserialize_with_limit<T>(
    bytes: &[u8],
    max_bytes: usize,
    payload_label: &'static str,
) -> Result<T, InternalError>
where
    T: DeserializeOwned,
{
    deserialize_bounded(bytes, max_bytes)
        .map_err(|source| map_deserialize_error(source, payload_label))
}

// Convert format-level deserialize errors into cache classification.
fn map_deserialize_error(source: SerializeError, payload_label: &'static str) -> InternalError {
    InternalError::serialize_corruption(format!("{payload_label} decode failed: {source}"))
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{ErrorClass, ErrorOrigin},
        model::{ResourcePath, ResumeToken, SequenceNumber, TargetId, TargetPurpose},
    };

    fn sample_target() -> TargetData<Query> {
        let query = Query::at(ResourcePath::parse("rooms").unwrap()).limit(3);

        TargetData::new(
            query,
            TargetId::new(2),
            SequenceNumber::new(10),
            TargetPurpose::LimboResolution,
        )
        .with_resume_token(ResumeToken::from(vec![0, 1, 2]), SnapshotVersion::new(5, 6))
    }

    #[test]
    fn target_rows_decode_to_the_encoded_record() {
        let codec = CborTargetCodec::<Query>::new();
        let target = sample_target();

        let bytes = codec.encode_target(&target).unwrap();

        assert_eq!(codec.decode_target(&bytes).unwrap(), target);
    }

    #[test]
    fn oversized_target_row_is_corruption() {
        let codec = CborTargetCodec::<Query>::with_max_target_bytes(8);
        let bytes = CborTargetCodec::<Query>::new()
            .encode_target(&sample_target())
            .unwrap();

        let err = codec.decode_target(&bytes).unwrap_err();

        assert_eq!(err.class, ErrorClass::Corruption);
        assert_eq!(err.origin, ErrorOrigin::Serialize);
        assert!(err.message.starts_with("target decode failed"));
    }

    #[test]
    fn garbage_version_is_corruption() {
        let codec = CborTargetCodec::<Query>::new();

        let err = codec.decode_version(&[0xFF, 0xFF]).unwrap_err();

        assert!(err.is_corruption());
    }

    #[test]
    fn metadata_respects_decode_bound() {
        let metadata = TargetGlobal {
            target_count: 3,
            ..TargetGlobal::default()
        };
        let bytes = serialize_metadata(&metadata).unwrap();

        assert_eq!(deserialize_metadata(&bytes, 1024).unwrap(), metadata);
        assert!(
            deserialize_metadata(&bytes, bytes.len() - 1)
                .unwrap_err()
                .is_corruption()
        );
    }
}
