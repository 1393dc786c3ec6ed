//! CBOR byte format for every value the query cache persists.
//!
//! Only the encoding lives here. How large a row may be, and whether a
//! failed decode counts as corruption, is decided by `db::codec`.

mod cbor;

use crate::error::InternalError;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error as ThisError;

///
/// SerializeError
///

#[derive(Debug, ThisError)]
pub enum SerializeError {
    #[error("cbor encode failed: {0}")]
    Serialize(String),

    #[error("cbor decode failed: {0}")]
    Deserialize(String),

    #[error("encoded value is {len} bytes, over the {max_bytes} byte decode bound")]
    DeserializeSizeLimitExceeded { len: usize, max_bytes: usize },
}

impl From<SerializeError> for InternalError {
    fn from(err: SerializeError) -> Self {
        Self::serialize_internal(err.to_string())
    }
}

/// Encode `value` as CBOR.
pub fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializeError> {
    cbor::serialize(value)
}

/// Decode one value written by [`serialize`], refusing input over `max_bytes`.
pub fn deserialize_bounded<T>(bytes: &[u8], max_bytes: usize) -> Result<T, SerializeError>
where
    T: DeserializeOwned,
{
    cbor::deserialize_bounded(bytes, max_bytes)
}
