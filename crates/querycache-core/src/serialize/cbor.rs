use crate::serialize::SerializeError;
use serde::{Serialize, de::DeserializeOwned};
use serde_cbor::Deserializer;
use std::panic::{AssertUnwindSafe, catch_unwind};

pub(super) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializeError> {
    serde_cbor::to_vec(value).map_err(|err| SerializeError::Serialize(err.to_string()))
}

/// Decode exactly one CBOR value from `bytes`.
///
/// Oversized input is rejected before the decoder sees it, and a decoder
/// panic is reported as a deserialize error instead of unwinding further.
pub(super) fn deserialize_bounded<T>(bytes: &[u8], max_bytes: usize) -> Result<T, SerializeError>
where
    T: DeserializeOwned,
{
    if bytes.len() > max_bytes {
        return Err(SerializeError::DeserializeSizeLimitExceeded {
            len: bytes.len(),
            max_bytes,
        });
    }

    catch_unwind(AssertUnwindSafe(|| decode_exact(bytes)))
        .unwrap_or_else(|_| Err(SerializeError::Deserialize("CBOR decoder panicked".to_string())))
}

fn decode_exact<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializeError> {
    let mut de = Deserializer::from_slice(bytes);
    let value =
        T::deserialize(&mut de).map_err(|err| SerializeError::Deserialize(err.to_string()))?;
    de.end()
        .map_err(|err| SerializeError::Deserialize(err.to_string()))?;

    Ok(value)
}

///
/// TESTS
///
