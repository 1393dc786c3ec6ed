//! Runtime configuration for the query cache.
//!
//! Values are plain data so hosts can embed them in their own config files;
//! every field has a default, so a partial document deserializes cleanly.

use serde::{Deserialize, Serialize};

/// Default upper bound for one encoded target row.
pub const DEFAULT_MAX_TARGET_BYTES: usize = 4 * 1024 * 1024;

/// Default upper bound for the encoded metadata record.
pub const DEFAULT_MAX_METADATA_BYTES: usize = 4 * 1024;

///
/// QueryCacheConfig
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct QueryCacheConfig {
    /// Encoded target rows above this size are rejected on write and treated
    /// as corruption on read.
    pub max_target_bytes: usize,

    /// Decode bound for the metadata singleton.
    pub max_metadata_bytes: usize,
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            max_target_bytes: DEFAULT_MAX_TARGET_BYTES,
            max_metadata_bytes: DEFAULT_MAX_METADATA_BYTES,
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{deserialize_bounded, serialize};
    use std::collections::BTreeMap;

    #[test]
    fn partial_document_falls_back_to_defaults() {
        let mut partial = BTreeMap::new();
        partial.insert("max_target_bytes", 512_usize);
        let bytes = serialize(&partial).unwrap();

        let config: QueryCacheConfig = deserialize_bounded(&bytes, 1024).unwrap();

        assert_eq!(config.max_target_bytes, 512);
        assert_eq!(config.max_metadata_bytes, DEFAULT_MAX_METADATA_BYTES);
    }
}
