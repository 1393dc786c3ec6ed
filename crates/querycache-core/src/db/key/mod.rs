//! Module: db::key
//! Responsibility: byte layouts for every key and membership value the cache owns.
//! Does not own: payload formats (see `db::codec`) or scan policy.
//! Boundary: all key bytes written or parsed by `db::cache` go through here.
//!
//! Every table starts with a one-byte tag so a prefix scan never leaves it.
//! Encodings are order-preserving: byte order of keys matches the logical
//! order of their components.

mod decode;
mod encode;


use std::fmt;

pub(crate) use decode::{
    DocumentMarker, decode_document_target_key, decode_query_target_key, decode_sentinel_value,
    decode_target_document_key, decode_target_key,
};
pub use decode::describe_key;
pub(crate) use encode::{
    document_target_key, document_target_prefix, encode_sentinel_value, query_target_key,
    query_target_prefix, sentinel_key, table_prefix, target_document_key, target_document_prefix,
    target_global_key, target_key,
};

///
/// Table
///
/// Logical table inside the shared keyspace.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Table {
    TargetGlobal,
    Target,
    QueryTarget,
    TargetDocument,
    DocumentTarget,
}

impl Table {
    pub(crate) const ALL: [Self; 5] = [
        Self::TargetGlobal,
        Self::Target,
        Self::QueryTarget,
        Self::TargetDocument,
        Self::DocumentTarget,
    ];

    #[must_use]
    pub(crate) const fn tag(self) -> u8 {
        match self {
            Self::TargetGlobal => 0x10,
            Self::Target => 0x11,
            Self::QueryTarget => 0x12,
            Self::TargetDocument => 0x13,
            Self::DocumentTarget => 0x14,
        }
    }

    #[must_use]
    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|table| table.tag() == tag)
    }

    /// Stable label used in logs and metrics.
    #[must_use]
    pub(crate) const fn label(self) -> &'static str {
        match self {
            Self::TargetGlobal => "target_global",
            Self::Target => "target",
            Self::QueryTarget => "query_target",
            Self::TargetDocument => "target_document",
            Self::DocumentTarget => "document_target",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
