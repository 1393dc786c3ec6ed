//! Core engine for querycache: the on-device target/query index store, its
//! key layouts and payload codecs, and the ordered key-value contract it runs on.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod config;
pub mod db;
pub mod error;
pub mod kv;
pub mod model;
pub mod obs;
pub mod serialize;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, stores, codecs, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::model::{
        DocumentKey, DocumentKeySet, Query, ResourcePath, SequenceNumber, SnapshotVersion,
        TargetData, TargetId, TargetPurpose, TargetQuery,
    };
}
