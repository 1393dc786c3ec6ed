//! ## Crate layout
//! - `core`: the index store, key layouts, codecs, and the key-value contract.
//! - `kv`: the ordered transaction traits plus the in-memory reference engine.
//! - `obs`: metrics sink and counter reports.
//!
//! The `prelude` module carries the vocabulary a sync layer needs to drive
//! the store: queries, targets, document keys, and the store itself.

pub use querycache_core as core;
pub use querycache_core::{kv, obs};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//
// Errors
//

pub use querycache_core::error::{ErrorClass, ErrorOrigin, InternalError as Error};

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        config::QueryCacheConfig,
        db::{
            CborTargetCodec, NoopReferenceDelegate, QueryCache, ReferenceDelegate,
            TargetCodec as _, ensure_target_global,
        },
        kv::{KvCursor as _, KvTransaction as _, MemoryKv},
        model::{
            Direction, DocumentKey, DocumentKeySet, FilterOp, FilterValue, Query, ResourcePath,
            ResumeToken, SequenceNumber, SnapshotVersion, TargetData, TargetId, TargetPurpose,
            TargetQuery as _,
        },
    };
}
