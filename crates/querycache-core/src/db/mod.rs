//! Module: db
//! Responsibility: the target/query index store and its persisted layouts.
//! Does not own: the key-value engine or when targets come and go.
//! Boundary: hosts drive everything through `QueryCache` and a caller-owned
//! `KvTransaction`.

pub mod cache;
pub mod codec;
pub mod delegate;
pub mod key;
pub mod migration;

// re-exports
pub use cache::{OrphanedDocuments, QueryCache, TargetIter};
pub use codec::{CborTargetCodec, TargetCodec};
pub use delegate::{NoopReferenceDelegate, ReferenceDelegate};
pub use key::describe_key;
pub use migration::ensure_target_global;
