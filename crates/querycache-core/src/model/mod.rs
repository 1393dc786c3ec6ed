//! Domain vocabulary: identifiers, document paths, queries, and target records.
//!
//! Nothing in this module touches storage; the byte-level layouts live in
//! `db::key` and the persisted payload formats in `db::codec`.

mod ids;
mod metadata;
mod path;
mod query;
mod target;
mod version;

pub use ids::*;
pub use metadata::*;
pub use path::*;
pub use query::*;
pub use target::*;
pub use version::*;
