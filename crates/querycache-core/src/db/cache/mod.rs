//! Module: db::cache
//! Responsibility: target registrations, membership indexes, and the metadata
//! singleton, kept mutually consistent inside one caller transaction.
//! Does not own: GC policy (which sequence bound to sweep, which targets are live).
//! Boundary: every mutation decodes and encodes everything it needs before its
//! first write, so a failure never leaves a partial update behind.

mod membership;
mod scan;
mod sentinel;


use crate::{
    config::QueryCacheConfig,
    db::{
        codec::{self, CborTargetCodec, TargetCodec},
        key::{self, Table},
    },
    error::InternalError,
    kv::KvTransaction,
    model::{SequenceNumber, SnapshotVersion, TargetData, TargetGlobal, TargetId, TargetQuery},
    obs::sink::{self, MetricsEvent, TargetOp},
};
use std::collections::HashSet;
use tracing::{debug, error};

pub use scan::{OrphanedDocuments, TargetIter};

///
/// QueryCache
///
/// Persistent index of registered targets and the documents matching them.
///
/// The in-memory copy of the metadata singleton is only replaced after every
/// write of an operation was issued, so it never runs ahead of the store.
///

#[derive(Debug)]
pub struct QueryCache<C = CborTargetCodec> {
    codec: C,
    config: QueryCacheConfig,
    metadata: TargetGlobal,
    last_remote_snapshot_version: SnapshotVersion,
}

impl<C: TargetCodec> QueryCache<C> {
    /// Load the metadata singleton and decode the last remote snapshot version.
    ///
    /// A missing metadata row is corruption: `ensure_target_global` must have
    /// run when the store was created.
    pub fn start<T: KvTransaction>(
        txn: &T,
        codec: C,
        config: QueryCacheConfig,
    ) -> Result<Self, InternalError> {
        let key = key::target_global_key();
        let Some(bytes) = txn.get(&key)? else {
            return Err(corruption(
                Table::TargetGlobal,
                "target metadata row is missing",
            ));
        };

        let metadata = codec::deserialize_metadata(&bytes, config.max_metadata_bytes)
            .map_err(|err| observe(Table::TargetGlobal, err))?;
        let last_remote_snapshot_version = codec
            .decode_version(&metadata.last_remote_snapshot_version)
            .map_err(|err| observe(Table::TargetGlobal, err))?;

        debug!(
            target_count = metadata.target_count,
            highest_target_id = %metadata.highest_target_id,
            highest_listen_sequence_number = %metadata.highest_listen_sequence_number,
            "query cache started"
        );

        Ok(Self {
            codec,
            config,
            metadata,
            last_remote_snapshot_version,
        })
    }

    #[must_use]
    pub const fn codec(&self) -> &C {
        &self.codec
    }

    #[must_use]
    pub const fn config(&self) -> &QueryCacheConfig {
        &self.config
    }

    #[must_use]
    pub const fn target_count(&self) -> u64 {
        self.metadata.target_count
    }

    #[must_use]
    pub const fn highest_target_id(&self) -> TargetId {
        self.metadata.highest_target_id
    }

    #[must_use]
    pub const fn highest_listen_sequence_number(&self) -> SequenceNumber {
        self.metadata.highest_listen_sequence_number
    }

    #[must_use]
    pub const fn last_remote_snapshot_version(&self) -> SnapshotVersion {
        self.last_remote_snapshot_version
    }

    /// Persist a new last remote snapshot version.
    ///
    /// The version is not required to move forward; ordering is the caller's
    /// responsibility.
    pub fn set_last_remote_snapshot_version<T: KvTransaction>(
        &mut self,
        txn: &mut T,
        version: SnapshotVersion,
    ) -> Result<(), InternalError> {
        let mut metadata = self.metadata.clone();
        metadata.last_remote_snapshot_version = self.codec.encode_version(version)?;
        let bytes = codec::serialize_metadata(&metadata)?;

        write_metadata(txn, &bytes)?;
        self.metadata = metadata;
        self.last_remote_snapshot_version = version;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Targets
    // ------------------------------------------------------------------

    /// Register a new target.
    pub fn add_target<T: KvTransaction>(
        &mut self,
        txn: &mut T,
        target: &TargetData<C::Query>,
    ) -> Result<(), InternalError> {
        let target_id = target.target_id();
        let row_key = key::target_key(target_id);
        if txn.get(&row_key)?.is_some() {
            return Err(InternalError::cache_invariant(format!(
                "target {target_id} is already registered"
            )));
        }

        let row = self.encode_target_row(target)?;
        let index_key = key::query_target_key(&target.query().canonical_id(), target_id);

        let mut metadata = self.metadata.clone();
        metadata.target_count = metadata
            .target_count
            .checked_add(1)
            .ok_or_else(|| InternalError::cache_invariant("target count overflow"))?;
        metadata.raise_marks(target);
        let metadata_bytes = codec::serialize_metadata(&metadata)?;

        txn.put(&row_key, &row)?;
        txn.put(&index_key, &[])?;
        write_metadata(txn, &metadata_bytes)?;
        self.metadata = metadata;

        sink::record(MetricsEvent::Target { op: TargetOp::Add });
        debug!(
            target_id = %target_id,
            sequence_number = %target.sequence_number(),
            target_count = self.metadata.target_count,
            "target added"
        );

        Ok(())
    }

    /// Overwrite a registered target's row.
    ///
    /// The query is fixed at registration; an update carrying a different
    /// query is rejected and the query index is never touched.
    /// Metadata is written only when a high-water mark moved.
    pub fn update_target<T: KvTransaction>(
        &mut self,
        txn: &mut T,
        target: &TargetData<C::Query>,
    ) -> Result<(), InternalError> {
        let target_id = target.target_id();
        let row_key = key::target_key(target_id);
        let Some(stored_row) = txn.get(&row_key)? else {
            return Err(InternalError::cache_invariant(format!(
                "update of unregistered target {target_id}"
            )));
        };
        let stored = self.decode_target_row(&stored_row, target_id)?;
        if stored.query() != target.query() {
            return Err(InternalError::cache_invariant(format!(
                "update of target {target_id} would change its query"
            )));
        }

        let row = self.encode_target_row(target)?;
        let mut metadata = self.metadata.clone();
        let marks_moved = metadata.raise_marks(target);
        let metadata_bytes = if marks_moved {
            Some(codec::serialize_metadata(&metadata)?)
        } else {
            None
        };

        txn.put(&row_key, &row)?;
        if let Some(bytes) = metadata_bytes {
            write_metadata(txn, &bytes)?;
            self.metadata = metadata;
        }

        sink::record(MetricsEvent::Target {
            op: TargetOp::Update,
        });
        debug!(
            target_id = %target_id,
            sequence_number = %target.sequence_number(),
            marks_moved,
            "target updated"
        );

        Ok(())
    }

    /// Remove a target together with all of its membership rows.
    /// The reference delegate is not notified.
    pub fn remove_target<T: KvTransaction>(
        &mut self,
        txn: &mut T,
        target: &TargetData<C::Query>,
    ) -> Result<(), InternalError> {
        let mut metadata = self.metadata.clone();
        let mut deletes = Vec::new();
        let memberships =
            self.plan_target_removal(txn, target.target_id(), &mut metadata, &mut deletes)?;
        let metadata_bytes = codec::serialize_metadata(&metadata)?;

        apply_deletes(txn, &deletes)?;
        write_metadata(txn, &metadata_bytes)?;
        self.metadata = metadata;

        sink::record(MetricsEvent::Target {
            op: TargetOp::Remove,
        });
        sink::record(MetricsEvent::MembershipDelta {
            inserts: 0,
            removes: memberships,
        });
        debug!(
            target_id = %target.target_id(),
            memberships,
            target_count = self.metadata.target_count,
            "target removed"
        );

        Ok(())
    }

    /// Find the registered target whose query equals `query`.
    ///
    /// Candidates sharing the canonical id are compared with full query
    /// equality. An index entry naming a missing target row is corruption.
    pub fn get_target<T: KvTransaction>(
        &self,
        txn: &T,
        query: &C::Query,
    ) -> Result<Option<TargetData<C::Query>>, InternalError> {
        let canonical_id = query.canonical_id();
        let mut scan = scan::PrefixScan::open(
            txn,
            Table::QueryTarget,
            key::query_target_prefix(&canonical_id),
        )?;

        while let Some((index_key, _)) = scan.next_row()? {
            let (_, target_id) = key::decode_query_target_key(&index_key)
                .map_err(|err| observe(Table::QueryTarget, err.into()))?;

            let row_key = key::target_key(target_id);
            let Some(row) = txn.get(&row_key)? else {
                return Err(corruption(
                    Table::QueryTarget,
                    format!(
                        "Dangling query-target reference: {} points at missing {}",
                        key::describe_key(&index_key),
                        key::describe_key(&row_key),
                    ),
                ));
            };

            let target = self.decode_target_row(&row, target_id)?;
            if target.query() == query {
                return Ok(Some(target));
            }
        }

        Ok(None)
    }

    /// Point lookup by id.
    pub fn get_target_by_id<T: KvTransaction>(
        &self,
        txn: &T,
        target_id: TargetId,
    ) -> Result<Option<TargetData<C::Query>>, InternalError> {
        txn.get(&key::target_key(target_id))?
            .map(|row| self.decode_target_row(&row, target_id))
            .transpose()
    }

    /// Lazily enumerate every target in target-id order.
    pub fn targets<'a, T: KvTransaction>(
        &'a self,
        txn: &'a T,
    ) -> Result<TargetIter<'a, T, C>, InternalError> {
        TargetIter::open(self, txn)
    }

    /// Remove every target with `sequence_number <= upper_bound` whose id is
    /// not live. Returns how many targets were removed.
    pub fn remove_targets<T: KvTransaction>(
        &mut self,
        txn: &mut T,
        upper_bound: SequenceNumber,
        live_target_ids: &HashSet<TargetId>,
    ) -> Result<usize, InternalError> {
        let mut doomed = Vec::new();
        for target in self.targets(txn)? {
            let target = target?;
            if target.sequence_number() <= upper_bound
                && !live_target_ids.contains(&target.target_id())
            {
                doomed.push(target);
            }
        }

        let mut metadata = self.metadata.clone();
        let mut deletes = Vec::new();
        let mut memberships = 0;
        for target in &doomed {
            memberships +=
                self.plan_target_removal(txn, target.target_id(), &mut metadata, &mut deletes)?;
        }

        if !doomed.is_empty() {
            let metadata_bytes = codec::serialize_metadata(&metadata)?;
            apply_deletes(txn, &deletes)?;
            write_metadata(txn, &metadata_bytes)?;
            self.metadata = metadata;
        }

        let removed = doomed.len();
        sink::record(MetricsEvent::TargetsSwept {
            removed: removed as u64,
        });
        sink::record(MetricsEvent::MembershipDelta {
            inserts: 0,
            removes: memberships,
        });
        debug!(
            upper_bound = %upper_bound,
            live = live_target_ids.len(),
            removed,
            "target sweep finished"
        );

        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Row codecs
    // ------------------------------------------------------------------

    fn encode_target_row(&self, target: &TargetData<C::Query>) -> Result<Vec<u8>, InternalError> {
        let row = self.codec.encode_target(target)?;
        if row.len() > self.config.max_target_bytes {
            return Err(InternalError::cache_unsupported(format!(
                "target {} encodes to {} bytes (limit {})",
                target.target_id(),
                row.len(),
                self.config.max_target_bytes
            )));
        }

        Ok(row)
    }

    fn decode_target_row(
        &self,
        row: &[u8],
        target_id: TargetId,
    ) -> Result<TargetData<C::Query>, InternalError> {
        if row.len() > self.config.max_target_bytes {
            return Err(corruption(
                Table::Target,
                format!(
                    "target {target_id} row is {} bytes (limit {})",
                    row.len(),
                    self.config.max_target_bytes
                ),
            ));
        }

        let target = self
            .codec
            .decode_target(row)
            .map_err(|err| observe(Table::Target, err))?;
        if target.target_id() != target_id {
            return Err(corruption(
                Table::Target,
                format!(
                    "target row keyed {target_id} holds target {}",
                    target.target_id()
                ),
            ));
        }

        Ok(target)
    }

    // Collect the deletes for one target and account for it in `metadata`.
    // The query-target key comes from the stored row, not the caller's copy.
    // Returns the number of memberships the target held.
    fn plan_target_removal<T: KvTransaction>(
        &self,
        txn: &T,
        target_id: TargetId,
        metadata: &mut TargetGlobal,
        deletes: &mut Vec<Vec<u8>>,
    ) -> Result<u64, InternalError> {
        let row_key = key::target_key(target_id);
        let Some(row) = txn.get(&row_key)? else {
            return Err(InternalError::cache_invariant(format!(
                "remove of unregistered target {target_id}"
            )));
        };
        let stored = self.decode_target_row(&row, target_id)?;

        metadata.target_count = metadata
            .target_count
            .checked_sub(1)
            .ok_or_else(|| InternalError::cache_invariant("target count underflow"))?;

        let documents = scan::documents_for_target(txn, target_id)?;
        for document in &documents {
            deletes.push(key::target_document_key(target_id, document));
            deletes.push(key::document_target_key(document, target_id));
        }
        deletes.push(key::query_target_key(
            &stored.query().canonical_id(),
            target_id,
        ));
        deletes.push(row_key);

        Ok(documents.len() as u64)
    }
}

fn apply_deletes<T: KvTransaction>(txn: &mut T, deletes: &[Vec<u8>]) -> Result<(), InternalError> {
    for key in deletes {
        txn.delete(key)?;
    }

    Ok(())
}

fn write_metadata<T: KvTransaction>(txn: &mut T, bytes: &[u8]) -> Result<(), InternalError> {
    txn.put(&key::target_global_key(), bytes)?;
    sink::record(MetricsEvent::MetadataWrite);

    Ok(())
}

// Build a cache corruption error and report it.
fn corruption(table: Table, message: impl Into<String>) -> InternalError {
    observe(table, InternalError::cache_corruption(message))
}

// Report corruption surfacing from a table; other errors pass through.
fn observe(table: Table, err: InternalError) -> InternalError {
    if err.is_corruption() {
        sink::record(MetricsEvent::Corruption {
            table: table.label(),
        });
        error!(table = %table, error = %err.display_with_class(), "query cache corruption");
    }

    err
}
