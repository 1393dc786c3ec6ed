use crate::{
    db::{
        cache::{QueryCache, apply_deletes, scan},
        codec::TargetCodec,
        delegate::ReferenceDelegate,
        key,
    },
    error::InternalError,
    kv::KvTransaction,
    model::{DocumentKey, DocumentKeySet, TargetId},
    obs::sink::{self, MetricsEvent},
};
use tracing::{debug, trace};

impl<C: TargetCodec> QueryCache<C> {
    /// Record that every key in `keys` matches `target_id`, writing both
    /// membership rows per key and telling the delegate about each edge.
    pub fn add_matching_keys<'k, T, D>(
        &self,
        txn: &mut T,
        delegate: &mut D,
        keys: impl IntoIterator<Item = &'k DocumentKey>,
        target_id: TargetId,
    ) -> Result<(), InternalError>
    where
        T: KvTransaction,
        D: ReferenceDelegate + ?Sized,
    {
        let mut inserts = 0;
        for document in keys {
            txn.put(&key::target_document_key(target_id, document), &[])?;
            txn.put(&key::document_target_key(document, target_id), &[])?;
            delegate.add_reference(document);
            inserts += 1;
        }

        sink::record(MetricsEvent::MembershipDelta {
            inserts,
            removes: 0,
        });
        trace!(target_id = %target_id, inserts, "membership added");

        Ok(())
    }

    /// Drop the membership of every key in `keys` for `target_id`.
    ///
    /// No sentinel is written here; the delegate decides whether a document
    /// that lost a reference needs one.
    pub fn remove_matching_keys<'k, T, D>(
        &self,
        txn: &mut T,
        delegate: &mut D,
        keys: impl IntoIterator<Item = &'k DocumentKey>,
        target_id: TargetId,
    ) -> Result<(), InternalError>
    where
        T: KvTransaction,
        D: ReferenceDelegate + ?Sized,
    {
        let mut removes = 0;
        for document in keys {
            txn.delete(&key::target_document_key(target_id, document))?;
            txn.delete(&key::document_target_key(document, target_id))?;
            delegate.remove_reference(document);
            removes += 1;
        }

        sink::record(MetricsEvent::MembershipDelta {
            inserts: 0,
            removes,
        });
        trace!(target_id = %target_id, removes, "membership removed");

        Ok(())
    }

    /// Drop every membership of `target_id` without notifying anyone.
    /// Returns the number of documents that lost the membership.
    pub fn remove_all_keys_for_target<T: KvTransaction>(
        &self,
        txn: &mut T,
        target_id: TargetId,
    ) -> Result<usize, InternalError> {
        let documents = scan::documents_for_target(txn, target_id)?;

        let mut deletes = Vec::with_capacity(documents.len() * 2);
        for document in &documents {
            deletes.push(key::target_document_key(target_id, document));
            deletes.push(key::document_target_key(document, target_id));
        }
        apply_deletes(txn, &deletes)?;

        sink::record(MetricsEvent::MembershipDelta {
            inserts: 0,
            removes: documents.len() as u64,
        });
        debug!(
            target_id = %target_id,
            removed = documents.len(),
            "all memberships removed"
        );

        Ok(documents.len())
    }

    /// Documents currently matching `target_id`.
    pub fn get_matching_keys<T: KvTransaction>(
        &self,
        txn: &T,
        target_id: TargetId,
    ) -> Result<DocumentKeySet, InternalError> {
        scan::documents_for_target(txn, target_id)
    }

    /// Whether `document` matches at least one target. Sentinel rows do not
    /// count as membership.
    pub fn contains<T: KvTransaction>(
        &self,
        txn: &T,
        document: &DocumentKey,
    ) -> Result<bool, InternalError> {
        scan::has_membership(txn, document)
    }
}
