use crate::{
    db::{
        cache::{OrphanedDocuments, QueryCache, observe},
        codec::TargetCodec,
        key::{self, Table},
    },
    error::InternalError,
    kv::KvTransaction,
    model::{DocumentKey, SequenceNumber},
    obs::sink::{self, MetricsEvent},
};
use tracing::{debug, trace};

impl<C: TargetCodec> QueryCache<C> {
    /// Write (or refresh) the sentinel row for `document`.
    pub fn write_sentinel<T: KvTransaction>(
        &self,
        txn: &mut T,
        document: &DocumentKey,
        sequence_number: SequenceNumber,
    ) -> Result<(), InternalError> {
        txn.put(
            &key::sentinel_key(document),
            &key::encode_sentinel_value(sequence_number),
        )?;

        sink::record(MetricsEvent::SentinelDelta {
            writes: 1,
            removes: 0,
        });
        trace!(document = %document, sequence_number = %sequence_number, "sentinel written");

        Ok(())
    }

    pub fn remove_sentinel<T: KvTransaction>(
        &self,
        txn: &mut T,
        document: &DocumentKey,
    ) -> Result<(), InternalError> {
        txn.delete(&key::sentinel_key(document))?;

        sink::record(MetricsEvent::SentinelDelta {
            writes: 0,
            removes: 1,
        });
        trace!(document = %document, "sentinel removed");

        Ok(())
    }

    /// Sequence number stored in `document`'s sentinel row, if it has one.
    pub fn sentinel_sequence<T: KvTransaction>(
        &self,
        txn: &T,
        document: &DocumentKey,
    ) -> Result<Option<SequenceNumber>, InternalError> {
        txn.get(&key::sentinel_key(document))?
            .map(|value| {
                key::decode_sentinel_value(&value)
                    .map_err(|err| observe(Table::DocumentTarget, err.into()))
            })
            .transpose()
    }

    /// Lazily enumerate documents with a sentinel row and no membership.
    pub fn orphaned_documents<'a, T: KvTransaction>(
        &'a self,
        txn: &'a T,
    ) -> Result<OrphanedDocuments<'a, T>, InternalError> {
        OrphanedDocuments::open(txn)
    }

    /// Delete the sentinel of every orphaned document whose sequence number is
    /// at most `upper_bound`, returning those documents so the caller can drop
    /// whatever it stores for them.
    pub fn remove_orphaned_documents<T: KvTransaction>(
        &self,
        txn: &mut T,
        upper_bound: SequenceNumber,
    ) -> Result<Vec<DocumentKey>, InternalError> {
        let mut doomed = Vec::new();
        for orphan in self.orphaned_documents(txn)? {
            let (document, sequence_number) = orphan?;
            if sequence_number <= upper_bound {
                doomed.push(document);
            }
        }

        for document in &doomed {
            txn.delete(&key::sentinel_key(document))?;
        }

        sink::record(MetricsEvent::SentinelDelta {
            writes: 0,
            removes: doomed.len() as u64,
        });
        debug!(
            upper_bound = %upper_bound,
            removed = doomed.len(),
            "orphaned documents removed"
        );

        Ok(doomed)
    }
}
