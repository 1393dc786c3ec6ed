use crate::{
    db::{
        cache::{QueryCache, observe},
        codec::TargetCodec,
        key::{self, DocumentMarker, Table},
    },
    error::InternalError,
    kv::{KvCursor, KvTransaction},
    model::{DocumentKey, DocumentKeySet, SequenceNumber, TargetData, TargetId},
    obs::sink::{self, MetricsEvent},
};

///
/// PrefixScan
///
/// Forward scan over every row whose key starts with `prefix`.
/// Rows are copied out so callers may keep them after the cursor moves.
/// The number of rows visited is reported when the scan is dropped.
///

pub(super) struct PrefixScan<'t, T: KvTransaction + 't> {
    cursor: T::Cursor<'t>,
    prefix: Vec<u8>,
    table: Table,
    rows: u64,
    exhausted: bool,
}

impl<'t, T: KvTransaction + 't> PrefixScan<'t, T> {
    pub(super) fn open(txn: &'t T, table: Table, prefix: Vec<u8>) -> Result<Self, InternalError> {
        let mut cursor = txn.cursor()?;
        cursor.seek(&prefix)?;

        Ok(Self {
            cursor,
            prefix,
            table,
            rows: 0,
            exhausted: false,
        })
    }

    /// Next `(key, value)` inside the prefix, or `None` once the scan left it.
    pub(super) fn next_row(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>, InternalError> {
        if self.exhausted {
            return Ok(None);
        }

        if !self.cursor.valid() || !self.cursor.key().starts_with(&self.prefix) {
            self.exhausted = true;
            return Ok(None);
        }

        let row = (self.cursor.key().to_vec(), self.cursor.value().to_vec());
        self.rows += 1;

        if let Err(err) = self.cursor.next() {
            self.exhausted = true;
            return Err(err);
        }

        Ok(Some(row))
    }

    /// End the scan early; later calls yield nothing.
    pub(super) const fn stop(&mut self) {
        self.exhausted = true;
    }
}

impl<'t, T: KvTransaction + 't> Drop for PrefixScan<'t, T> {
    fn drop(&mut self) {
        sink::record(MetricsEvent::RowsScanned {
            table: self.table.label(),
            rows_scanned: self.rows,
        });
    }
}

/// Documents currently matching `target_id`.
pub(super) fn documents_for_target<T: KvTransaction>(
    txn: &T,
    target_id: TargetId,
) -> Result<DocumentKeySet, InternalError> {
    let mut scan = PrefixScan::open(
        txn,
        Table::TargetDocument,
        key::target_document_prefix(target_id),
    )?;

    let mut documents = DocumentKeySet::new();
    while let Some((row_key, _)) = scan.next_row()? {
        let (_, document) = key::decode_target_document_key(&row_key)
            .map_err(|err| observe(Table::TargetDocument, err.into()))?;
        documents.insert(document);
    }

    Ok(documents)
}

/// Whether `document` has at least one real membership row.
pub(super) fn has_membership<T: KvTransaction>(
    txn: &T,
    document: &DocumentKey,
) -> Result<bool, InternalError> {
    let mut scan = PrefixScan::open(
        txn,
        Table::DocumentTarget,
        key::document_target_prefix(document),
    )?;

    while let Some((row_key, _)) = scan.next_row()? {
        let (_, marker) = key::decode_document_target_key(&row_key)
            .map_err(|err| observe(Table::DocumentTarget, err.into()))?;
        if let DocumentMarker::Target(_) = marker {
            return Ok(true);
        }
    }

    Ok(false)
}

///
/// TargetIter
///
/// Lazy enumeration of target rows in target-id order.
/// The first error ends the iteration.
///

pub struct TargetIter<'a, T: KvTransaction + 'a, C: TargetCodec> {
    cache: &'a QueryCache<C>,
    scan: PrefixScan<'a, T>,
}

impl<'a, T: KvTransaction + 'a, C: TargetCodec> TargetIter<'a, T, C> {
    pub(super) fn open(cache: &'a QueryCache<C>, txn: &'a T) -> Result<Self, InternalError> {
        let scan = PrefixScan::open(txn, Table::Target, key::table_prefix(Table::Target))?;

        Ok(Self { cache, scan })
    }

    fn decode_row(&self, row_key: &[u8], row: &[u8]) -> Result<TargetData<C::Query>, InternalError> {
        let target_id =
            key::decode_target_key(row_key).map_err(|err| observe(Table::Target, err.into()))?;

        self.cache.decode_target_row(row, target_id)
    }
}

impl<'a, T: KvTransaction + 'a, C: TargetCodec> Iterator for TargetIter<'a, T, C> {
    type Item = Result<TargetData<C::Query>, InternalError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.scan.next_row().transpose()?;
        let item = row.and_then(|(row_key, row)| self.decode_row(&row_key, &row));
        if item.is_err() {
            self.scan.stop();
        }

        Some(item)
    }
}

///
/// OrphanedDocuments
///
/// Single forward pass over the document-target table yielding every
/// document that has a sentinel row and no real membership row, together
/// with the sentinel's sequence number.
///
/// A document's sentinel sorts before its real rows and all rows of one
/// document are contiguous, so one pending candidate is enough: it is
/// reported when the next sentinel (or the end of the table) is reached,
/// unless a real row for the same document was seen first.
///

pub struct OrphanedDocuments<'a, T: KvTransaction + 'a> {
    scan: PrefixScan<'a, T>,
    pending: Option<(DocumentKey, SequenceNumber)>,
    reported: u64,
}

impl<'a, T: KvTransaction + 'a> OrphanedDocuments<'a, T> {
    pub(super) fn open(txn: &'a T) -> Result<Self, InternalError> {
        let scan = PrefixScan::open(
            txn,
            Table::DocumentTarget,
            key::table_prefix(Table::DocumentTarget),
        )?;

        Ok(Self {
            scan,
            pending: None,
            reported: 0,
        })
    }

    // Feed one row; returns a candidate that is now known to be orphaned.
    fn advance(
        &mut self,
        row_key: &[u8],
        value: &[u8],
    ) -> Result<Option<(DocumentKey, SequenceNumber)>, InternalError> {
        let (document, marker) = key::decode_document_target_key(row_key)
            .map_err(|err| observe(Table::DocumentTarget, err.into()))?;

        match marker {
            DocumentMarker::Sentinel => {
                let sequence_number = key::decode_sentinel_value(value)
                    .map_err(|err| observe(Table::DocumentTarget, err.into()))?;

                Ok(self.pending.replace((document, sequence_number)))
            }
            DocumentMarker::Target(_) => {
                if self
                    .pending
                    .as_ref()
                    .is_some_and(|(pending, _)| *pending == document)
                {
                    self.pending = None;
                }

                Ok(None)
            }
        }
    }

    fn report(&mut self, orphan: (DocumentKey, SequenceNumber)) -> (DocumentKey, SequenceNumber) {
        self.reported += 1;
        orphan
    }
}

impl<'a, T: KvTransaction + 'a> Iterator for OrphanedDocuments<'a, T> {
    type Item = Result<(DocumentKey, SequenceNumber), InternalError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let step = match self.scan.next_row() {
                Ok(Some((row_key, value))) => self.advance(&row_key, &value),
                Ok(None) => {
                    return self.pending.take().map(|orphan| Ok(self.report(orphan)));
                }
                Err(err) => Err(err),
            };

            match step {
                Ok(Some(orphan)) => return Some(Ok(self.report(orphan))),
                Ok(None) => {}
                Err(err) => {
                    self.scan.stop();
                    self.pending = None;
                    return Some(Err(err));
                }
            }
        }
    }
}

impl<'a, T: KvTransaction + 'a> Drop for OrphanedDocuments<'a, T> {
    fn drop(&mut self) {
        if self.reported > 0 {
            sink::record(MetricsEvent::OrphansReported {
                count: self.reported,
            });
        }
    }
}
