use crate::{
    db::key::Table,
    model::{DocumentKey, ResourcePath, SequenceNumber, TargetId},
};

// Path segment and document-target marker bytes.
pub(super) const SEGMENT_MARKER: u8 = 0x01;
pub(super) const PATH_END: u8 = 0x00;
pub(super) const SENTINEL_MARKER: u8 = 0x00;
pub(super) const TARGET_MARKER: u8 = 0x01;

// Terminated text: 0x00 is escaped as 0x00 0xFF, the payload ends with 0x00 0x00.
pub(super) const ESCAPE: u8 = 0xFF;

fn with_table(table: Table, capacity: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + capacity);
    out.push(table.tag());
    out
}

// Byte strings are escaped so component boundaries remain unambiguous and
// no encoded string is a prefix of a different one.
fn push_terminated_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        if byte == 0 {
            out.extend_from_slice(&[0, ESCAPE]);
        } else {
            out.push(byte);
        }
    }

    out.extend_from_slice(&[0, 0]);
}

fn push_path(out: &mut Vec<u8>, path: &ResourcePath) {
    for segment in path.segments() {
        out.push(SEGMENT_MARKER);
        push_terminated_bytes(out, segment.as_bytes());
    }

    out.push(PATH_END);
}

/// Prefix covering a whole table.
pub(crate) fn table_prefix(table: Table) -> Vec<u8> {
    vec![table.tag()]
}

pub(crate) fn target_global_key() -> Vec<u8> {
    table_prefix(Table::TargetGlobal)
}

pub(crate) fn target_key(target_id: TargetId) -> Vec<u8> {
    target_key_in(Table::Target, target_id)
}

/// Prefix of every query-target row sharing `canonical_id`.
pub(crate) fn query_target_prefix(canonical_id: &str) -> Vec<u8> {
    let mut out = with_table(Table::QueryTarget, canonical_id.len() + 2);
    push_terminated_bytes(&mut out, canonical_id.as_bytes());
    out
}

pub(crate) fn query_target_key(canonical_id: &str, target_id: TargetId) -> Vec<u8> {
    let mut out = query_target_prefix(canonical_id);
    out.extend_from_slice(&target_id.to_be_bytes());
    out
}

/// Prefix of every target-document row for `target_id`.
pub(crate) fn target_document_prefix(target_id: TargetId) -> Vec<u8> {
    target_key_in(Table::TargetDocument, target_id)
}

pub(crate) fn target_document_key(target_id: TargetId, document: &DocumentKey) -> Vec<u8> {
    let mut out = target_document_prefix(target_id);
    push_path(&mut out, document.path());
    out
}

/// Prefix of every document-target row for `document`, sentinel included.
pub(crate) fn document_target_prefix(document: &DocumentKey) -> Vec<u8> {
    let mut out = with_table(Table::DocumentTarget, 0);
    push_path(&mut out, document.path());
    out
}

pub(crate) fn document_target_key(document: &DocumentKey, target_id: TargetId) -> Vec<u8> {
    let mut out = document_target_prefix(document);
    out.push(TARGET_MARKER);
    out.extend_from_slice(&target_id.to_be_bytes());
    out
}

/// Sentinel row for `document`; sorts before every real row of the document.
pub(crate) fn sentinel_key(document: &DocumentKey) -> Vec<u8> {
    let mut out = document_target_prefix(document);
    out.push(SENTINEL_MARKER);
    out
}

pub(crate) const fn encode_sentinel_value(
    sequence_number: SequenceNumber,
) -> [u8; SequenceNumber::STORED_SIZE] {
    sequence_number.to_be_bytes()
}

fn target_key_in(table: Table, target_id: TargetId) -> Vec<u8> {
    let mut out = with_table(table, TargetId::STORED_SIZE);
    out.extend_from_slice(&target_id.to_be_bytes());
    out
}
