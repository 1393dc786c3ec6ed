use crate::{
    db::key::{
        Table,
        encode::{ESCAPE, PATH_END, SEGMENT_MARKER, SENTINEL_MARKER, TARGET_MARKER},
    },
    error::InternalError,
    model::{DocumentKey, PathError, ResourcePath, SequenceNumber, TargetId},
};
use std::fmt::{self, Write as _};
use thiserror::Error as ThisError;

///
/// KeyDecodeError
///
/// Malformed bytes inside a table this crate owns. Always corruption.
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub(crate) enum KeyDecodeError {
    #[error("empty key")]
    Empty,

    #[error("unknown table tag 0x{tag:02x}")]
    UnknownTable { tag: u8 },

    #[error("expected a {expected} key, found table tag 0x{found:02x}")]
    WrongTable { expected: Table, found: u8 },

    #[error("truncated {component}")]
    Truncated { component: &'static str },

    #[error("invalid escape byte 0x{byte:02x} in text component")]
    InvalidEscape { byte: u8 },

    #[error("text component is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid path marker 0x{byte:02x}")]
    InvalidPathMarker { byte: u8 },

    #[error("invalid document key: {0}")]
    InvalidDocument(#[from] PathError),

    #[error("invalid document-target marker 0x{byte:02x}")]
    InvalidMarker { byte: u8 },

    #[error("{len} trailing bytes")]
    TrailingBytes { len: usize },

    #[error("sentinel value must be {expected} bytes, found {len}")]
    InvalidSentinelValue { expected: usize, len: usize },
}

impl From<KeyDecodeError> for InternalError {
    fn from(err: KeyDecodeError) -> Self {
        Self::index_corruption(format!("key decode failed: {err}"))
    }
}

///
/// DocumentMarker
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum DocumentMarker {
    Sentinel,
    Target(TargetId),
}

///
/// DecodedKey
///
/// Structured view of any key in the owned tables.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum DecodedKey {
    TargetGlobal,
    Target {
        target_id: TargetId,
    },
    QueryTarget {
        canonical_id: String,
        target_id: TargetId,
    },
    TargetDocument {
        target_id: TargetId,
        document: DocumentKey,
    },
    DocumentTarget {
        document: DocumentKey,
        marker: DocumentMarker,
    },
}

impl fmt::Display for DecodedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetGlobal => f.write_str("target_global"),
            Self::Target { target_id } => write!(f, "target(target_id={target_id})"),
            Self::QueryTarget {
                canonical_id,
                target_id,
            } => write!(
                f,
                "query_target(canonical_id={canonical_id:?}, target_id={target_id})"
            ),
            Self::TargetDocument {
                target_id,
                document,
            } => write!(
                f,
                "target_document(target_id={target_id}, document={document})"
            ),
            Self::DocumentTarget {
                document,
                marker: DocumentMarker::Sentinel,
            } => write!(f, "document_target(document={document}, sentinel)"),
            Self::DocumentTarget {
                document,
                marker: DocumentMarker::Target(target_id),
            } => write!(
                f,
                "document_target(document={document}, target_id={target_id})"
            ),
        }
    }
}

///
/// KeyReader
///
/// Forward reader over one encoded key.
///

struct KeyReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> KeyReader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn read_u8(&mut self, component: &'static str) -> Result<u8, KeyDecodeError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(KeyDecodeError::Truncated { component })?;
        self.pos += 1;

        Ok(byte)
    }

    fn read_array<const N: usize>(
        &mut self,
        component: &'static str,
    ) -> Result<[u8; N], KeyDecodeError> {
        let end = self.pos + N;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(KeyDecodeError::Truncated { component })?;
        self.pos = end;

        let mut out = [0u8; N];
        out.copy_from_slice(slice);

        Ok(out)
    }

    fn read_table(&mut self) -> Result<Table, KeyDecodeError> {
        let tag = self.read_u8("table tag").map_err(|_| KeyDecodeError::Empty)?;

        Table::from_tag(tag).ok_or(KeyDecodeError::UnknownTable { tag })
    }

    fn read_target_id(&mut self) -> Result<TargetId, KeyDecodeError> {
        self.read_array("target id").map(TargetId::from_be_bytes)
    }

    fn read_text(&mut self, component: &'static str) -> Result<String, KeyDecodeError> {
        let mut out = Vec::new();
        loop {
            match self.read_u8(component)? {
                0 => match self.read_u8(component)? {
                    0 => break,
                    ESCAPE => out.push(0),
                    byte => return Err(KeyDecodeError::InvalidEscape { byte }),
                },
                byte => out.push(byte),
            }
        }

        String::from_utf8(out).map_err(|_| KeyDecodeError::InvalidUtf8)
    }

    fn read_path(&mut self) -> Result<ResourcePath, KeyDecodeError> {
        let mut segments = Vec::new();
        loop {
            match self.read_u8("path")? {
                PATH_END => break,
                SEGMENT_MARKER => segments.push(self.read_text("path segment")?),
                byte => return Err(KeyDecodeError::InvalidPathMarker { byte }),
            }
        }

        Ok(ResourcePath::from_segments(segments)?)
    }

    fn read_document(&mut self) -> Result<DocumentKey, KeyDecodeError> {
        Ok(DocumentKey::from_path(self.read_path()?)?)
    }

    fn read_marker(&mut self) -> Result<DocumentMarker, KeyDecodeError> {
        match self.read_u8("document-target marker")? {
            SENTINEL_MARKER => Ok(DocumentMarker::Sentinel),
            TARGET_MARKER => Ok(DocumentMarker::Target(self.read_target_id()?)),
            byte => Err(KeyDecodeError::InvalidMarker { byte }),
        }
    }

    fn finish<T>(self, value: T) -> Result<T, KeyDecodeError> {
        let len = self.bytes.len() - self.pos;
        if len > 0 {
            return Err(KeyDecodeError::TrailingBytes { len });
        }

        Ok(value)
    }
}

/// Decode any key in the owned tables.
pub(crate) fn decode_key(bytes: &[u8]) -> Result<DecodedKey, KeyDecodeError> {
    let mut reader = KeyReader::new(bytes);

    let key = match reader.read_table()? {
        Table::TargetGlobal => DecodedKey::TargetGlobal,
        Table::Target => DecodedKey::Target {
            target_id: reader.read_target_id()?,
        },
        Table::QueryTarget => DecodedKey::QueryTarget {
            canonical_id: reader.read_text("canonical id")?,
            target_id: reader.read_target_id()?,
        },
        Table::TargetDocument => DecodedKey::TargetDocument {
            target_id: reader.read_target_id()?,
            document: reader.read_document()?,
        },
        Table::DocumentTarget => DecodedKey::DocumentTarget {
            document: reader.read_document()?,
            marker: reader.read_marker()?,
        },
    };

    reader.finish(key)
}

fn wrong_table(expected: Table, bytes: &[u8]) -> KeyDecodeError {
    match bytes.first() {
        Some(&found) => KeyDecodeError::WrongTable { expected, found },
        None => KeyDecodeError::Empty,
    }
}

pub(crate) fn decode_target_key(bytes: &[u8]) -> Result<TargetId, KeyDecodeError> {
    match decode_key(bytes)? {
        DecodedKey::Target { target_id } => Ok(target_id),
        _ => Err(wrong_table(Table::Target, bytes)),
    }
}

pub(crate) fn decode_query_target_key(bytes: &[u8]) -> Result<(String, TargetId), KeyDecodeError> {
    match decode_key(bytes)? {
        DecodedKey::QueryTarget {
            canonical_id,
            target_id,
        } => Ok((canonical_id, target_id)),
        _ => Err(wrong_table(Table::QueryTarget, bytes)),
    }
}

pub(crate) fn decode_target_document_key(
    bytes: &[u8],
) -> Result<(TargetId, DocumentKey), KeyDecodeError> {
    match decode_key(bytes)? {
        DecodedKey::TargetDocument {
            target_id,
            document,
        } => Ok((target_id, document)),
        _ => Err(wrong_table(Table::TargetDocument, bytes)),
    }
}

pub(crate) fn decode_document_target_key(
    bytes: &[u8],
) -> Result<(DocumentKey, DocumentMarker), KeyDecodeError> {
    match decode_key(bytes)? {
        DecodedKey::DocumentTarget { document, marker } => Ok((document, marker)),
        _ => Err(wrong_table(Table::DocumentTarget, bytes)),
    }
}

pub(crate) fn decode_sentinel_value(bytes: &[u8]) -> Result<SequenceNumber, KeyDecodeError> {
    let raw = <[u8; SequenceNumber::STORED_SIZE]>::try_from(bytes).map_err(|_| {
        KeyDecodeError::InvalidSentinelValue {
            expected: SequenceNumber::STORED_SIZE,
            len: bytes.len(),
        }
    })?;

    Ok(SequenceNumber::from_be_bytes(raw))
}

/// Render a key from the owned tables for diagnostics.
///
/// Undecodable input is rendered as hex together with the decode failure, so
/// the function never fails.
#[must_use]
pub fn describe_key(bytes: &[u8]) -> String {
    match decode_key(bytes) {
        Ok(key) => key.to_string(),
        Err(err) => {
            let mut out = String::with_capacity(bytes.len() * 2 + 32);
            out.push_str("<undecodable key 0x");
            for byte in bytes {
                let _ = write!(out, "{byte:02x}");
            }
            let _ = write!(out, ": {err}>");
            out
        }
    }
}
