use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};
use thiserror::Error as ThisError;

///
/// PathError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum PathError {
    #[error("path segment {index} is empty")]
    EmptySegment { index: usize },

    #[error("document keys need an even, non-zero number of segments; got {len}")]
    NotADocument { len: usize },
}

///
/// ResourcePath
///
/// Slash-separated path of non-empty segments. The empty path is the root.
/// Derived ordering is segment-wise, matching the encoded key order.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    /// Build a path from explicit segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if let Some(index) = segments.iter().position(String::is_empty) {
            return Err(PathError::EmptySegment { index });
        }

        Ok(Self { segments })
    }

    /// Parse a `/`-separated path. An empty string is the root path.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        if path.is_empty() {
            return Ok(Self::default());
        }

        Self::from_segments(path.split('/'))
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append one segment.
    pub fn child(&self, segment: impl Into<String>) -> Result<Self, PathError> {
        let segment = segment.into();
        if segment.is_empty() {
            return Err(PathError::EmptySegment {
                index: self.segments.len(),
            });
        }

        let mut segments = self.segments.clone();
        segments.push(segment);

        Ok(Self { segments })
    }

    #[must_use]
    pub fn canonical_string(&self) -> String {
        self.segments.join("/")
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_string())
    }
}

///
/// DocumentKey
///
/// Path of a single document: `collection/doc[/collection/doc]*`.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "ResourcePath", into = "ResourcePath")]
pub struct DocumentKey(ResourcePath);

impl DocumentKey {
    pub fn from_path(path: ResourcePath) -> Result<Self, PathError> {
        let len = path.len();
        if len == 0 || len % 2 != 0 {
            return Err(PathError::NotADocument { len });
        }

        Ok(Self(path))
    }

    pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_path(ResourcePath::from_segments(segments)?)
    }

    pub fn parse(path: &str) -> Result<Self, PathError> {
        Self::from_path(ResourcePath::parse(path)?)
    }

    #[must_use]
    pub const fn path(&self) -> &ResourcePath {
        &self.0
    }

    /// Identifier of the document within its collection.
    #[must_use]
    pub fn document_id(&self) -> &str {
        // from_path guarantees at least two segments
        self.0.segments().last().map_or("", String::as_str)
    }
}

impl TryFrom<ResourcePath> for DocumentKey {
    type Error = PathError;

    fn try_from(path: ResourcePath) -> Result<Self, Self::Error> {
        Self::from_path(path)
    }
}

impl From<DocumentKey> for ResourcePath {
    fn from(key: DocumentKey) -> Self {
        key.0
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Ordered set of document keys.
pub type DocumentKeySet = BTreeSet<DocumentKey>;

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_empty_segments() {
        assert_eq!(
            ResourcePath::parse("rooms//messages"),
            Err(PathError::EmptySegment { index: 1 })
        );
        assert_eq!(
            ResourcePath::parse("rooms/"),
            Err(PathError::EmptySegment { index: 1 })
        );
    }

    #[test]
    fn empty_string_is_root_path() {
        let root = ResourcePath::parse("").unwrap();
        assert!(root.is_empty());
        assert_eq!(root.canonical_string(), "");
    }

    #[test]
    fn child_appends_a_segment() {
        let rooms = ResourcePath::parse("rooms").unwrap();
        let eros = rooms.child("eros").unwrap();

        assert_eq!(eros.canonical_string(), "rooms/eros");
        assert!(DocumentKey::from_path(eros).is_ok());
        assert_eq!(rooms.child(""), Err(PathError::EmptySegment { index: 1 }));
    }

    #[test]
    fn document_key_requires_even_segment_count() {
        assert!(DocumentKey::parse("rooms/eros").is_ok());
        assert!(DocumentKey::parse("rooms/eros/messages/1").is_ok());
        assert_eq!(
            DocumentKey::parse("rooms"),
            Err(PathError::NotADocument { len: 1 })
        );
        assert_eq!(
            DocumentKey::parse(""),
            Err(PathError::NotADocument { len: 0 })
        );
    }

    #[test]
    fn document_key_exposes_document_id() {
        let key = DocumentKey::parse("rooms/eros/messages/42").unwrap();
        assert_eq!(key.document_id(), "42");
        assert_eq!(key.to_string(), "rooms/eros/messages/42");
    }

    #[test]
    fn parent_path_sorts_before_its_children() {
        let parent = DocumentKey::parse("rooms/eros").unwrap();
        let child = DocumentKey::parse("rooms/eros/messages/1").unwrap();
        let sibling = DocumentKey::parse("rooms/erosa").unwrap();

        assert!(parent < child);
        assert!(child < sibling);
    }
}
