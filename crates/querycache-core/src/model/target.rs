use crate::model::{SequenceNumber, SnapshotVersion, TargetId};
use serde::{Deserialize, Serialize};

///
/// TargetPurpose
///
/// Why the sync layer registered a target.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum TargetPurpose {
    /// A user-initiated listener.
    #[default]
    Listen,

    /// Re-listen after the server's existence filter disagreed with local state.
    ExistenceFilterMismatch,

    /// Single-document target used to resolve a document in limbo.
    LimboResolution,
}

///
/// ResumeToken
///
/// Opaque server bookmark; empty until the first snapshot arrives.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResumeToken(#[serde(with = "serde_bytes")] Vec<u8>);

impl ResumeToken {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for ResumeToken {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ResumeToken {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

///
/// TargetData
///
/// One registered query and its tracking state.
/// `target_id` and `query` are fixed at registration; updates only move the
/// sequence number and the resume state.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TargetData<Q> {
    target_id: TargetId,
    query: Q,
    sequence_number: SequenceNumber,
    purpose: TargetPurpose,
    snapshot_version: SnapshotVersion,
    resume_token: ResumeToken,
}

impl<Q> TargetData<Q> {
    #[must_use]
    pub fn new(
        query: Q,
        target_id: TargetId,
        sequence_number: SequenceNumber,
        purpose: TargetPurpose,
    ) -> Self {
        Self {
            target_id,
            query,
            sequence_number,
            purpose,
            snapshot_version: SnapshotVersion::NONE,
            resume_token: ResumeToken::default(),
        }
    }

    #[must_use]
    pub const fn target_id(&self) -> TargetId {
        self.target_id
    }

    #[must_use]
    pub const fn query(&self) -> &Q {
        &self.query
    }

    #[must_use]
    pub const fn sequence_number(&self) -> SequenceNumber {
        self.sequence_number
    }

    #[must_use]
    pub const fn purpose(&self) -> TargetPurpose {
        self.purpose
    }

    #[must_use]
    pub const fn snapshot_version(&self) -> SnapshotVersion {
        self.snapshot_version
    }

    #[must_use]
    pub const fn resume_token(&self) -> &ResumeToken {
        &self.resume_token
    }

    /// Copy with a new listen generation.
    #[must_use]
    pub fn with_sequence_number(mut self, sequence_number: SequenceNumber) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    /// Copy with a new resume token and the snapshot version it resumes from.
    #[must_use]
    pub fn with_resume_token(
        mut self,
        resume_token: ResumeToken,
        snapshot_version: SnapshotVersion,
    ) -> Self {
        self.resume_token = resume_token;
        self.snapshot_version = snapshot_version;
        self
    }
}
