use crate::model::{SequenceNumber, TargetData, TargetId};
use serde::{Deserialize, Serialize};

///
/// TargetGlobal
///
/// Singleton bookkeeping record for the target tables.
/// `last_remote_snapshot_version` holds the codec-encoded version bytes so the
/// version format stays owned by the target codec.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct TargetGlobal {
    pub highest_target_id: TargetId,
    pub highest_listen_sequence_number: SequenceNumber,
    pub target_count: u64,
    #[serde(with = "serde_bytes")]
    pub last_remote_snapshot_version: Vec<u8>,
}

impl TargetGlobal {
    /// Raise the high-water marks to cover `target`.
    /// Returns whether either mark moved.
    pub fn raise_marks<Q>(&mut self, target: &TargetData<Q>) -> bool {
        let mut updated = false;

        if target.target_id() > self.highest_target_id {
            self.highest_target_id = target.target_id();
            updated = true;
        }

        if target.sequence_number() > self.highest_listen_sequence_number {
            self.highest_listen_sequence_number = target.sequence_number();
            updated = true;
        }

        updated
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TargetPurpose;

    fn target(id: u32, seq: u64) -> TargetData<()> {
        TargetData::new(
            (),
            TargetId::new(id),
            SequenceNumber::new(seq),
            TargetPurpose::Listen,
        )
    }

    #[test]
    fn raise_marks_only_moves_forward() {
        let mut global = TargetGlobal::default();

        assert!(global.raise_marks(&target(4, 10)));
        assert!(!global.raise_marks(&target(2, 3)));
        assert!(global.raise_marks(&target(3, 11)));

        assert_eq!(global.highest_target_id, TargetId::new(4));
        assert_eq!(global.highest_listen_sequence_number, SequenceNumber::new(11));
    }

    #[test]
    fn equal_marks_do_not_count_as_updates() {
        let mut global = TargetGlobal::default();
        global.raise_marks(&target(5, 5));

        assert!(!global.raise_marks(&target(5, 5)));
    }
}
