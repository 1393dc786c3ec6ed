use serde::{Deserialize, Serialize};
use std::fmt;

///
/// SnapshotVersion
///
/// Server-consistency time: the read time of the snapshot a target or the
/// whole store was last known to be consistent with.
/// Unrelated to `SequenceNumber`, which only orders listen generations.
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct SnapshotVersion {
    seconds: i64,
    nanos: u32,
}

impl SnapshotVersion {
    /// The version before any snapshot was observed.
    pub const NONE: Self = Self {
        seconds: 0,
        nanos: 0,
    };

    pub const MAX_NANOS: u32 = 999_999_999;

    /// Build a version; nanoseconds above one second are clamped.
    #[must_use]
    pub const fn new(seconds: i64, nanos: u32) -> Self {
        let nanos = if nanos > Self::MAX_NANOS {
            Self::MAX_NANOS
        } else {
            nanos
        };

        Self { seconds, nanos }
    }

    #[must_use]
    pub const fn seconds(&self) -> i64 {
        self.seconds
    }

    #[must_use]
    pub const fn nanos(&self) -> u32 {
        self.nanos
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.seconds == 0 && self.nanos == 0
    }
}

impl fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SnapshotVersion(seconds={}, nanos={})",
            self.seconds, self.nanos
        )
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_order_by_seconds_then_nanos() {
        let a = SnapshotVersion::new(1, 999);
        let b = SnapshotVersion::new(2, 0);
        let c = SnapshotVersion::new(2, 1);

        assert!(SnapshotVersion::NONE < a);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn excess_nanos_are_clamped() {
        let v = SnapshotVersion::new(3, 2_000_000_000);
        assert_eq!(v.nanos(), SnapshotVersion::MAX_NANOS);
    }
}
