use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

///
/// TargetId
///
/// Caller-assigned identifier of a registered target.
/// Encoded big-endian in keys so byte order matches numeric order.
///

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(transparent)]
pub struct TargetId(u32);

impl TargetId {
    pub const STORED_SIZE: usize = 4;

    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn to_be_bytes(self) -> [u8; Self::STORED_SIZE] {
        self.0.to_be_bytes()
    }

    #[must_use]
    pub const fn from_be_bytes(bytes: [u8; Self::STORED_SIZE]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }
}

///
/// SequenceNumber
///
/// Listen generation stamp. Monotonic across the lifetime of a store and
/// used only to decide GC eligibility.
///

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(transparent)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    pub const STORED_SIZE: usize = 8;

    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn to_be_bytes(self) -> [u8; Self::STORED_SIZE] {
        self.0.to_be_bytes()
    }

    #[must_use]
    pub const fn from_be_bytes(bytes: [u8; Self::STORED_SIZE]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }
}
