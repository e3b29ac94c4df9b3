//! Log positions and replica identities
//!
//! A `LogPosition` identifies a point in the replicated WAL stream. Positions
//! are totally ordered by numeric value and only ever move forward; no
//! wraparound handling exists.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A point in the replicated write-ahead stream.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LogPosition(u64);

impl LogPosition {
    /// The start of the stream. Nothing is ever confirmed below it.
    pub const ZERO: LogPosition = LogPosition(0);

    /// Creates a position from its raw offset.
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw offset.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for LogPosition {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for LogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a replica as reported in its acknowledgments.
///
/// Id 0 is reserved to mark an empty tracker slot and is never a valid
/// replica.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ReplicaId(u32);

impl ReplicaId {
    /// The reserved "no replica" id.
    pub const EMPTY: ReplicaId = ReplicaId(0);

    #[inline]
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Whether this is the reserved empty id.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for ReplicaId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
