use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Monotonic revision counter of a partition.
///
/// A Thing's `revisionNumber` is the partition revision of the last write
/// that touched it. Revision 0 denotes "before any write".
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RevisionNumber(pub u64);

impl RevisionNumber {
    pub const ZERO: Self = Self(0);

    pub fn get(&self) -> u64 {
        self.0
    }

    /// The revision following this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RevisionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RevisionNumber {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| TypeError::InvalidRevision(s.to_string()))
    }
}

impl From<u64> for RevisionNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
