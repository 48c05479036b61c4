use std::fmt;

use serde::{Deserialize, Serialize};

/// Access right a participant holds on a class of Thing.
///
/// Ordered from least to most permissive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessRight {
    /// Neither read nor write.
    None,
    /// Read only.
    ReadOnly,
    /// Read; write only when the actor holds the owning domain.
    ModifyIfOwner,
    /// Read and write regardless of ownership.
    Modify,
}

impl AccessRight {
    /// Whether this right allows reading.
    pub fn can_read(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Whether this right allows writing, given whether the actor owns the
    /// object.
    pub fn can_write(&self, is_owner: bool) -> bool {
        match self {
            Self::None | Self::ReadOnly => false,
            Self::ModifyIfOwner => is_owner,
            Self::Modify => true,
        }
    }
}

impl Default for AccessRight {
    fn default() -> Self {
        Self::ModifyIfOwner
    }
}

impl fmt::Display for AccessRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "NONE",
            Self::ReadOnly => "READ_ONLY",
            Self::ModifyIfOwner => "MODIFY_IF_OWNER",
            Self::Modify => "MODIFY",
        };
        f.write_str(name)
    }
}
