use thiserror::Error;

use crate::iid::Iid;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid iid: {0}")]
    InvalidIid(String),

    #[error("unknown class kind: {0}")]
    UnknownClassKind(String),

    #[error("duplicate ordered key {key} (already held by {holder})")]
    DuplicateKey { key: i64, holder: Iid },

    #[error("value {0} is already a member of the ordered collection")]
    DuplicateValue(Iid),

    #[error("value {0} is not a member of the ordered collection")]
    MissingValue(Iid),

    #[error("invalid revision number: {0}")]
    InvalidRevision(String),
}
