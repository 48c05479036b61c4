use thiserror::Error;

use edms_types::{ClassKind, TypeError};

/// Errors raised while building, containing or patching Things.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{container} cannot contain {child}")]
    InvalidContainment { container: ClassKind, child: ClassKind },

    #[error("{kind} has no field `{field}`")]
    UnknownField { kind: ClassKind, field: String },

    #[error("field `{field}` of {kind} cannot be changed by an update")]
    ProtectedField { kind: ClassKind, field: String },

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Ordered-collection key or membership clash.
    #[error(transparent)]
    Ordering(#[from] TypeError),

    #[error("malformed thing: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
