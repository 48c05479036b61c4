use thiserror::Error;

use edms_engine::EngineError;
use edms_gate::{DenialKind, GateError};
use edms_ledger::LedgerError;
use edms_model::ModelError;
use edms_store::StoreError;
use edms_types::TypeError;

/// Everything that can abort a read or write.
///
/// Each variant maps to a stable wire tag and HTTP status; nothing is
/// committed when a write fails.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    /// Ordered-collection key or value clash, or reorder of an absent value.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("not authenticated: {0}")]
    Unauthenticated(String),

    #[error("hidden: {0}")]
    Visibility(String),

    #[error("frozen iteration: {0}")]
    FrozenIteration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Validation(_) => "#VALIDATION",
            Self::Conflict(_) => "#CONFLICT",
            Self::Authorization(_) => "#UNAUTHORIZED",
            Self::Unauthenticated(_) => "#UNAUTHENTICATED",
            Self::Visibility(_) => "#HIDDEN",
            Self::FrozenIteration(_) => "#FROZEN_ITERATION",
            Self::NotFound(_) => "#NOT_FOUND",
            Self::Internal(_) => "#INTERNAL",
        }
    }

    /// Variant name as reported in the error body's `kind` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::Conflict(_) => "ConflictError",
            Self::Authorization(_) => "AuthorizationError",
            Self::Unauthenticated(_) => "AuthenticationError",
            Self::Visibility(_) => "VisibilityError",
            Self::FrozenIteration(_) => "FrozenIterationError",
            Self::NotFound(_) => "NotFoundError",
            Self::Internal(_) => "InternalError",
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::Authorization(_) | Self::Unauthenticated(_) => 401,
            Self::NotFound(_) => 404,
            Self::Internal(_) => 500,
            Self::Validation(_)
            | Self::Conflict(_)
            | Self::Visibility(_)
            | Self::FrozenIteration(_) => 400,
        }
    }

    /// Map a gate denial onto the matching error.
    pub fn denied(kind: DenialKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match kind {
            DenialKind::FrozenIteration => Self::FrozenIteration(reason),
            DenialKind::Hidden => Self::Visibility(reason),
            DenialKind::Locked | DenialKind::Unauthorized => Self::Authorization(reason),
        }
    }
}

impl From<TypeError> for ServiceError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::DuplicateKey { .. }
            | TypeError::DuplicateValue(_)
            | TypeError::MissingValue(_) => Self::Conflict(err.to_string()),
            _ => Self::Validation(err.to_string()),
        }
    }
}

impl From<ModelError> for ServiceError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Ordering(inner) => inner.into(),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<EngineError> for ServiceError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Model(inner) => inner.into(),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(iid) | StoreError::PartitionNotFound(iid) => {
                Self::NotFound(iid.to_string())
            }
            StoreError::BlobNotFound(hash) => Self::NotFound(format!("file content {hash}")),
            StoreError::HashMismatch { .. } => Self::Validation(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<LedgerError> for ServiceError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidRange { .. } => Self::Validation(err.to_string()),
            LedgerError::PartitionNotFound(iid) => Self::NotFound(iid.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<GateError> for ServiceError {
    fn from(err: GateError) -> Self {
        Self::Internal(err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
