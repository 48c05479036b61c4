use edms_types::{Iid, RevisionNumber};

/// Errors from partition and blob storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("thing not found: {0}")]
    NotFound(Iid),

    #[error("partition not found: {0}")]
    PartitionNotFound(Iid),

    #[error("partition already exists: {0}")]
    PartitionExists(Iid),

    /// A commit must move the partition strictly forward.
    #[error("revision {attempted} does not advance partition at {current}")]
    RevisionNotAdvanced {
        current: RevisionNumber,
        attempted: RevisionNumber,
    },

    #[error("blob not found: {0}")]
    BlobNotFound(String),

    /// Uploaded content does not hash to the advertised key.
    #[error("content hash mismatch: expected {expected}, computed {computed}")]
    HashMismatch { expected: String, computed: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
