use edms_types::{Iid, RevisionNumber};

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The partition head moved after the token was issued.
    #[error("stale revision token for {partition}: expected head {expected}, found {actual}")]
    StaleToken {
        partition: Iid,
        expected: RevisionNumber,
        actual: RevisionNumber,
    },

    #[error("integrity violation at revision {revision}: {reason}")]
    IntegrityViolation {
        revision: RevisionNumber,
        reason: String,
    },

    #[error("invalid revision range: from={from}, to={to}")]
    InvalidRange {
        from: RevisionNumber,
        to: RevisionNumber,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("partition not found: {0}")]
    PartitionNotFound(Iid),

    #[error("ledger lock poisoned")]
    LockPoisoned,
}
