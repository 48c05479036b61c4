use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};

use edms_types::{Iid, RevisionNumber};

use crate::error::LedgerError;
use crate::record::{RevisionRecord, RevisionToken};

/// Write boundary: revisions are issued as tokens and committed once.
pub trait LedgerWriter: Send + Sync {
    /// Issue a token for the next revision of `partition`.
    fn issue(&self, partition: &Iid) -> Result<RevisionToken, LedgerError>;

    /// Append the record for `token`. Fails if the head moved since issue.
    fn commit(
        &self,
        token: RevisionToken,
        actor: Option<Iid>,
        changed: Vec<Iid>,
        deleted: Vec<Iid>,
    ) -> Result<RevisionRecord, LedgerError>;
}

/// Read boundary for revision history queries.
pub trait LedgerReader: Send + Sync {
    /// Latest committed record, `None` before the first commit.
    fn head(&self, partition: &Iid) -> Result<Option<RevisionRecord>, LedgerError>;

    fn record(
        &self,
        partition: &Iid,
        revision: RevisionNumber,
    ) -> Result<Option<RevisionRecord>, LedgerError>;

    fn read_range(
        &self,
        partition: &Iid,
        range: RangeInclusive<RevisionNumber>,
    ) -> Result<Vec<RevisionRecord>, LedgerError>;

    fn read_all(&self, partition: &Iid) -> Result<Vec<RevisionRecord>, LedgerError>;

    /// The revision in effect at `at`: the newest record committed at or
    /// before that instant, or zero.
    fn revision_at(&self, partition: &Iid, at: DateTime<Utc>)
        -> Result<RevisionNumber, LedgerError>;

    fn partitions(&self) -> Result<Vec<Iid>, LedgerError>;
}
