use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use edms_types::{Iid, RevisionNumber};

use crate::error::LedgerError;
use crate::record::{RevisionRecord, RevisionToken};
use crate::traits::{LedgerReader, LedgerWriter};

/// In-memory revision ledger for tests, local demos, and embedding.
#[derive(Default)]
pub struct InMemoryLedger {
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    streams: HashMap<Iid, Vec<RevisionRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, LedgerState>, LedgerError> {
        self.inner.read().map_err(|_| LedgerError::LockPoisoned)
    }
}

impl LedgerWriter for InMemoryLedger {
    fn issue(&self, partition: &Iid) -> Result<RevisionToken, LedgerError> {
        let state = self.read_state()?;
        let head = state.streams.get(partition).and_then(|s| s.last());
        Ok(RevisionToken {
            partition: *partition,
            base: head.map_or(RevisionNumber::ZERO, |r| r.revision),
            prev_hash: head.map(|r| r.record_hash),
        })
    }

    fn commit(
        &self,
        token: RevisionToken,
        actor: Option<Iid>,
        changed: Vec<Iid>,
        deleted: Vec<Iid>,
    ) -> Result<RevisionRecord, LedgerError> {
        let mut state = self.inner.write().map_err(|_| LedgerError::LockPoisoned)?;
        let stream = state.streams.entry(token.partition).or_default();
        let last = stream.last();

        let actual = last.map_or(RevisionNumber::ZERO, |r| r.revision);
        if actual != token.base {
            return Err(LedgerError::StaleToken {
                partition: token.partition,
                expected: token.base,
                actual,
            });
        }
        let prev_hash = last.map(|r| r.record_hash);
        if prev_hash != token.prev_hash {
            return Err(LedgerError::IntegrityViolation {
                revision: token.revision(),
                reason: "token previous hash does not match head".into(),
            });
        }

        // Commit timestamps never run backwards within a partition.
        let now = Utc::now();
        let committed_on = last.map_or(now, |r| r.committed_on.max(now));

        let mut record = RevisionRecord {
            partition: token.partition,
            revision: token.revision(),
            committed_on,
            actor,
            changed,
            deleted,
            prev_hash,
            record_hash: [0; 32],
        };
        record.record_hash = record.compute_hash()?;
        stream.push(record.clone());

        tracing::info!(
            partition = %record.partition,
            revision = record.revision.get(),
            changed = record.changed.len(),
            deleted = record.deleted.len(),
            hash = %record.hash_hex(),
            "revision committed"
        );
        Ok(record)
    }
}

impl LedgerReader for InMemoryLedger {
    fn head(&self, partition: &Iid) -> Result<Option<RevisionRecord>, LedgerError> {
        let state = self.read_state()?;
        Ok(state.streams.get(partition).and_then(|s| s.last()).cloned())
    }

    fn record(
        &self,
        partition: &Iid,
        revision: RevisionNumber,
    ) -> Result<Option<RevisionRecord>, LedgerError> {
        let state = self.read_state()?;
        Ok(state
            .streams
            .get(partition)
            .and_then(|s| s.iter().find(|r| r.revision == revision))
            .cloned())
    }

    fn read_range(
        &self,
        partition: &Iid,
        range: RangeInclusive<RevisionNumber>,
    ) -> Result<Vec<RevisionRecord>, LedgerError> {
        if range.start() > range.end() {
            return Err(LedgerError::InvalidRange {
                from: *range.start(),
                to: *range.end(),
            });
        }
        let state = self.read_state()?;
        Ok(state
            .streams
            .get(partition)
            .map(|s| {
                s.iter()
                    .filter(|r| range.contains(&r.revision))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn read_all(&self, partition: &Iid) -> Result<Vec<RevisionRecord>, LedgerError> {
        let state = self.read_state()?;
        Ok(state.streams.get(partition).cloned().unwrap_or_default())
    }

    fn revision_at(
        &self,
        partition: &Iid,
        at: DateTime<Utc>,
    ) -> Result<RevisionNumber, LedgerError> {
        let state = self.read_state()?;
        let stream = state
            .streams
            .get(partition)
            .ok_or(LedgerError::PartitionNotFound(*partition))?;
        Ok(stream
            .iter()
            .take_while(|r| r.committed_on <= at)
            .last()
            .map_or(RevisionNumber::ZERO, |r| r.revision))
    }

    fn partitions(&self) -> Result<Vec<Iid>, LedgerError> {
        let state = self.read_state()?;
        let mut ids: Vec<Iid> = state.streams.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let partitions = self.read_state().map(|s| s.streams.len()).unwrap_or(0);
        f.debug_struct("InMemoryLedger")
            .field("partitions", &partitions)
            .finish()
    }
}
