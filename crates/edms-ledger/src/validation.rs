use edms_types::{Iid, RevisionNumber};

use crate::error::LedgerError;
use crate::traits::LedgerReader;

/// Result of chain validation for one partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub partition: Iid,
    pub record_count: u64,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub revision: RevisionNumber,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    SequenceGap,
    HashChainBreak,
    HashMismatch,
    WrongPartition,
}

/// Revision chain integrity validator.
pub struct ChainValidator;

impl ChainValidator {
    /// Validate the revision chain of `partition`.
    pub fn validate<R: LedgerReader + ?Sized>(
        reader: &R,
        partition: &Iid,
    ) -> Result<ValidationReport, LedgerError> {
        let records = reader.read_all(partition)?;
        let mut violations = Vec::new();

        for (index, record) in records.iter().enumerate() {
            let expected = RevisionNumber(index as u64 + 1);
            let mut flag = |kind, description: String| {
                violations.push(Violation {
                    revision: record.revision,
                    kind,
                    description,
                })
            };

            if record.partition != *partition {
                flag(
                    ViolationKind::WrongPartition,
                    format!("record belongs to {}", record.partition),
                );
            }
            if record.revision != expected {
                flag(
                    ViolationKind::SequenceGap,
                    format!("expected revision {expected}, got {}", record.revision),
                );
            }

            let expected_prev = index.checked_sub(1).map(|i| records[i].record_hash);
            if record.prev_hash != expected_prev {
                flag(
                    ViolationKind::HashChainBreak,
                    "previous hash link mismatch".into(),
                );
            }

            if record.compute_hash()? != record.record_hash {
                flag(
                    ViolationKind::HashMismatch,
                    "record hash does not match computed".into(),
                );
            }
        }

        Ok(ValidationReport {
            partition: *partition,
            record_count: records.len() as u64,
            violations,
        })
    }
}
