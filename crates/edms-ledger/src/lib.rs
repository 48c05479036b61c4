//! Revision ledger for the EDMS engineering data store.
//!
//! Each partition (the site directory, each engineering model) owns an
//! independent, strictly increasing revision counter. This crate provides:
//! - [`RevisionRecord`]: hash-linked record of one committed revision
//! - [`RevisionToken`]: the right to commit the next revision, bound to the
//!   head it was issued against
//! - `LedgerWriter` / `LedgerReader` trait boundaries
//! - [`InMemoryLedger`] implementation for tests and embedding
//! - Chain validation (sequence, previous-hash links, record hashes)

pub mod error;
pub mod memory;
pub mod record;
pub mod traits;
pub mod validation;

pub use error::LedgerError;
pub use memory::InMemoryLedger;
pub use record::{RevisionRecord, RevisionToken};
pub use traits::{LedgerReader, LedgerWriter};
pub use validation::{ChainValidator, ValidationReport, Violation, ViolationKind};
