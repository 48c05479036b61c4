//! Foundation types for the EDMS engineering data store.
//!
//! This crate provides the identity, classification, ordering and value
//! primitives shared by every other EDMS crate.
//!
//! # Key Types
//!
//! - [`Iid`]: Stable UUID identity of every persisted Thing
//! - [`ClassKind`]: Closed tag identifying the variant of a Thing
//! - [`RevisionNumber`]: Monotonic per-partition revision counter
//! - [`OrderedItem`] / [`OrderedCollection`]: Sparse-keyed ordered references
//! - [`AccessRight`]: Per-class permission grant of a participant
//! - [`ValueArray`] / [`ValueSwitch`]: Parameter value payloads

pub mod access;
pub mod class_kind;
pub mod error;
pub mod iid;
pub mod ordered;
pub mod revision;
pub mod value;

pub use access::AccessRight;
pub use class_kind::{ClassKind, PartitionKind};
pub use error::TypeError;
pub use iid::Iid;
pub use ordered::{OrderedCollection, OrderedItem};
pub use revision::RevisionNumber;
pub use value::{ActualFiniteStateKind, ValueArray, ValueSwitch, EMPTY_VALUE};
