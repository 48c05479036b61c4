//! Storage backend for the EDMS engineering data store.
//!
//! This crate defines:
//! - [`Partition`]: current state and per-Thing history of one partition
//! - [`PartitionRegistry`]: the site directory plus every model, each
//!   behind its own lock
//! - [`BlobStore`] trait: content-addressed file payload storage
//! - [`InMemoryBlobStore`] / [`FsBlobStore`]: memory and directory backends

pub mod blob;
pub mod error;
pub mod partition;
pub mod registry;

pub use blob::{content_hash, BlobStore, FsBlobStore, InMemoryBlobStore};
pub use error::{StoreError, StoreResult};
pub use partition::{Change, HistoryEntry, Partition};
pub use registry::{PartitionRegistry, SharedPartition};
