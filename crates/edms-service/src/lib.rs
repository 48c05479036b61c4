//! Transactional service layer for the EDMS engineering data store.
//!
//! [`EdmsService`] owns the partitions, the revision ledger and the file
//! blob store. A write is staged in an [`Overlay`] over the partition,
//! authorized Thing by Thing, settled by the synchronization engines and
//! committed as exactly one new revision, or not at all.
//!
//! # Quick Start
//!
//! ```rust
//! use edms_service::{EdmsService, ReadOptions};
//!
//! let service = EdmsService::in_memory();
//! let site = service.bootstrap("ACME", "admin").unwrap();
//! let model = service
//!     .create_model(&site.admin, "Satellite", "SAT", Vec::new())
//!     .unwrap();
//! let read = service
//!     .read(Some(&site.admin), &model.model, &model.iteration, &ReadOptions::default())
//!     .unwrap();
//! assert_eq!(read.things().len(), 1);
//! ```

pub mod access;
pub mod branch;
pub mod error;
pub mod files;
pub mod overlay;
pub mod request;
pub mod service;

pub use error::{ServiceError, ServiceResult};
pub use overlay::Overlay;
pub use request::{
    BundleEntry, CreateItem, Extent, ModelCommit, ReadOptions, ReadResponse, RevisionSelector,
    UpdateItem, WriteRequest, WriteResponse,
};
pub use service::{Bootstrap, EdmsService, ModelHandle, ServiceConfig};
