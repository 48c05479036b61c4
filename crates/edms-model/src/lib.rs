//! Thing catalogue and containment graph for the EDMS engineering data store.
//!
//! Every persisted object is a [`Thing`]: a closed enum over the modelled
//! classes. This crate knows how Things contain and reference each other and
//! how a client update is applied to one, but nothing about revisions,
//! storage or access control.
//!
//! # Key Types
//!
//! - [`Thing`]: Tagged union of every modelled class
//! - [`ThingView`]: Read access to a containment forest
//! - [`ThingGraph`]: Owned containment forest
//! - [`Patch`]: Field-level update of one Thing
//! - [`FieldShape`]: How a field reacts to an update

pub mod error;
pub mod graph;
pub mod patch;
pub mod schema;
pub mod thing;
pub mod things;
pub mod view;

pub use error::ModelError;
pub use graph::ThingGraph;
pub use patch::{apply_patch, detached, remap, Patch};
pub use schema::{field_shape, FieldShape, VALUE_ARRAY_FIELDS};
pub use thing::{ChildSlot, RefStrength, Reference, Thing};
pub use things::*;
pub use view::ThingView;
