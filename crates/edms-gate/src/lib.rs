//! Access control pipeline for EDMS.
//!
//! Every read and write of a Thing is described as an [`AccessRequest`] and
//! run through an [`AccessGate`], a fail-fast pipeline of stages that checks
//! frozen iterations, hidden objects, locks and per-class permissions in
//! that order.
//!
//! # Quick Start
//!
//! ```rust
//! use edms_gate::{AccessGate, AccessRequest, Actor, GateConfig, Operation};
//! use edms_types::{ClassKind, Iid};
//!
//! let gate = AccessGate::with_default_stages(GateConfig::default());
//! let admin = Actor::new(Iid::new()).site_admin();
//! let request = AccessRequest::new(Operation::Create, ClassKind::Person, Iid::new());
//! assert!(gate.evaluate(&admin, &request).unwrap().is_allowed());
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod stage;
pub mod stages;

pub use config::GateConfig;
pub use error::GateError;
pub use gate::{AccessGate, AccessResult};
pub use stage::{
    AccessRequest, AccessStage, Actor, DenialKind, GateContext, Operation, Participation,
    StageDecision, StageResult,
};
pub use stages::{FrozenIterationStage, LockStage, PermissionStage, VisibilityStage};
