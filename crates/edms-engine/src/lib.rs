//! Derived-object synchronization for the EDMS engineering data store.
//!
//! Two reconcilers keep derived Things consistent with what clients edit:
//!
//! - [`finite_state`]: actual finite states are the cartesian product of
//!   the possible finite state lists their list references
//! - [`fanout`]: parameters, overrides and subscriptions carry exactly one
//!   value set per option or state they depend on
//!
//! Both are pure functions from a [`ThingView`](edms_model::ThingView) and a
//! [`Delta`] to [`Mutation`]s. [`apply_invariants`] combines them; the write
//! pipeline calls it until it returns nothing.

pub mod error;
pub mod fanout;
pub mod finite_state;
pub mod invariants;
pub mod mutation;

#[cfg(test)]
mod test_support;

pub use error::EngineError;
pub use fanout::{desired_keys, ReferenceData, ValueSetKey};
pub use finite_state::cartesian;
pub use invariants::{apply_invariants, MAX_ROUNDS};
pub use mutation::{Delta, Mutation};
