//! Combined derivation step run by the write pipeline after every staged
//! change, until it yields nothing.

use std::collections::HashSet;

use edms_model::ThingView;

use crate::error::EngineError;
use crate::fanout::{self, ReferenceData};
use crate::finite_state;
use crate::mutation::{Delta, Mutation};

/// Upper bound on derivation rounds for one write.
pub const MAX_ROUNDS: usize = 16;

/// Side effects implied by `delta` on `view`: finite states first, then
/// value-set fan-out.
///
/// Pure: the caller stages the returned mutations, computes the delta they
/// produce and calls again until the result is empty.
pub fn apply_invariants(
    view: &dyn ThingView,
    delta: &Delta,
    reference: &dyn ReferenceData,
) -> Result<Vec<Mutation>, EngineError> {
    let mut out = Vec::new();
    let mut unsettled = HashSet::new();
    for list in finite_state::dirty_lists(view, delta) {
        let mutations = finite_state::reconcile_list(view, &list)?;
        if !mutations.is_empty() {
            unsettled.insert(list);
        }
        out.extend(mutations);
    }
    out.extend(fanout::reconcile(view, delta, reference, &unsettled)?);
    tracing::debug!(
        created = delta.created.len(),
        updated = delta.updated.len(),
        deleted = delta.deleted.len(),
        mutations = out.len(),
        "invariant round"
    );
    Ok(out)
}
