//! Deep copy of an iteration for a new iteration setup.

use std::collections::HashMap;

use edms_model::{remap, Thing, ThingView};
use edms_types::Iid;

use crate::error::{ServiceError, ServiceResult};

/// Remapped copy of an iteration and everything it contains.
#[derive(Debug)]
pub struct IterationCopy {
    pub iteration: Thing,
    /// `(container, thing)` pairs, containers before their contents.
    pub contents: Vec<(Iid, Thing)>,
}

/// Copy `source` with fresh iids.
///
/// References between copied Things are rewritten to the copies; references
/// leaving the iteration (domains, parameter types, persons) and file
/// content hashes are kept.
pub fn copy_iteration(
    view: &dyn ThingView,
    source: &Iid,
    iteration: Iid,
    iteration_setup: Iid,
) -> ServiceResult<IterationCopy> {
    let original = view
        .get(source)
        .ok_or_else(|| ServiceError::NotFound(format!("iteration {source}")))?;
    let descendants = view.descendants(source);

    let mut map = HashMap::with_capacity(descendants.len() + 1);
    map.insert(*source, iteration);
    for id in &descendants {
        map.insert(*id, Iid::new());
    }

    let mut copy = remap(original, &map)?;
    if let Thing::Iteration(it) = &mut copy {
        it.iteration_setup = iteration_setup;
    }

    let mut contents = Vec::with_capacity(descendants.len());
    for id in &descendants {
        let (Some(thing), Some(container)) = (view.get(id), view.container_of(id)) else {
            continue;
        };
        let container = map.get(&container).copied().unwrap_or(container);
        contents.push((container, remap(thing, &map)?));
    }
    tracing::debug!(source = %source, copy = %iteration, things = contents.len(), "iteration copied");
    Ok(IterationCopy {
        iteration: copy,
        contents,
    })
}
