//! Keeps the actual finite states of every list equal to the cartesian
//! product of its possible finite state lists.

use std::collections::{BTreeSet, HashMap, HashSet};

use edms_model::{ActualFiniteState, ActualFiniteStateList, Thing, ThingView};
use edms_types::{ActualFiniteStateKind, ClassKind, Iid, RevisionNumber};

use crate::error::EngineError;
use crate::mutation::{Delta, Mutation};

/// Every combination picking one state from each list, first list varying
/// slowest. No lists means no combinations.
pub fn cartesian(components: &[Vec<Iid>]) -> Vec<Vec<Iid>> {
    if components.is_empty() {
        return Vec::new();
    }
    components.iter().fold(vec![Vec::new()], |acc, states| {
        acc.iter()
            .flat_map(|prefix| {
                states.iter().map(move |state| {
                    let mut combo = prefix.clone();
                    combo.push(*state);
                    combo
                })
            })
            .collect()
    })
}

/// Actual finite state lists affected by `delta`: changed themselves, or
/// referencing a possible finite state list that changed.
pub fn dirty_lists(view: &dyn ThingView, delta: &Delta) -> BTreeSet<Iid> {
    view.of_kind(ClassKind::ActualFiniteStateList)
        .into_iter()
        .filter(|id| match view.get(id) {
            Some(Thing::ActualFiniteStateList(list)) => {
                delta.changed(id)
                    || list
                        .possible_finite_state_list
                        .values()
                        .any(|pfsl| delta.touched(&pfsl))
            }
            _ => false,
        })
        .collect()
}

/// Mutations that restore the product invariant for one list.
pub fn reconcile_list(view: &dyn ThingView, iid: &Iid) -> Result<Vec<Mutation>, EngineError> {
    let Some(Thing::ActualFiniteStateList(list)) = view.get(iid) else {
        return Ok(Vec::new());
    };

    let components = component_states(view, list)?;
    let desired = cartesian(&components);
    let component_of: HashMap<Iid, usize> = components
        .iter()
        .enumerate()
        .flat_map(|(i, states)| states.iter().map(move |s| (*s, i)))
        .collect();

    let existing: Vec<&ActualFiniteState> = list
        .actual_state
        .iter()
        .filter_map(|id| match view.get(id) {
            Some(Thing::ActualFiniteState(state)) => Some(state),
            _ => None,
        })
        .collect();

    let mut out = Vec::new();
    let mut claimed: HashSet<Vec<Iid>> = HashSet::new();
    let mut partial = Vec::new();
    let (mut kept, mut extended, mut deleted) = (0usize, 0usize, 0usize);

    for state in existing {
        let slots = match slot_states(state, &component_of, components.len()) {
            Some(slots) if !desired.is_empty() && slots.iter().any(Option::is_some) => slots,
            _ => {
                out.push(Mutation::Delete(state.iid));
                deleted += 1;
                continue;
            }
        };
        if slots.iter().all(Option::is_some) {
            let combo: Vec<Iid> = slots.into_iter().flatten().collect();
            if claimed.insert(combo.clone()) {
                if state.possible_state != combo {
                    out.push(Mutation::Replace(with_states(state, combo)));
                }
                kept += 1;
            } else {
                out.push(Mutation::Delete(state.iid));
                deleted += 1;
            }
        } else {
            partial.push((state, slots));
        }
    }

    // States missing a component are extended with the first state of each
    // missing list, keeping their identity.
    for (state, slots) in partial {
        let combo: Vec<Iid> = slots
            .iter()
            .enumerate()
            .map(|(i, slot)| slot.unwrap_or(components[i][0]))
            .collect();
        if claimed.insert(combo.clone()) {
            out.push(Mutation::Replace(with_states(state, combo)));
            extended += 1;
        } else {
            out.push(Mutation::Delete(state.iid));
            deleted += 1;
        }
    }

    let kind = new_state_kind(view, list);
    let mut created = 0usize;
    for combo in desired {
        if claimed.contains(&combo) {
            continue;
        }
        out.push(Mutation::Create {
            container: list.iid,
            thing: Thing::ActualFiniteState(ActualFiniteState {
                iid: Iid::new(),
                revision_number: RevisionNumber::ZERO,
                excluded_domain: Vec::new(),
                excluded_person: Vec::new(),
                kind,
                possible_state: combo,
            }),
        });
        created += 1;
    }

    if !out.is_empty() {
        tracing::debug!(
            list = %list.iid,
            kept,
            extended,
            created,
            deleted,
            "actual finite states reconciled"
        );
    }
    Ok(out)
}

/// Possible states of each referenced list, in list key order.
fn component_states(
    view: &dyn ThingView,
    list: &ActualFiniteStateList,
) -> Result<Vec<Vec<Iid>>, EngineError> {
    list.possible_finite_state_list
        .values()
        .map(|pfsl| match view.get(&pfsl) {
            Some(Thing::PossibleFiniteStateList(possible)) => Ok(possible
                .possible_state
                .values()
                .filter(|s| view.contains(s))
                .collect()),
            _ => Err(EngineError::Dangling {
                what: "PossibleFiniteStateList",
                iid: pfsl,
                holder: list.iid,
            }),
        })
        .collect()
}

/// Places each possible state of `state` at its component position. `None`
/// if it references a state outside the lists or two states of one list.
fn slot_states(
    state: &ActualFiniteState,
    component_of: &HashMap<Iid, usize>,
    width: usize,
) -> Option<Vec<Option<Iid>>> {
    let mut slots = vec![None; width];
    for possible in &state.possible_state {
        let index = *component_of.get(possible)?;
        if slots[index].replace(*possible).is_some() {
            return None;
        }
    }
    Some(slots)
}

fn with_states(state: &ActualFiniteState, combo: Vec<Iid>) -> Thing {
    let mut updated = state.clone();
    updated.possible_state = combo;
    Thing::ActualFiniteState(updated)
}

fn new_state_kind(view: &dyn ThingView, list: &ActualFiniteStateList) -> ActualFiniteStateKind {
    let default_option = view
        .iteration_of(&list.iid)
        .and_then(|it| match view.get(&it) {
            Some(Thing::Iteration(iteration)) => iteration.default_option,
            _ => None,
        });
    match default_option {
        Some(option) if list.exclude_option.contains(&option) => ActualFiniteStateKind::Forbidden,
        _ => ActualFiniteStateKind::Mandatory,
    }
}
