//! Keeps the value sets of parameters, overrides and subscriptions in step
//! with their option and state dependence.

use std::collections::{BTreeSet, HashMap, HashSet};

use edms_model::{
    ParameterOverrideValueSet, ParameterSubscriptionValueSet, ParameterValueSet, Thing, ThingView,
};
use edms_types::{ClassKind, Iid};

use crate::error::EngineError;
use crate::mutation::{Delta, Mutation};

/// Site-directory data the fan-out needs while working on a model.
pub trait ReferenceData {
    /// Number of value components of a parameter type. Scalars have one;
    /// writes naming an unknown type are rejected before the engine runs,
    /// so the fallback of one is never observed by clients.
    fn component_count(&self, parameter_type: &Iid) -> usize;
}

impl ReferenceData for HashMap<Iid, usize> {
    fn component_count(&self, parameter_type: &Iid) -> usize {
        self.get(parameter_type).copied().unwrap_or(1).max(1)
    }
}

/// Value-set key: `(actualOption, actualState)`.
pub type ValueSetKey = (Option<Iid>, Option<Iid>);

/// Desired value-set keys of a parameter.
pub fn desired_keys(view: &dyn ThingView, parameter: &Iid) -> Result<Vec<ValueSetKey>, EngineError> {
    let Some(Thing::Parameter(p)) = view.get(parameter) else {
        return Ok(Vec::new());
    };
    if p.is_option_dependent && p.state_dependence.is_some() {
        return Err(EngineError::ConflictingDependence(p.iid));
    }
    if let Some(list) = p.state_dependence {
        return match view.get(&list) {
            Some(Thing::ActualFiniteStateList(l)) => Ok(l
                .actual_state
                .iter()
                .filter(|s| view.contains(s))
                .map(|s| (None, Some(*s)))
                .collect()),
            _ => Err(EngineError::Dangling {
                what: "ActualFiniteStateList",
                iid: list,
                holder: p.iid,
            }),
        };
    }
    if p.is_option_dependent {
        let options = view
            .iteration_of(parameter)
            .and_then(|it| match view.get(&it) {
                Some(Thing::Iteration(iteration)) => Some(
                    iteration
                        .option
                        .values()
                        .filter(|o| view.contains(o))
                        .map(|o| (Some(o), None))
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default();
        return Ok(options);
    }
    Ok(vec![(None, None)])
}

/// Mutations that restore the fan-out invariant for everything `delta`
/// affects.
///
/// Things listed in `unsettled` are still having derived children changed in
/// this round; dependants of them are left for the next round.
pub fn reconcile(
    view: &dyn ThingView,
    delta: &Delta,
    reference: &dyn ReferenceData,
    unsettled: &HashSet<Iid>,
) -> Result<Vec<Mutation>, EngineError> {
    let mut unsettled = unsettled.clone();
    let mut out = Vec::new();

    let parameters = dirty_parameters(view, delta);
    for id in &parameters {
        let depends_on = match view.get(id) {
            Some(Thing::Parameter(p)) => p.state_dependence,
            _ => None,
        };
        if depends_on.is_some_and(|list| unsettled.contains(&list)) {
            unsettled.insert(*id);
            continue;
        }
        let mutations = reconcile_parameter(view, id, reference)?;
        if !mutations.is_empty() {
            unsettled.insert(*id);
        }
        out.extend(mutations);
    }

    let overrides = dirty_overrides(view, delta, &parameters);
    for id in &overrides {
        let parent = match view.get(id) {
            Some(Thing::ParameterOverride(o)) => o.parameter,
            _ => continue,
        };
        if unsettled.contains(&parent) {
            unsettled.insert(*id);
            continue;
        }
        let mutations = reconcile_override(view, id, reference)?;
        if !mutations.is_empty() {
            unsettled.insert(*id);
        }
        out.extend(mutations);
    }

    for id in dirty_subscriptions(view, delta, &parameters, &overrides) {
        if view.container_of(&id).is_some_and(|c| unsettled.contains(&c)) {
            continue;
        }
        out.extend(reconcile_subscription(view, &id, reference)?);
    }

    Ok(out)
}

fn dirty_parameters(view: &dyn ThingView, delta: &Delta) -> BTreeSet<Iid> {
    view.of_kind(ClassKind::Parameter)
        .into_iter()
        .filter(|id| match view.get(id) {
            Some(Thing::Parameter(p)) => {
                delta.changed(id)
                    || p.state_dependence.is_some_and(|l| list_touched(view, delta, &l))
                    || (p.is_option_dependent
                        && view.iteration_of(id).is_some_and(|it| delta.changed(&it)))
            }
            _ => false,
        })
        .collect()
}

/// A state list counts as touched when any of its actual states is, so a
/// parameter skipped while the list's states were rewritten in place is
/// picked up again in the following round.
fn list_touched(view: &dyn ThingView, delta: &Delta, list: &Iid) -> bool {
    delta.touched(list)
        || matches!(view.get(list), Some(Thing::ActualFiniteStateList(l))
            if l.actual_state.iter().any(|s| delta.touched(s)))
}

fn dirty_overrides(
    view: &dyn ThingView,
    delta: &Delta,
    parameters: &BTreeSet<Iid>,
) -> BTreeSet<Iid> {
    view.of_kind(ClassKind::ParameterOverride)
        .into_iter()
        .filter(|id| match view.get(id) {
            Some(Thing::ParameterOverride(o)) => {
                delta.changed(id)
                    || delta.touched(&o.parameter)
                    || parameters.contains(&o.parameter)
            }
            _ => false,
        })
        .collect()
}

fn dirty_subscriptions(
    view: &dyn ThingView,
    delta: &Delta,
    parameters: &BTreeSet<Iid>,
    overrides: &BTreeSet<Iid>,
) -> BTreeSet<Iid> {
    view.of_kind(ClassKind::ParameterSubscription)
        .into_iter()
        .filter(|id| {
            delta.changed(id)
                || view.container_of(id).is_some_and(|c| {
                    delta.touched(&c) || parameters.contains(&c) || overrides.contains(&c)
                })
        })
        .collect()
}

fn reconcile_parameter(
    view: &dyn ThingView,
    iid: &Iid,
    reference: &dyn ReferenceData,
) -> Result<Vec<Mutation>, EngineError> {
    let Some(Thing::Parameter(p)) = view.get(iid) else {
        return Ok(Vec::new());
    };
    let desired = desired_keys(view, iid)?;
    let components = reference.component_count(&p.parameter_type);

    let mut out = Vec::new();
    let mut kept = HashSet::new();
    for id in &p.value_set {
        if let Some(Thing::ParameterValueSet(vs)) = view.get(id) {
            let key = (vs.actual_option, vs.actual_state);
            if !(desired.contains(&key) && kept.insert(key)) {
                out.push(Mutation::Delete(vs.iid));
            }
        }
    }
    for (option, state) in desired {
        if kept.contains(&(option, state)) {
            continue;
        }
        out.push(Mutation::Create {
            container: p.iid,
            thing: Thing::ParameterValueSet(ParameterValueSet::empty(
                Iid::new(),
                option,
                state,
                components,
            )),
        });
    }
    if !out.is_empty() {
        tracing::debug!(parameter = %p.iid, mutations = out.len(), "value sets fanned out");
    }
    Ok(out)
}

fn reconcile_override(
    view: &dyn ThingView,
    iid: &Iid,
    reference: &dyn ReferenceData,
) -> Result<Vec<Mutation>, EngineError> {
    let Some(Thing::ParameterOverride(o)) = view.get(iid) else {
        return Ok(Vec::new());
    };
    let Some(Thing::Parameter(parameter)) = view.get(&o.parameter) else {
        return Err(EngineError::Dangling {
            what: "Parameter",
            iid: o.parameter,
            holder: o.iid,
        });
    };
    let parents = value_sets_of(view, &parameter.value_set, ClassKind::ParameterValueSet);
    let components = reference.component_count(&parameter.parameter_type);

    let mut out = Vec::new();
    let mut kept = HashSet::new();
    for id in &o.value_set {
        if let Some(Thing::ParameterOverrideValueSet(vs)) = view.get(id) {
            if !(parents.contains(&vs.parameter_value_set) && kept.insert(vs.parameter_value_set))
            {
                out.push(Mutation::Delete(vs.iid));
            }
        }
    }
    for parent in parents {
        if kept.contains(&parent) {
            continue;
        }
        out.push(Mutation::Create {
            container: o.iid,
            thing: Thing::ParameterOverrideValueSet(ParameterOverrideValueSet::empty(
                Iid::new(),
                parent,
                components,
            )),
        });
    }
    Ok(out)
}

fn reconcile_subscription(
    view: &dyn ThingView,
    iid: &Iid,
    reference: &dyn ReferenceData,
) -> Result<Vec<Mutation>, EngineError> {
    let Some(Thing::ParameterSubscription(s)) = view.get(iid) else {
        return Ok(Vec::new());
    };
    let (parents, parameter_type) = match view.container_of(iid).and_then(|c| view.get(&c)) {
        Some(Thing::Parameter(p)) => (
            value_sets_of(view, &p.value_set, ClassKind::ParameterValueSet),
            p.parameter_type,
        ),
        Some(Thing::ParameterOverride(o)) => match view.get(&o.parameter) {
            Some(Thing::Parameter(p)) => (
                value_sets_of(view, &o.value_set, ClassKind::ParameterOverrideValueSet),
                p.parameter_type,
            ),
            _ => return Ok(Vec::new()),
        },
        _ => return Ok(Vec::new()),
    };
    let components = reference.component_count(&parameter_type);

    let mut out = Vec::new();
    let mut kept = HashSet::new();
    for id in &s.value_set {
        if let Some(Thing::ParameterSubscriptionValueSet(vs)) = view.get(id) {
            if !(parents.contains(&vs.subscribed_value_set) && kept.insert(vs.subscribed_value_set))
            {
                out.push(Mutation::Delete(vs.iid));
            }
        }
    }
    for parent in parents {
        if kept.contains(&parent) {
            continue;
        }
        out.push(Mutation::Create {
            container: s.iid,
            thing: Thing::ParameterSubscriptionValueSet(ParameterSubscriptionValueSet::empty(
                Iid::new(),
                parent,
                components,
            )),
        });
    }
    Ok(out)
}

fn value_sets_of(view: &dyn ThingView, ids: &[Iid], kind: ClassKind) -> Vec<Iid> {
    ids.iter()
        .filter(|id| view.get(id).map(Thing::class_kind) == Some(kind))
        .copied()
        .collect()
}
