//! In-memory model used by the engine tests: stages mutations on a
//! [`ThingGraph`] and drives the invariants to a fixpoint.

use std::collections::{BTreeSet, HashMap};

use serde_json::json;

use edms_model::{
    ActualFiniteState, Parameter, ParameterOverrideValueSet, ParameterSubscriptionValueSet,
    ParameterValueSet, RefStrength, Thing, ThingGraph, ThingView,
};
use edms_types::{Iid, ValueArray};

use crate::error::EngineError;
use crate::finite_state::cartesian;
use crate::invariants::{apply_invariants, MAX_ROUNDS};
use crate::mutation::{Delta, Mutation};

pub struct Fixture {
    pub graph: ThingGraph,
    pub components: HashMap<Iid, usize>,
    pub scalar_type: Iid,
    pub compound_type: Iid,
    iteration: Iid,
    owner: Iid,
    pending: Delta,
}

fn parse(value: serde_json::Value) -> Thing {
    serde_json::from_value(value).unwrap()
}

impl Fixture {
    pub fn new() -> Self {
        let model = Iid::new();
        let iteration = Iid::new();
        let mut graph = ThingGraph::new();
        graph.insert(None, parse(json!({
            "classKind": "EngineeringModel", "iid": model,
            "engineeringModelSetup": Iid::new(), "iteration": [iteration],
        })));
        graph.insert(Some(model), parse(json!({
            "classKind": "Iteration", "iid": iteration, "iterationSetup": Iid::new(),
        })));
        let scalar_type = Iid::new();
        let compound_type = Iid::new();
        Self {
            graph,
            components: HashMap::from([(scalar_type, 1), (compound_type, 3)]),
            scalar_type,
            compound_type,
            iteration,
            owner: Iid::new(),
            pending: Delta::default(),
        }
    }

    // ---------------------------------------------------------------
    // Staging
    // ---------------------------------------------------------------

    pub fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::Create { container, thing } => self.create(container, thing, None),
            Mutation::Replace(thing) => {
                self.pending.mark_updated(thing.iid());
                self.graph.insert(None, thing);
            }
            Mutation::Delete(iid) => self.delete(iid),
        }
    }

    fn create(&mut self, container: Iid, thing: Thing, key: Option<i64>) {
        let iid = thing.iid();
        let kind = thing.class_kind();
        self.graph
            .get_mut(&container)
            .unwrap()
            .add_child(kind, iid, key)
            .unwrap();
        self.graph.insert(Some(container), thing);
        self.pending.mark_created(iid);
        self.pending.mark_updated(container);
    }

    fn modify(&mut self, iid: Iid, f: impl FnOnce(&mut Thing)) {
        f(self.graph.get_mut(&iid).unwrap());
        self.pending.mark_updated(iid);
    }

    pub fn delete(&mut self, iid: Iid) {
        if !self.graph.contains(&iid) {
            return;
        }
        let kind = self.graph.get(&iid).unwrap().class_kind();
        if let Some(container) = self.graph.container_of(&iid) {
            self.modify(container, |c| {
                c.remove_child(kind, &iid);
            });
        }
        let mut doomed = self.graph.descendants(&iid);
        doomed.push(iid);
        for id in &doomed {
            self.graph.remove(id);
            self.pending.mark_deleted(*id);
        }
        for id in doomed {
            for (holder, reference) in self.graph.referrers(&id) {
                match reference.strength {
                    RefStrength::Strong => self.delete(holder),
                    RefStrength::Weak => self.modify(holder, |t| {
                        t.drop_reference(&id);
                    }),
                    RefStrength::Derived => {}
                }
            }
        }
    }

    /// Runs the invariants to a fixpoint and returns the number of rounds.
    pub fn settle(&mut self) -> usize {
        self.try_settle().unwrap()
    }

    pub fn try_settle(&mut self) -> Result<usize, EngineError> {
        for round in 0..MAX_ROUNDS {
            let delta = std::mem::take(&mut self.pending);
            let mutations = apply_invariants(&self.graph, &delta, &self.components)?;
            if mutations.is_empty() {
                return Ok(round);
            }
            for mutation in mutations {
                self.apply(mutation);
            }
        }
        panic!("invariants did not converge in {MAX_ROUNDS} rounds");
    }

    // ---------------------------------------------------------------
    // Builders
    // ---------------------------------------------------------------

    pub fn add_option(&mut self, name: &str) -> Iid {
        let iid = Iid::new();
        let thing = parse(json!({"classKind": "Option", "iid": iid, "name": name, "shortName": name}));
        self.create(self.iteration, thing, None);
        iid
    }

    pub fn set_default_option(&mut self, option: Iid) {
        self.modify(self.iteration, |t| {
            if let Thing::Iteration(it) = t {
                it.default_option = Some(option);
            }
        });
    }

    pub fn add_possible_list(&mut self, states: &[&str]) -> Iid {
        let iid = Iid::new();
        let thing = parse(json!({
            "classKind": "PossibleFiniteStateList", "iid": iid,
            "name": "list", "shortName": "list", "owner": self.owner,
        }));
        self.create(self.iteration, thing, None);
        for state in states {
            self.add_possible_state(iid, state);
        }
        iid
    }

    pub fn add_possible_state(&mut self, list: Iid, name: &str) -> Iid {
        let iid = Iid::new();
        let thing = parse(json!({
            "classKind": "PossibleFiniteState", "iid": iid, "name": name, "shortName": name,
        }));
        self.create(list, thing, None);
        iid
    }

    pub fn add_actual_list(&mut self, lists: &[Iid]) -> Iid {
        self.add_actual_list_excluding(lists, &[])
    }

    pub fn add_actual_list_excluding(&mut self, lists: &[Iid], excluded: &[Iid]) -> Iid {
        let iid = Iid::new();
        let items: Vec<_> = lists
            .iter()
            .enumerate()
            .map(|(i, l)| json!({"k": i as i64 + 1, "v": l}))
            .collect();
        let thing = parse(json!({
            "classKind": "ActualFiniteStateList", "iid": iid, "owner": self.owner,
            "possibleFiniteStateList": items, "excludeOption": excluded,
        }));
        self.create(self.iteration, thing, None);
        iid
    }

    pub fn append_to_actual_list(&mut self, afsl: Iid, pfsl: Iid) {
        self.modify(afsl, |t| {
            if let Thing::ActualFiniteStateList(l) = t {
                l.possible_finite_state_list.append(pfsl).unwrap();
            }
        });
    }

    pub fn reorder_actual_list(&mut self, afsl: Iid, moves: &[(Iid, i64)]) {
        self.modify(afsl, |t| {
            if let Thing::ActualFiniteStateList(l) = t {
                l.possible_finite_state_list.reorder_many(moves).unwrap();
            }
        });
    }

    pub fn add_element(&mut self, name: &str) -> Iid {
        let iid = Iid::new();
        let thing = parse(json!({
            "classKind": "ElementDefinition", "iid": iid,
            "name": name, "shortName": name.to_lowercase(), "owner": self.owner,
        }));
        self.create(self.iteration, thing, None);
        iid
    }

    pub fn add_usage(&mut self, definition: Iid) -> Iid {
        let container = self.add_element("Assembly");
        let iid = Iid::new();
        let thing = parse(json!({
            "classKind": "ElementUsage", "iid": iid, "name": "use", "shortName": "use",
            "owner": self.owner, "elementDefinition": definition,
        }));
        self.create(container, thing, None);
        iid
    }

    pub fn add_parameter(&mut self, element: Iid, parameter_type: Iid) -> Iid {
        let iid = Iid::new();
        let thing = parse(json!({
            "classKind": "Parameter", "iid": iid, "owner": self.owner,
            "parameterType": parameter_type,
        }));
        self.create(element, thing, None);
        iid
    }

    pub fn update_parameter(&mut self, parameter: Iid, f: impl FnOnce(&mut Parameter)) {
        self.modify(parameter, |t| {
            if let Thing::Parameter(p) = t {
                f(p);
            }
        });
    }

    pub fn add_override(&mut self, usage: Iid, parameter: Iid) -> Iid {
        let iid = Iid::new();
        let thing = parse(json!({
            "classKind": "ParameterOverride", "iid": iid, "owner": self.owner,
            "parameter": parameter,
        }));
        self.create(usage, thing, None);
        iid
    }

    pub fn add_subscription(&mut self, container: Iid) -> Iid {
        let iid = Iid::new();
        let thing = parse(json!({
            "classKind": "ParameterSubscription", "iid": iid, "owner": Iid::new(),
        }));
        self.create(container, thing, None);
        iid
    }

    pub fn set_manual(&mut self, value_set: Iid, values: &[&str]) {
        self.modify(value_set, |t| {
            if let Thing::ParameterValueSet(vs) = t {
                vs.manual = values.iter().copied().collect::<ValueArray>();
            }
        });
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    pub fn possible_states(&self, list: Iid) -> Vec<Iid> {
        match self.graph.get(&list) {
            Some(Thing::PossibleFiniteStateList(l)) => l.possible_state.values().collect(),
            _ => Vec::new(),
        }
    }

    pub fn actual_states(&self, afsl: Iid) -> Vec<ActualFiniteState> {
        let Some(Thing::ActualFiniteStateList(list)) = self.graph.get(&afsl) else {
            return Vec::new();
        };
        list.actual_state
            .iter()
            .filter_map(|id| match self.graph.get(id) {
                Some(Thing::ActualFiniteState(s)) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn value_sets(&self, parameter: Iid) -> Vec<ParameterValueSet> {
        self.children_of(parameter)
            .into_iter()
            .filter_map(|t| match t {
                Thing::ParameterValueSet(vs) => Some(vs),
                _ => None,
            })
            .collect()
    }

    pub fn override_value_sets(&self, over: Iid) -> Vec<ParameterOverrideValueSet> {
        self.children_of(over)
            .into_iter()
            .filter_map(|t| match t {
                Thing::ParameterOverrideValueSet(vs) => Some(vs),
                _ => None,
            })
            .collect()
    }

    pub fn subscription_value_sets(&self, sub: Iid) -> Vec<ParameterSubscriptionValueSet> {
        self.children_of(sub)
            .into_iter()
            .filter_map(|t| match t {
                Thing::ParameterSubscriptionValueSet(vs) => Some(vs),
                _ => None,
            })
            .collect()
    }

    fn children_of(&self, iid: Iid) -> Vec<Thing> {
        self.graph
            .get(&iid)
            .map(Thing::children)
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.graph.get(id).cloned())
            .collect()
    }

    /// The AFS of `afsl` are exactly the product of its lists, in list order.
    pub fn assert_product(&self, afsl: Iid) {
        let Some(Thing::ActualFiniteStateList(list)) = self.graph.get(&afsl) else {
            panic!("no actual finite state list {afsl}");
        };
        let components: Vec<Vec<Iid>> = list
            .possible_finite_state_list
            .values()
            .map(|l| self.possible_states(l))
            .collect();
        let expected: BTreeSet<Vec<Iid>> = cartesian(&components).into_iter().collect();
        let actual: Vec<Vec<Iid>> = self
            .actual_states(afsl)
            .into_iter()
            .map(|s| s.possible_state)
            .collect();
        assert_eq!(actual.len(), expected.len(), "duplicate or missing states");
        assert_eq!(actual.into_iter().collect::<BTreeSet<_>>(), expected);
    }
}
