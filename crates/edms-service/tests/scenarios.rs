//! End-to-end write and read scenarios against an in-memory service.

use std::io::{Cursor, Read};

use chrono::Utc;
use serde_json::{json, Value};

use edms_model::{IterationSetup, Participant, Patch, Person, Thing};
use edms_service::{
    EdmsService, ModelHandle, ReadOptions, ReadResponse, RevisionSelector, ServiceConfig, ServiceError,
    WriteRequest, WriteResponse,
};
use edms_store::content_hash;
use edms_types::{ActualFiniteStateKind, ClassKind, Iid, RevisionNumber};

fn thing(value: Value) -> Thing {
    serde_json::from_value(value).unwrap()
}

fn rev(n: u64) -> RevisionNumber {
    RevisionNumber(n)
}

/// A bootstrapped site with one domain, two scalar types, a two-component
/// compound type and one model the administrator participates in.
struct Site {
    service: EdmsService,
    sd: Iid,
    admin: Iid,
    domain: Iid,
    scalar: Iid,
    compound: Iid,
    model: ModelHandle,
}

impl Site {
    fn new() -> Self {
        let service = EdmsService::in_memory();
        let boot = service.bootstrap("ACME", "admin").unwrap();
        let sd = boot.site_directory;
        let (domain, length, mass, compound) = (Iid::new(), Iid::new(), Iid::new(), Iid::new());
        service
            .write(
                &boot.admin,
                &sd,
                WriteRequest::new()
                    .create(sd, thing(json!({
                        "classKind": "DomainOfExpertise", "iid": domain,
                        "name": "Power", "shortName": "PWR",
                    })))
                    .create(sd, thing(json!({
                        "classKind": "ParameterType", "iid": length, "name": "length", "shortName": "l",
                    })))
                    .create(sd, thing(json!({
                        "classKind": "ParameterType", "iid": mass, "name": "mass", "shortName": "m",
                    })))
                    .create(sd, thing(json!({
                        "classKind": "ParameterType", "iid": compound, "name": "box", "shortName": "box",
                        "component": [{"k": 1, "v": length}, {"k": 2, "v": mass}],
                    }))),
            )
            .unwrap();
        let model = service
            .create_model(&boot.admin, "Satellite", "SAT", vec![domain])
            .unwrap();
        Self {
            service,
            sd,
            admin: boot.admin,
            domain,
            scalar: length,
            compound,
            model,
        }
    }

    fn write(&self, request: WriteRequest) -> Result<WriteResponse, ServiceError> {
        self.service.write(&self.admin, &self.model.model, request)
    }

    fn get(&self, iid: &Iid) -> Thing {
        self.service
            .read(Some(&self.admin), &self.model.model, iid, &ReadOptions::default())
            .unwrap()
            .things()[0]
            .clone()
    }

    /// Descendants of `iid` of one class.
    fn contents(&self, iid: &Iid, kind: ClassKind) -> Vec<Thing> {
        self.service
            .read(Some(&self.admin), &self.model.model, iid, &ReadOptions::deep())
            .unwrap()
            .things()
            .iter()
            .skip(1)
            .filter(|t| t.class_kind() == kind)
            .cloned()
            .collect()
    }

    fn revision(&self) -> RevisionNumber {
        self.service.revision(&self.model.model).unwrap()
    }

    fn element(&self, iid: Iid, name: &str) -> Thing {
        thing(json!({
            "classKind": "ElementDefinition", "iid": iid,
            "name": name, "shortName": name.to_lowercase(), "owner": self.domain,
        }))
    }

    fn possible_list(&self, iid: Iid) -> Thing {
        thing(json!({
            "classKind": "PossibleFiniteStateList", "iid": iid,
            "name": "mode", "shortName": "mode", "owner": self.domain,
        }))
    }

    fn actual_list(&self, iid: Iid, lists: &[Iid]) -> Thing {
        let items: Vec<Value> = lists
            .iter()
            .enumerate()
            .map(|(i, l)| json!({"k": i as i64 + 1, "v": l}))
            .collect();
        thing(json!({
            "classKind": "ActualFiniteStateList", "iid": iid,
            "owner": self.domain, "possibleFiniteStateList": items,
        }))
    }

    fn parameter(&self, iid: Iid, parameter_type: Iid) -> Thing {
        thing(json!({
            "classKind": "Parameter", "iid": iid,
            "owner": self.domain, "parameterType": parameter_type,
        }))
    }
}

fn state(iid: Iid, name: &str) -> Thing {
    thing(json!({"classKind": "PossibleFiniteState", "iid": iid, "name": name, "shortName": name}))
}

fn actual_states(site: &Site, afsl: &Iid) -> Vec<(Iid, ActualFiniteStateKind, Vec<Iid>)> {
    site.contents(afsl, ClassKind::ActualFiniteState)
        .into_iter()
        .filter_map(|t| match t {
            Thing::ActualFiniteState(s) => Some((s.iid, s.kind, s.possible_state)),
            _ => None,
        })
        .collect()
}

fn set(field: &str, value: Value) -> Patch {
    Patch::default().set(field, value)
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[test]
fn reorder_and_back_restores_keys() {
    let site = Site::new();
    let it = site.model.iteration;
    let (a, b, c) = (Iid::new(), Iid::new(), Iid::new());
    let option = |iid: Iid, name: &str| {
        thing(json!({"classKind": "Option", "iid": iid, "name": name, "shortName": name}))
    };
    site.write(
        WriteRequest::new()
            .create_at(it, 4598335, option(a, "a"))
            .create_at(it, 10, option(b, "b"))
            .create_at(it, 20, option(c, "c")),
    )
    .unwrap();
    let Thing::Iteration(original) = site.get(&it) else { panic!("not an iteration") };
    assert_eq!(original.option.values().collect::<Vec<_>>(), vec![b, c, a]);

    site.write(WriteRequest::new().update(it, set("option", json!([{"k": 30, "v": b}]))))
        .unwrap();
    let Thing::Iteration(moved) = site.get(&it) else { panic!("not an iteration") };
    assert_eq!(moved.option.key_of(&a), Some(4598335));
    assert_eq!(moved.option.key_of(&c), Some(20));
    assert_eq!(moved.option.values().collect::<Vec<_>>(), vec![c, b, a]);

    site.write(WriteRequest::new().update(it, set("option", json!([{"k": 10, "v": b}]))))
        .unwrap();
    let Thing::Iteration(restored) = site.get(&it) else { panic!("not an iteration") };
    assert_eq!(restored.option, original.option);
}

#[test]
fn duplicate_key_is_a_conflict() {
    let site = Site::new();
    let it = site.model.iteration;
    let option = |name: &str| {
        thing(json!({"classKind": "Option", "iid": Iid::new(), "name": name, "shortName": name}))
    };
    site.write(WriteRequest::new().create_at(it, 5, option("a"))).unwrap();
    let err = site
        .write(WriteRequest::new().create_at(it, 5, option("b")))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)), "{err}");
    assert_eq!(err.tag(), "#CONFLICT");
}

// ---------------------------------------------------------------------------
// Finite states
// ---------------------------------------------------------------------------

#[test]
fn new_actual_list_over_one_state() {
    let site = Site::new();
    let it = site.model.iteration;
    let (pfsl, pfs, afsl) = (Iid::new(), Iid::new(), Iid::new());
    let response = site
        .write(
            WriteRequest::new()
                .create(it, site.possible_list(pfsl))
                .create(pfsl, state(pfs, "on"))
                .create(it, site.actual_list(afsl, &[pfsl])),
        )
        .unwrap();
    assert_eq!(response.revision, rev(2));

    let states: Vec<&Thing> = response
        .things
        .iter()
        .filter(|t| t.class_kind() == ClassKind::ActualFiniteState)
        .collect();
    assert_eq!(states.len(), 1);
    let Thing::ActualFiniteState(afs) = states[0] else { unreachable!() };
    assert_eq!(afs.kind, ActualFiniteStateKind::Mandatory);
    assert_eq!(afs.possible_state, vec![pfs]);
    let fields = serde_json::to_value(states[0]).unwrap();
    assert_eq!(fields.as_object().unwrap().len(), 7);

    for iid in [afsl, it, site.model.model] {
        let bumped = response.thing(&iid).expect("bumped container");
        assert_eq!(bumped.revision_number(), rev(2));
    }
}

#[test]
fn adding_a_list_extends_existing_states() {
    let site = Site::new();
    let it = site.model.iteration;
    let (first, a1, afsl) = (Iid::new(), Iid::new(), Iid::new());
    site.write(
        WriteRequest::new()
            .create(it, site.possible_list(first))
            .create(first, state(a1, "a1"))
            .create(it, site.actual_list(afsl, &[first])),
    )
    .unwrap();
    let before = actual_states(&site, &afsl);
    assert_eq!(before.len(), 1);

    let (second, b1, b2) = (Iid::new(), Iid::new(), Iid::new());
    site.write(
        WriteRequest::new()
            .create(it, site.possible_list(second))
            .create(second, state(b1, "b1"))
            .create(second, state(b2, "b2"))
            .update(afsl, set("possibleFiniteStateList", json!([{"k": 2, "v": second}]))),
    )
    .unwrap();

    let after = actual_states(&site, &afsl);
    assert_eq!(after.len(), 2);
    assert!(after.iter().any(|(iid, _, _)| *iid == before[0].0));
    let mut combos: Vec<Vec<Iid>> = after.into_iter().map(|(_, _, s)| s).collect();
    combos.sort();
    let mut expected = vec![vec![a1, b1], vec![a1, b2]];
    expected.sort();
    assert_eq!(combos, expected);
}

#[test]
fn actual_states_stay_a_cartesian_product() {
    let site = Site::new();
    let it = site.model.iteration;
    let (a, b, afsl) = (Iid::new(), Iid::new(), Iid::new());
    let a_states = [Iid::new(), Iid::new()];
    let b_states = [Iid::new(), Iid::new(), Iid::new()];
    let mut request = WriteRequest::new()
        .create(it, site.possible_list(a))
        .create(it, site.possible_list(b));
    for (i, s) in a_states.iter().enumerate() {
        request = request.create(a, state(*s, &format!("a{i}")));
    }
    for (i, s) in b_states.iter().enumerate() {
        request = request.create(b, state(*s, &format!("b{i}")));
    }
    site.write(request.create(it, site.actual_list(afsl, &[a, b]))).unwrap();
    assert_eq!(actual_states(&site, &afsl).len(), 6);

    site.write(WriteRequest::new().create(b, state(Iid::new(), "b3"))).unwrap();
    assert_eq!(actual_states(&site, &afsl).len(), 8);

    site.write(WriteRequest::new().delete(a_states[0])).unwrap();
    let remaining = actual_states(&site, &afsl);
    assert_eq!(remaining.len(), 4);
    assert!(remaining.iter().all(|(_, _, s)| s[0] == a_states[1]));

    // Reordering the lists keeps membership and re-sorts each tuple.
    site.write(WriteRequest::new().update(
        afsl,
        set("possibleFiniteStateList", json!([{"k": 10, "v": a}])),
    ))
    .unwrap();
    let reordered = actual_states(&site, &afsl);
    assert_eq!(reordered.len(), 4);
    assert!(reordered.iter().all(|(_, _, s)| s[1] == a_states[1]));
}

// ---------------------------------------------------------------------------
// Value set fan-out
// ---------------------------------------------------------------------------

#[test]
fn state_dependence_refans_the_whole_chain() {
    let site = Site::new();
    let it = site.model.iteration;
    let (pfsl, afsl) = (Iid::new(), Iid::new());
    let (element, param, assembly, usage, over, sub) =
        (Iid::new(), Iid::new(), Iid::new(), Iid::new(), Iid::new(), Iid::new());
    site.write(
        WriteRequest::new()
            .create(it, site.possible_list(pfsl))
            .create(pfsl, state(Iid::new(), "on"))
            .create(it, site.actual_list(afsl, &[pfsl]))
            .create(it, site.element(element, "Battery"))
            .create(element, site.parameter(param, site.scalar))
            .create(it, site.element(assembly, "Bus"))
            .create(assembly, thing(json!({
                "classKind": "ElementUsage", "iid": usage, "name": "battery", "shortName": "bat",
                "owner": site.domain, "elementDefinition": element,
            })))
            .create(usage, thing(json!({
                "classKind": "ParameterOverride", "iid": over, "owner": site.domain, "parameter": param,
            })))
            .create(param, thing(json!({
                "classKind": "ParameterSubscription", "iid": sub, "owner": site.domain,
            }))),
    )
    .unwrap();
    let initial = site.contents(&param, ClassKind::ParameterValueSet);
    assert_eq!(initial.len(), 1);

    let afs = actual_states(&site, &afsl)[0].0;
    let response = site
        .write(WriteRequest::new().update(param, set("stateDependence", json!(afsl))))
        .unwrap();

    let value_sets: Vec<_> = site
        .contents(&param, ClassKind::ParameterValueSet)
        .into_iter()
        .filter_map(|t| match t {
            Thing::ParameterValueSet(vs) => Some(vs),
            _ => None,
        })
        .collect();
    assert_eq!(value_sets.len(), 1);
    let vs = &value_sets[0];
    assert_ne!(vs.iid, initial[0].iid());
    assert_eq!(vs.actual_state, Some(afs));
    assert_eq!(vs.actual_option, None);
    assert_eq!(vs.manual.0, vec!["-".to_string()]);
    assert!(response.contains(&vs.iid));

    let overrides = site.contents(&over, ClassKind::ParameterOverrideValueSet);
    assert!(matches!(
        overrides.as_slice(),
        [Thing::ParameterOverrideValueSet(o)] if o.parameter_value_set == vs.iid
    ));
    let subscribed = site.contents(&sub, ClassKind::ParameterSubscriptionValueSet);
    assert!(matches!(
        subscribed.as_slice(),
        [Thing::ParameterSubscriptionValueSet(s)] if s.subscribed_value_set == vs.iid
    ));
}

#[test]
fn option_dependence_fans_out_per_option() {
    let site = Site::new();
    let it = site.model.iteration;
    let (element, param) = (Iid::new(), Iid::new());
    let mut request = WriteRequest::new();
    for name in ["a", "b", "c"] {
        request = request.create(it, thing(json!({
            "classKind": "Option", "iid": Iid::new(), "name": name, "shortName": name,
        })));
    }
    site.write(
        request
            .create(it, site.element(element, "Tank"))
            .create(element, site.parameter(param, site.compound)),
    )
    .unwrap();
    site.write(WriteRequest::new().update(param, set("isOptionDependent", json!(true))))
        .unwrap();

    let sets = site.contents(&param, ClassKind::ParameterValueSet);
    assert_eq!(sets.len(), 3);
    for value_set in sets {
        let Thing::ParameterValueSet(vs) = value_set else { unreachable!() };
        assert!(vs.actual_option.is_some());
        assert_eq!(vs.manual.len(), 2);
    }
}

#[test]
fn special_characters_round_trip() {
    let site = Site::new();
    let it = site.model.iteration;
    let (element, param) = (Iid::new(), Iid::new());
    site.write(
        WriteRequest::new()
            .create(it, site.element(element, "Panel"))
            .create(element, site.parameter(param, site.compound)),
    )
    .unwrap();
    let vs = site.contents(&param, ClassKind::ParameterValueSet)[0].iid();

    let tricky = "line one\nline two\t\"quoted\" 'single' \\ back";
    let pair = json!([tricky, "plain"]);
    let patch = Patch::default()
        .set("manual", pair.clone())
        .set("formula", pair.clone())
        .set("computed", pair.clone())
        .set("published", pair.clone())
        .set("reference", json!([tricky, tricky]));
    let response = site.write(WriteRequest::new().update(vs, patch)).unwrap();

    let wire = serde_json::to_string(&response).unwrap();
    let decoded: WriteResponse = serde_json::from_str(&wire).unwrap();
    let Some(Thing::ParameterValueSet(stored)) = decoded.thing(&vs).cloned() else {
        panic!("value set missing from response");
    };
    for array in [&stored.manual, &stored.formula, &stored.computed, &stored.published] {
        assert_eq!(array.0, vec![tricky.to_string(), "plain".to_string()]);
    }
    assert_eq!(stored.reference.0, vec![tricky.to_string(), tricky.to_string()]);
    assert_eq!(site.get(&vs), Thing::ParameterValueSet(stored));
}

#[test]
fn failed_cascade_leaves_the_model_untouched() {
    let site = Site::new();
    let it = site.model.iteration;
    let (pfsl, afsl, element) = (Iid::new(), Iid::new(), Iid::new());
    site.write(
        WriteRequest::new()
            .create(it, site.possible_list(pfsl))
            .create(pfsl, state(Iid::new(), "on"))
            .create(it, site.actual_list(afsl, &[pfsl]))
            .create(it, site.element(element, "Radio")),
    )
    .unwrap();
    let before = site.revision();

    let param = Iid::new();
    let mut conflicting = site.parameter(param, site.scalar);
    if let Thing::Parameter(p) = &mut conflicting {
        p.is_option_dependent = true;
        p.state_dependence = Some(afsl);
    }
    let err = site
        .write(WriteRequest::new().create(element, conflicting))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)), "{err}");
    assert_eq!(site.revision(), before);
    assert!(site.contents(&element, ClassKind::Parameter).is_empty());
}

#[test]
fn parameter_types_are_unique_per_element() {
    let site = Site::new();
    let it = site.model.iteration;
    let element = Iid::new();
    let err = site
        .write(
            WriteRequest::new()
                .create(it, site.element(element, "Battery"))
                .create(element, site.parameter(Iid::new(), site.scalar))
                .create(element, site.parameter(Iid::new(), site.scalar)),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)), "{err}");
    assert_eq!(site.revision(), rev(1));

    site.write(
        WriteRequest::new()
            .create(it, site.element(element, "Battery"))
            .create(element, site.parameter(Iid::new(), site.scalar))
            .create(element, site.parameter(Iid::new(), site.compound)),
    )
    .unwrap();
    let err = site
        .write(WriteRequest::new().create(element, site.parameter(Iid::new(), site.compound)))
        .unwrap_err();
    assert_eq!(err.tag(), "#VALIDATION");
    assert_eq!(site.contents(&element, ClassKind::Parameter).len(), 2);
}

#[test]
fn unknown_parameter_type_is_rejected() {
    let site = Site::new();
    let it = site.model.iteration;
    let element = Iid::new();
    let err = site
        .write(
            WriteRequest::new()
                .create(it, site.element(element, "Battery"))
                .create(element, site.parameter(Iid::new(), Iid::new())),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)), "{err}");
    assert_eq!(err.tag(), "#VALIDATION");
    assert_eq!(site.revision(), rev(1));
}

/// A state-dependent parameter with an override, a subscription on each and
/// the ids needed to follow the chain.
struct Chain {
    param: Iid,
    over: Iid,
    param_sub: Iid,
    over_sub: Iid,
}

fn chain(site: &Site, afsl: Iid) -> Chain {
    let it = site.model.iteration;
    let (element, assembly, usage) = (Iid::new(), Iid::new(), Iid::new());
    let c = Chain { param: Iid::new(), over: Iid::new(), param_sub: Iid::new(), over_sub: Iid::new() };
    let mut parameter = site.parameter(c.param, site.scalar);
    if let Thing::Parameter(p) = &mut parameter {
        p.state_dependence = Some(afsl);
    }
    site.write(
        WriteRequest::new()
            .create(it, site.element(element, "Battery"))
            .create(element, parameter)
            .create(it, site.element(assembly, "Bus"))
            .create(assembly, thing(json!({
                "classKind": "ElementUsage", "iid": usage, "name": "battery", "shortName": "bat",
                "owner": site.domain, "elementDefinition": element,
            })))
            .create(usage, thing(json!({
                "classKind": "ParameterOverride", "iid": c.over, "owner": site.domain,
                "parameter": c.param,
            })))
            .create(c.param, thing(json!({
                "classKind": "ParameterSubscription", "iid": c.param_sub, "owner": site.domain,
            })))
            .create(c.over, thing(json!({
                "classKind": "ParameterSubscription", "iid": c.over_sub, "owner": site.domain,
            }))),
    )
    .unwrap();
    c
}

/// Checks every link of the chain against the current actual states and
/// returns the number of value sets at each level.
fn assert_chain_matches(site: &Site, afsl: &Iid, c: &Chain) -> [usize; 4] {
    let states: Vec<Iid> = actual_states(site, afsl).into_iter().map(|(iid, _, _)| iid).collect();
    let sets: Vec<(Iid, Option<Iid>)> = site
        .contents(&c.param, ClassKind::ParameterValueSet)
        .into_iter()
        .filter_map(|t| match t {
            Thing::ParameterValueSet(vs) => Some((vs.iid, vs.actual_state)),
            _ => None,
        })
        .collect();
    let mut keyed: Vec<Iid> = sets.iter().filter_map(|(_, state)| *state).collect();
    keyed.sort();
    let mut expected = states.clone();
    expected.sort();
    assert_eq!(keyed, expected);

    let over_sets: Vec<(Iid, Iid)> = site
        .contents(&c.over, ClassKind::ParameterOverrideValueSet)
        .into_iter()
        .filter_map(|t| match t {
            Thing::ParameterOverrideValueSet(o) => Some((o.iid, o.parameter_value_set)),
            _ => None,
        })
        .collect();
    assert!(over_sets.iter().all(|(_, pvs)| sets.iter().any(|(iid, _)| iid == pvs)));

    let subscribed = |sub: &Iid| -> Vec<Iid> {
        site.contents(sub, ClassKind::ParameterSubscriptionValueSet)
            .into_iter()
            .filter_map(|t| match t {
                Thing::ParameterSubscriptionValueSet(s) => Some(s.subscribed_value_set),
                _ => None,
            })
            .collect()
    };
    let param_subs = subscribed(&c.param_sub);
    assert!(param_subs.iter().all(|vs| sets.iter().any(|(iid, _)| iid == vs)));
    let over_subs = subscribed(&c.over_sub);
    assert!(over_subs.iter().all(|vs| over_sets.iter().any(|(iid, _)| iid == vs)));

    [sets.len(), over_sets.len(), param_subs.len(), over_subs.len()]
}

#[test]
fn deleting_a_whole_possible_list_shrinks_the_chain() {
    let site = Site::new();
    let it = site.model.iteration;
    let (first, second, afsl) = (Iid::new(), Iid::new(), Iid::new());
    site.write(
        WriteRequest::new()
            .create(it, site.possible_list(first))
            .create(first, state(Iid::new(), "a1"))
            .create(first, state(Iid::new(), "a2"))
            .create(it, site.possible_list(second))
            .create(second, state(Iid::new(), "b1"))
            .create(second, state(Iid::new(), "b2"))
            .create(it, site.actual_list(afsl, &[first, second])),
    )
    .unwrap();
    let c = chain(&site, afsl);
    assert_eq!(assert_chain_matches(&site, &afsl, &c), [4, 4, 4, 4]);

    site.write(WriteRequest::new().delete(second)).unwrap();
    assert_eq!(actual_states(&site, &afsl).len(), 2);
    assert_eq!(assert_chain_matches(&site, &afsl, &c), [2, 2, 2, 2]);
    let Thing::ActualFiniteStateList(list) = site.get(&afsl) else { panic!("not a list") };
    assert_eq!(list.possible_finite_state_list.values().collect::<Vec<_>>(), vec![first]);
}

#[test]
fn removed_actual_states_take_their_value_sets_along() {
    let site = Site::new();
    let it = site.model.iteration;
    let (pfsl, afsl, on, off) = (Iid::new(), Iid::new(), Iid::new(), Iid::new());
    site.write(
        WriteRequest::new()
            .create(it, site.possible_list(pfsl))
            .create(pfsl, state(on, "on"))
            .create(pfsl, state(off, "off"))
            .create(it, site.actual_list(afsl, &[pfsl])),
    )
    .unwrap();
    let c = chain(&site, afsl);
    let doomed = actual_states(&site, &afsl)
        .into_iter()
        .find(|(_, _, states)| states == &vec![off])
        .map(|(iid, _, _)| iid)
        .unwrap();

    let response = site.write(WriteRequest::new().delete(off)).unwrap();
    assert!(!response.contains(&doomed));
    assert_eq!(actual_states(&site, &afsl).len(), 1);
    assert_eq!(assert_chain_matches(&site, &afsl, &c), [1, 1, 1, 1]);
    let gone = site
        .service
        .read(Some(&site.admin), &site.model.model, &doomed, &ReadOptions::default())
        .unwrap_err();
    assert!(matches!(gone, ServiceError::NotFound(_)), "{gone}");
}

#[test]
fn dependence_change_alongside_a_list_reorder() {
    let site = Site::new();
    let it = site.model.iteration;
    let (a, b, afsl, element, param) = (Iid::new(), Iid::new(), Iid::new(), Iid::new(), Iid::new());
    site.write(
        WriteRequest::new()
            .create(it, site.possible_list(a))
            .create(a, state(Iid::new(), "on"))
            .create(it, site.possible_list(b))
            .create(b, state(Iid::new(), "hot"))
            .create(it, site.actual_list(afsl, &[a, b]))
            .create(it, site.element(element, "Battery"))
            .create(element, site.parameter(param, site.scalar)),
    )
    .unwrap();

    site.write(
        WriteRequest::new()
            .update(afsl, set("possibleFiniteStateList", json!([{"k": 10, "v": a}])))
            .update(param, set("stateDependence", json!(afsl))),
    )
    .unwrap();

    let afs = actual_states(&site, &afsl)[0].0;
    let keys: Vec<(Option<Iid>, Option<Iid>)> = site
        .contents(&param, ClassKind::ParameterValueSet)
        .into_iter()
        .filter_map(|t| match t {
            Thing::ParameterValueSet(vs) => Some((vs.actual_option, vs.actual_state)),
            _ => None,
        })
        .collect();
    assert_eq!(keys, vec![(None, Some(afs))]);
}

// ---------------------------------------------------------------------------
// Revisions
// ---------------------------------------------------------------------------

#[test]
fn only_touched_things_are_bumped() {
    let site = Site::new();
    let it = site.model.iteration;
    let (x, y) = (Iid::new(), Iid::new());
    let created = site
        .write(
            WriteRequest::new()
                .create(it, site.element(x, "X"))
                .create(it, site.element(y, "Y")),
        )
        .unwrap();
    assert_eq!(created.revision, rev(2));

    let response = site
        .write(WriteRequest::new().update(x, set("name", json!("X2"))))
        .unwrap();
    assert_eq!(response.revision, rev(3));
    assert!(!response.contains(&y));
    for iid in [x, it, site.model.model] {
        assert_eq!(response.thing(&iid).unwrap().revision_number(), rev(3));
    }
    assert_eq!(site.get(&y).revision_number(), rev(2));

    site.service
        .read(Some(&site.admin), &site.model.model, &it, &ReadOptions::deep())
        .unwrap();
    assert_eq!(site.revision(), rev(3));
}

#[test]
fn empty_and_no_op_writes_commit_nothing() {
    let site = Site::new();
    let before = site.revision();
    let response = site.write(WriteRequest::new()).unwrap();
    assert_eq!(response.revision, before);
    assert!(response.things.is_empty());

    let it = site.model.iteration;
    let response = site
        .write(WriteRequest::new().update(it, set("option", json!([]))))
        .unwrap();
    assert!(response.things.is_empty());
    assert_eq!(site.revision(), before);
}

#[test]
fn revision_range_returns_each_state() {
    let site = Site::new();
    let it = site.model.iteration;
    let (element, param) = (Iid::new(), Iid::new());
    let created = site
        .write(
            WriteRequest::new()
                .create(it, site.element(element, "Heater"))
                .create(element, site.parameter(param, site.scalar)),
        )
        .unwrap();
    let vs = site.contents(&param, ClassKind::ParameterValueSet)[0].iid();
    site.write(WriteRequest::new().update(vs, set("manual", json!(["1"])))).unwrap();
    site.write(WriteRequest::new().update(vs, set("manual", json!(["2"])))).unwrap();

    let read = |options: ReadOptions| {
        site.service
            .read(Some(&site.admin), &site.model.model, &vs, &options)
            .unwrap()
    };
    let all = read(ReadOptions::revisions(
        RevisionSelector::Number(created.revision),
        Some(RevisionSelector::At(Utc::now())),
    ));
    let manuals: Vec<String> = all
        .things()
        .iter()
        .map(|t| match t {
            Thing::ParameterValueSet(v) => v.manual.0[0].clone(),
            other => panic!("unexpected {}", other.class_kind()),
        })
        .collect();
    assert_eq!(manuals, vec!["-", "1", "2"]);

    let tail = read(ReadOptions::revisions(
        RevisionSelector::Number(created.revision.next().next()),
        None,
    ));
    assert_eq!(tail.things().len(), 1);

    let err = site
        .service
        .read(
            Some(&site.admin),
            &site.model.model,
            &vs,
            &ReadOptions::revisions(RevisionSelector::Number(rev(9)), Some(RevisionSelector::Number(rev(3)))),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[test]
fn concurrent_writers_are_serialized() {
    let site = Site::new();
    let it = site.model.iteration;
    let start = site.revision().get();
    std::thread::scope(|scope| {
        for worker in 0..4 {
            let site = &site;
            scope.spawn(move || {
                for n in 0..5 {
                    site.write(WriteRequest::new().create(it, site.element(Iid::new(), &format!("E{worker}{n}"))))
                        .unwrap();
                }
            });
        }
    });
    assert_eq!(site.revision().get(), start + 20);
    assert_eq!(site.contents(&it, ClassKind::ElementDefinition).len(), 20);
    let report = site.service.verify(&site.model.model).unwrap();
    assert!(report.is_valid());
    assert_eq!(
        site.service.revisions(&site.model.model).unwrap().len() as u64,
        site.revision().get()
    );
}

// ---------------------------------------------------------------------------
// Iterations
// ---------------------------------------------------------------------------

#[test]
fn branching_freezes_the_source_iteration() {
    let site = Site::new();
    let it = site.model.iteration;
    let (element, param) = (Iid::new(), Iid::new());
    site.write(
        WriteRequest::new()
            .create(it, site.element(element, "Battery"))
            .create(element, site.parameter(param, site.scalar)),
    )
    .unwrap();

    let setup = Iid::new();
    let response = site
        .service
        .write(
            &site.admin,
            &site.sd,
            WriteRequest::new().create(
                site.model.setup,
                Thing::IterationSetup(IterationSetup::new(setup, 0, Iid::new())),
            ),
        )
        .unwrap();
    let Some(Thing::IterationSetup(created)) = response.thing(&setup) else {
        panic!("iteration setup missing");
    };
    assert_eq!(created.iteration_number, 2);
    assert_eq!(created.source_iteration_setup, Some(site.model.iteration_setup));
    let Some(Thing::IterationSetup(source)) = response.thing(&site.model.iteration_setup) else {
        panic!("source setup not bumped");
    };
    assert!(source.frozen_on.is_some());

    assert_eq!(response.model_commits.len(), 1);
    let branched = created.iteration_iid.unwrap();
    assert!(response.model_commits[0].things.iter().any(|t| t.iid() == branched));

    let copies = site.contents(&branched, ClassKind::ElementDefinition);
    assert_eq!(copies.len(), 1);
    assert_ne!(copies[0].iid(), element);
    assert_eq!(site.contents(&copies[0].iid(), ClassKind::ParameterValueSet).len(), 1);

    let err = site
        .write(WriteRequest::new().update(element, set("name", json!("Cell"))))
        .unwrap_err();
    assert!(matches!(err, ServiceError::FrozenIteration(_)), "{err}");
    assert_eq!(err.tag(), "#FROZEN_ITERATION");
    let err = site
        .write(WriteRequest::new().create(it, site.element(Iid::new(), "Late")))
        .unwrap_err();
    assert_eq!(err.tag(), "#FROZEN_ITERATION");

    // Reads of the frozen iteration still work, and the branch is writable.
    assert_eq!(site.contents(&it, ClassKind::ElementDefinition).len(), 1);
    site.write(WriteRequest::new().update(copies[0].iid(), set("name", json!("Cell"))))
        .unwrap();
}

#[test]
fn deleting_an_iteration_setup_is_soft() {
    let site = Site::new();
    let setup = site.model.iteration_setup;
    site.service
        .write(&site.admin, &site.sd, WriteRequest::new().delete(setup))
        .unwrap();
    let read = site
        .service
        .read(Some(&site.admin), &site.sd, &setup, &ReadOptions::default())
        .unwrap();
    assert!(matches!(&read.things()[0], Thing::IterationSetup(s) if s.is_deleted));
}

#[test]
fn deleting_a_model_setup_retires_the_partition() {
    let site = Site::new();
    site.service
        .write(&site.admin, &site.sd, WriteRequest::new().delete(site.model.setup))
        .unwrap();
    assert!(site.service.model_ids().unwrap().is_empty());
    let err = site
        .service
        .read(Some(&site.admin), &site.model.model, &site.model.iteration, &ReadOptions::default())
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

// ---------------------------------------------------------------------------
// Access control
// ---------------------------------------------------------------------------

/// Adds a second participant acting for another domain.
fn add_colleague(site: &Site) -> Iid {
    let (bob, other_domain, participant) = (Iid::new(), Iid::new(), Iid::new());
    site.service
        .write(
            &site.admin,
            &site.sd,
            WriteRequest::new()
                .create(site.sd, Thing::Person(Person::new(bob, "bob")))
                .create(site.sd, thing(json!({
                    "classKind": "DomainOfExpertise", "iid": other_domain,
                    "name": "Thermal", "shortName": "THE",
                })))
                .create(
                    site.model.setup,
                    Thing::Participant(Participant::new(participant, bob, vec![other_domain])),
                ),
        )
        .unwrap();
    bob
}

#[test]
fn hidden_and_locked_canvas() {
    let site = Site::new();
    let bob = add_colleague(&site);
    let it = site.model.iteration;
    let canvas = Iid::new();
    site.write(WriteRequest::new().create(it, thing(json!({
        "classKind": "DiagramCanvas", "iid": canvas, "name": "layout",
        "owner": site.domain, "isHidden": true, "lockedBy": site.admin,
    }))))
    .unwrap();

    let model = site.model.model;
    let err = site
        .service
        .read(Some(&bob), &model, &canvas, &ReadOptions::default())
        .unwrap_err();
    assert!(matches!(err, ServiceError::Visibility(_)), "{err}");
    assert_eq!(err.status(), 400);

    let err = site
        .service
        .write(&bob, &model, WriteRequest::new().update(canvas, set("name", json!("mine"))))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Authorization(_)), "{err}");
    assert_eq!(err.status(), 401);

    let err = site
        .service
        .read(None, &model, &canvas, &ReadOptions::default())
        .unwrap_err();
    assert!(matches!(err, ServiceError::Visibility(_)));

    // Deep reads leave the hidden canvas out instead of failing.
    let visible = site
        .service
        .read(Some(&bob), &model, &it, &ReadOptions::deep())
        .unwrap();
    assert!(!visible.things().iter().any(|t| t.iid() == canvas));

    assert_eq!(site.get(&canvas).iid(), canvas);
    site.write(WriteRequest::new().update(canvas, set("name", json!("final"))))
        .unwrap();
}

#[test]
fn other_domains_read_but_cannot_modify() {
    let site = Site::new();
    let bob = add_colleague(&site);
    let element = Iid::new();
    site.write(WriteRequest::new().create(site.model.iteration, site.element(element, "Antenna")))
        .unwrap();
    let model = site.model.model;

    site.service
        .read(Some(&bob), &model, &element, &ReadOptions::default().with_containers())
        .unwrap();
    let err = site
        .service
        .write(&bob, &model, WriteRequest::new().delete(element))
        .unwrap_err();
    assert_eq!(err.tag(), "#UNAUTHORIZED");
    assert_eq!(site.contents(&site.model.iteration, ClassKind::ElementDefinition).len(), 1);
}

#[test]
fn unknown_people_are_unauthenticated() {
    let site = Site::new();
    let err = site
        .service
        .write(&Iid::new(), &site.model.model, WriteRequest::new())
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthenticated(_)));
    assert_eq!(err.status(), 401);

    site.service
        .write(
            &site.admin,
            &site.sd,
            WriteRequest::new().create(site.sd, Thing::Person(Person::new(Iid::new(), "carol"))),
        )
        .unwrap();
    let carol = site.service.person_by_short_name("carol").unwrap().unwrap();
    let err = site
        .service
        .read(Some(&carol), &site.model.model, &site.model.iteration, &ReadOptions::default())
        .unwrap_err();
    assert_eq!(err.tag(), "#UNAUTHORIZED");
}

#[test]
fn containers_come_first() {
    let site = Site::new();
    let element = Iid::new();
    site.write(WriteRequest::new().create(site.model.iteration, site.element(element, "Frame")))
        .unwrap();
    let read = site
        .service
        .read(
            Some(&site.admin),
            &site.model.model,
            &element,
            &ReadOptions::default().with_containers(),
        )
        .unwrap();
    let ids: Vec<Iid> = read.things().iter().map(Thing::iid).collect();
    assert_eq!(ids, vec![site.model.model, site.model.iteration, element]);
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[test]
fn file_payloads_and_bundles() {
    let site = Site::new();
    let it = site.model.iteration;
    let (store, docs, empty, file, revision) =
        (Iid::new(), Iid::new(), Iid::new(), Iid::new(), Iid::new());
    let data = b"hello, world".to_vec();
    let hash = content_hash(&data);
    let response = site
        .write(
            WriteRequest::new()
                .create(it, thing(json!({
                    "classKind": "DomainFileStore", "iid": store, "name": "store", "owner": site.domain,
                })))
                .create(store, thing(json!({
                    "classKind": "Folder", "iid": docs, "name": "docs", "owner": site.domain,
                })))
                .create(store, thing(json!({
                    "classKind": "Folder", "iid": empty, "name": "empty", "owner": site.domain,
                })))
                .create(store, thing(json!({"classKind": "File", "iid": file, "owner": site.domain})))
                .create(file, thing(json!({
                    "classKind": "FileRevision", "iid": revision, "name": "readme",
                    "extension": "txt", "contentHash": hash, "containingFolder": docs,
                })))
                .file(hash.clone(), data.clone()),
        )
        .unwrap();
    let Some(Thing::FileRevision(stored)) = response.thing(&revision) else {
        panic!("file revision missing");
    };
    assert_eq!(stored.size, data.len() as u64);
    assert_eq!(stored.creator, Some(site.admin));

    let model = site.model.model;
    let payload = site
        .service
        .read(Some(&site.admin), &model, &file, &ReadOptions::file_data())
        .unwrap();
    assert_eq!(payload, ReadResponse::FileData(data.into()));

    for root in [store, docs] {
        let names = archive_names(&site, &root);
        assert_eq!(names, vec!["docs/readme.txt".to_string()]);
    }
    let ReadResponse::Archive(bytes) = site
        .service
        .read(Some(&site.admin), &model, &docs, &ReadOptions::file_data())
        .unwrap()
    else {
        panic!("expected an archive");
    };
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    let mut content = Vec::new();
    zip.by_name("docs/readme.txt")
        .unwrap()
        .read_to_end(&mut content)
        .unwrap();
    assert_eq!(content, b"hello, world");
    assert!(archive_names(&site, &empty).is_empty());
}

/// Entry names of the zip archive served for a folder or file store.
fn archive_names(site: &Site, root: &Iid) -> Vec<String> {
    let ReadResponse::Archive(bytes) = site
        .service
        .read(Some(&site.admin), &site.model.model, root, &ReadOptions::file_data())
        .unwrap()
    else {
        panic!("expected an archive");
    };
    let zip = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    let mut names: Vec<String> = zip.file_names().map(String::from).collect();
    names.sort();
    names
}

#[test]
fn file_revision_without_content_is_rejected() {
    let site = Site::new();
    let it = site.model.iteration;
    let (store, file) = (Iid::new(), Iid::new());
    let err = site
        .write(
            WriteRequest::new()
                .create(it, thing(json!({
                    "classKind": "DomainFileStore", "iid": store, "name": "store", "owner": site.domain,
                })))
                .create(store, thing(json!({"classKind": "File", "iid": file, "owner": site.domain})))
                .create(file, thing(json!({
                    "classKind": "FileRevision", "iid": Iid::new(), "name": "missing",
                    "contentHash": content_hash(b"never uploaded"),
                }))),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)), "{err}");

    let err = site
        .write(WriteRequest::new().file("00".repeat(32), b"mismatch".to_vec()))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)), "{err}");
}

#[test]
fn server_maintained_objects_cannot_be_created() {
    let site = Site::new();
    let err = site
        .write(WriteRequest::new().create(
            site.model.model,
            thing(json!({"classKind": "Iteration", "iid": Iid::new(), "iterationSetup": Iid::new()})),
        ))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let err = site
        .write(WriteRequest::new().delete(site.model.model))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

// ---------------------------------------------------------------------------
// Storage backends and properties
// ---------------------------------------------------------------------------

#[test]
fn file_payloads_survive_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let service = EdmsService::new(ServiceConfig {
        blob_dir: Some(dir.path().join("blobs")),
        ..Default::default()
    })
    .unwrap();
    let boot = service.bootstrap("ACME", "admin").unwrap();
    let domain = Iid::new();
    service
        .write(
            &boot.admin,
            &boot.site_directory,
            WriteRequest::new().create(boot.site_directory, thing(json!({
                "classKind": "DomainOfExpertise", "iid": domain, "name": "Power", "shortName": "PWR",
            }))),
        )
        .unwrap();
    let model = service.create_model(&boot.admin, "Sat", "SAT", vec![domain]).unwrap();
    let (store, file) = (Iid::new(), Iid::new());
    let data = vec![0u8, 159, 146, 150, 255];
    let hash = content_hash(&data);
    service
        .write(
            &boot.admin,
            &model.model,
            WriteRequest::new()
                .create(model.iteration, thing(json!({
                    "classKind": "DomainFileStore", "iid": store, "name": "store", "owner": domain,
                })))
                .create(store, thing(json!({"classKind": "File", "iid": file, "owner": domain})))
                .create(file, thing(json!({
                    "classKind": "FileRevision", "iid": Iid::new(), "name": "raw", "contentHash": hash,
                })))
                .file(hash.clone(), data.clone()),
        )
        .unwrap();

    let reopened = edms_store::FsBlobStore::open(dir.path().join("blobs")).unwrap();
    assert!(edms_store::BlobStore::get(&reopened, &hash).unwrap().is_some());
    let payload = service
        .read(Some(&boot.admin), &model.model, &file, &ReadOptions::file_data())
        .unwrap();
    assert_eq!(payload, ReadResponse::FileData(data.into()));
}

#[test]
fn rejected_writes_store_no_payloads() {
    let dir = tempfile::tempdir().unwrap();
    let service = EdmsService::new(ServiceConfig {
        blob_dir: Some(dir.path().join("blobs")),
        ..Default::default()
    })
    .unwrap();
    let boot = service.bootstrap("ACME", "admin").unwrap();
    let model = service.create_model(&boot.admin, "Sat", "SAT", Vec::new()).unwrap();
    let data = b"never committed".to_vec();
    let hash = content_hash(&data);

    let err = service
        .write(
            &boot.admin,
            &model.model,
            WriteRequest::new().delete(Iid::new()).file(hash.clone(), data),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)), "{err}");
    let blobs = edms_store::FsBlobStore::open(dir.path().join("blobs")).unwrap();
    assert!(edms_store::BlobStore::get(&blobs, &hash).unwrap().is_none());
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn value_sets_cover_every_state_combination(a in 1usize..4, b in 1usize..4) {
            let site = Site::new();
            let it = site.model.iteration;
            let (first, second, afsl, element, param) =
                (Iid::new(), Iid::new(), Iid::new(), Iid::new(), Iid::new());
            let mut request = WriteRequest::new()
                .create(it, site.possible_list(first))
                .create(it, site.possible_list(second));
            for i in 0..a {
                request = request.create(first, state(Iid::new(), &format!("a{i}")));
            }
            for i in 0..b {
                request = request.create(second, state(Iid::new(), &format!("b{i}")));
            }
            let mut parameter = site.parameter(param, site.compound);
            if let Thing::Parameter(p) = &mut parameter {
                p.state_dependence = Some(afsl);
            }
            site.write(
                request
                    .create(it, site.actual_list(afsl, &[first, second]))
                    .create(it, site.element(element, "Battery"))
                    .create(element, parameter),
            )
            .unwrap();

            let states = actual_states(&site, &afsl);
            prop_assert_eq!(states.len(), a * b);
            let value_sets = site.contents(&param, ClassKind::ParameterValueSet);
            prop_assert_eq!(value_sets.len(), a * b);
            for set in &value_sets {
                let Thing::ParameterValueSet(set) = set else { unreachable!() };
                prop_assert_eq!(set.manual.len(), 2);
                prop_assert!(set.manual.is_unset());
                let state = set.actual_state.expect("state-dependent value set");
                prop_assert!(states.iter().any(|(iid, _, _)| *iid == state));
            }
        }
    }
}
