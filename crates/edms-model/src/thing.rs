//! The closed `Thing` enum and the structural accessors shared by every class.

use serde::{Deserialize, Serialize};

use edms_types::{ClassKind, Iid, OrderedCollection, RevisionNumber};

use crate::error::ModelError;
use crate::things::*;

/// Any persisted object of the store.
///
/// Serialized with an internal `classKind` tag next to the class fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "classKind")]
pub enum Thing {
    SiteDirectory(SiteDirectory),
    DomainOfExpertise(DomainOfExpertise),
    Person(Person),
    ParameterType(ParameterType),
    EngineeringModelSetup(EngineeringModelSetup),
    IterationSetup(IterationSetup),
    Participant(Participant),
    EngineeringModel(EngineeringModel),
    Iteration(Iteration),
    Option(ModelOption),
    ElementDefinition(ElementDefinition),
    ElementUsage(ElementUsage),
    Parameter(Parameter),
    ParameterOverride(ParameterOverride),
    ParameterSubscription(ParameterSubscription),
    ParameterValueSet(ParameterValueSet),
    ParameterOverrideValueSet(ParameterOverrideValueSet),
    ParameterSubscriptionValueSet(ParameterSubscriptionValueSet),
    PossibleFiniteStateList(PossibleFiniteStateList),
    PossibleFiniteState(PossibleFiniteState),
    ActualFiniteStateList(ActualFiniteStateList),
    ActualFiniteState(ActualFiniteState),
    DiagramCanvas(DiagramCanvas),
    DomainFileStore(DomainFileStore),
    Folder(Folder),
    File(File),
    FileRevision(FileRevision),
}

/// Runs `$body` with `$t` bound to the inner struct of any variant.
macro_rules! with_inner {
    ($thing:expr, $t:ident => $body:expr) => {
        match $thing {
            Thing::SiteDirectory($t) => $body,
            Thing::DomainOfExpertise($t) => $body,
            Thing::Person($t) => $body,
            Thing::ParameterType($t) => $body,
            Thing::EngineeringModelSetup($t) => $body,
            Thing::IterationSetup($t) => $body,
            Thing::Participant($t) => $body,
            Thing::EngineeringModel($t) => $body,
            Thing::Iteration($t) => $body,
            Thing::Option($t) => $body,
            Thing::ElementDefinition($t) => $body,
            Thing::ElementUsage($t) => $body,
            Thing::Parameter($t) => $body,
            Thing::ParameterOverride($t) => $body,
            Thing::ParameterSubscription($t) => $body,
            Thing::ParameterValueSet($t) => $body,
            Thing::ParameterOverrideValueSet($t) => $body,
            Thing::ParameterSubscriptionValueSet($t) => $body,
            Thing::PossibleFiniteStateList($t) => $body,
            Thing::PossibleFiniteState($t) => $body,
            Thing::ActualFiniteStateList($t) => $body,
            Thing::ActualFiniteState($t) => $body,
            Thing::DiagramCanvas($t) => $body,
            Thing::DomainFileStore($t) => $body,
            Thing::Folder($t) => $body,
            Thing::File($t) => $body,
            Thing::FileRevision($t) => $body,
        }
    };
}

/// How strongly a reference binds its holder to the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefStrength {
    /// Deleting the target deletes the holder.
    Strong,
    /// Deleting the target clears the reference on the holder.
    Weak,
    /// Maintained by the synchronization engines.
    Derived,
}

/// A non-containment reference held by a Thing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reference {
    /// Wire name of the holding field.
    pub field: &'static str,
    pub target: Iid,
    pub strength: RefStrength,
}

impl Reference {
    fn new(field: &'static str, target: Iid, strength: RefStrength) -> Self {
        Self {
            field,
            target,
            strength,
        }
    }
}

/// Mutable handle on the field of a container that holds one kind of child.
pub enum ChildSlot<'a> {
    Unordered(&'a mut Vec<Iid>),
    Ordered(&'a mut OrderedCollection),
}

impl Thing {
    pub fn iid(&self) -> Iid {
        with_inner!(self, t => t.iid)
    }

    pub fn revision_number(&self) -> RevisionNumber {
        with_inner!(self, t => t.revision_number)
    }

    pub fn set_revision_number(&mut self, revision: RevisionNumber) {
        with_inner!(self, t => t.revision_number = revision)
    }

    pub fn class_kind(&self) -> ClassKind {
        match self {
            Thing::SiteDirectory(_) => ClassKind::SiteDirectory,
            Thing::DomainOfExpertise(_) => ClassKind::DomainOfExpertise,
            Thing::Person(_) => ClassKind::Person,
            Thing::ParameterType(_) => ClassKind::ParameterType,
            Thing::EngineeringModelSetup(_) => ClassKind::EngineeringModelSetup,
            Thing::IterationSetup(_) => ClassKind::IterationSetup,
            Thing::Participant(_) => ClassKind::Participant,
            Thing::EngineeringModel(_) => ClassKind::EngineeringModel,
            Thing::Iteration(_) => ClassKind::Iteration,
            Thing::Option(_) => ClassKind::Option,
            Thing::ElementDefinition(_) => ClassKind::ElementDefinition,
            Thing::ElementUsage(_) => ClassKind::ElementUsage,
            Thing::Parameter(_) => ClassKind::Parameter,
            Thing::ParameterOverride(_) => ClassKind::ParameterOverride,
            Thing::ParameterSubscription(_) => ClassKind::ParameterSubscription,
            Thing::ParameterValueSet(_) => ClassKind::ParameterValueSet,
            Thing::ParameterOverrideValueSet(_) => ClassKind::ParameterOverrideValueSet,
            Thing::ParameterSubscriptionValueSet(_) => ClassKind::ParameterSubscriptionValueSet,
            Thing::PossibleFiniteStateList(_) => ClassKind::PossibleFiniteStateList,
            Thing::PossibleFiniteState(_) => ClassKind::PossibleFiniteState,
            Thing::ActualFiniteStateList(_) => ClassKind::ActualFiniteStateList,
            Thing::ActualFiniteState(_) => ClassKind::ActualFiniteState,
            Thing::DiagramCanvas(_) => ClassKind::DiagramCanvas,
            Thing::DomainFileStore(_) => ClassKind::DomainFileStore,
            Thing::Folder(_) => ClassKind::Folder,
            Thing::File(_) => ClassKind::File,
            Thing::FileRevision(_) => ClassKind::FileRevision,
        }
    }

    pub fn excluded_domain(&self) -> &[Iid] {
        with_inner!(self, t => &t.excluded_domain[..])
    }

    pub fn excluded_person(&self) -> &[Iid] {
        with_inner!(self, t => &t.excluded_person[..])
    }

    /// The owning domain, for classes that carry one directly.
    pub fn owner(&self) -> Option<Iid> {
        match self {
            Thing::ElementDefinition(t) => Some(t.owner),
            Thing::ElementUsage(t) => Some(t.owner),
            Thing::Parameter(t) => Some(t.owner),
            Thing::ParameterOverride(t) => Some(t.owner),
            Thing::ParameterSubscription(t) => Some(t.owner),
            Thing::PossibleFiniteStateList(t) => Some(t.owner),
            Thing::ActualFiniteStateList(t) => Some(t.owner),
            Thing::DiagramCanvas(t) => t.owner,
            Thing::DomainFileStore(t) => Some(t.owner),
            Thing::Folder(t) => Some(t.owner),
            Thing::File(t) => Some(t.owner),
            _ => None,
        }
    }

    pub fn locked_by(&self) -> Option<Iid> {
        match self {
            Thing::DiagramCanvas(t) => t.locked_by,
            Thing::File(t) => t.locked_by,
            _ => None,
        }
    }

    /// `isHidden` only takes effect while the Thing is locked.
    pub fn is_hidden(&self) -> bool {
        match self {
            Thing::DiagramCanvas(t) => t.is_hidden && t.locked_by.is_some(),
            _ => false,
        }
    }

    /// Iids of every directly contained Thing.
    pub fn children(&self) -> Vec<Iid> {
        let mut out = Vec::new();
        match self {
            Thing::SiteDirectory(t) => {
                out.extend(&t.domain);
                out.extend(&t.person);
                out.extend(&t.parameter_type);
                out.extend(&t.model);
            }
            Thing::EngineeringModelSetup(t) => {
                out.extend(&t.iteration_setup);
                out.extend(&t.participant);
            }
            Thing::EngineeringModel(t) => out.extend(&t.iteration),
            Thing::Iteration(t) => {
                out.extend(t.option.values());
                out.extend(&t.element);
                out.extend(&t.possible_finite_state_list);
                out.extend(&t.actual_finite_state_list);
                out.extend(&t.domain_file_store);
                out.extend(&t.diagram_canvas);
            }
            Thing::ElementDefinition(t) => {
                out.extend(&t.parameter);
                out.extend(&t.contained_element);
            }
            Thing::ElementUsage(t) => out.extend(&t.parameter_override),
            Thing::Parameter(t) => {
                out.extend(&t.value_set);
                out.extend(&t.parameter_subscription);
            }
            Thing::ParameterOverride(t) => {
                out.extend(&t.value_set);
                out.extend(&t.parameter_subscription);
            }
            Thing::ParameterSubscription(t) => out.extend(&t.value_set),
            Thing::PossibleFiniteStateList(t) => out.extend(t.possible_state.values()),
            Thing::ActualFiniteStateList(t) => out.extend(&t.actual_state),
            Thing::DomainFileStore(t) => {
                out.extend(&t.folder);
                out.extend(&t.file);
            }
            Thing::File(t) => out.extend(&t.file_revision),
            Thing::DomainOfExpertise(_)
            | Thing::Person(_)
            | Thing::ParameterType(_)
            | Thing::IterationSetup(_)
            | Thing::Participant(_)
            | Thing::Option(_)
            | Thing::ParameterValueSet(_)
            | Thing::ParameterOverrideValueSet(_)
            | Thing::ParameterSubscriptionValueSet(_)
            | Thing::PossibleFiniteState(_)
            | Thing::ActualFiniteState(_)
            | Thing::DiagramCanvas(_)
            | Thing::Folder(_)
            | Thing::FileRevision(_) => {}
        }
        out
    }

    /// The field of this Thing that contains children of `child`, if any.
    pub fn child_slot(&mut self, child: ClassKind) -> Option<ChildSlot<'_>> {
        use ChildSlot::{Ordered, Unordered};
        let slot = match (self, child) {
            (Thing::SiteDirectory(t), ClassKind::DomainOfExpertise) => Unordered(&mut t.domain),
            (Thing::SiteDirectory(t), ClassKind::Person) => Unordered(&mut t.person),
            (Thing::SiteDirectory(t), ClassKind::ParameterType) => {
                Unordered(&mut t.parameter_type)
            }
            (Thing::SiteDirectory(t), ClassKind::EngineeringModelSetup) => Unordered(&mut t.model),
            (Thing::EngineeringModelSetup(t), ClassKind::IterationSetup) => {
                Unordered(&mut t.iteration_setup)
            }
            (Thing::EngineeringModelSetup(t), ClassKind::Participant) => {
                Unordered(&mut t.participant)
            }
            (Thing::EngineeringModel(t), ClassKind::Iteration) => Unordered(&mut t.iteration),
            (Thing::Iteration(t), ClassKind::Option) => Ordered(&mut t.option),
            (Thing::Iteration(t), ClassKind::ElementDefinition) => Unordered(&mut t.element),
            (Thing::Iteration(t), ClassKind::PossibleFiniteStateList) => {
                Unordered(&mut t.possible_finite_state_list)
            }
            (Thing::Iteration(t), ClassKind::ActualFiniteStateList) => {
                Unordered(&mut t.actual_finite_state_list)
            }
            (Thing::Iteration(t), ClassKind::DomainFileStore) => {
                Unordered(&mut t.domain_file_store)
            }
            (Thing::Iteration(t), ClassKind::DiagramCanvas) => Unordered(&mut t.diagram_canvas),
            (Thing::ElementDefinition(t), ClassKind::Parameter) => Unordered(&mut t.parameter),
            (Thing::ElementDefinition(t), ClassKind::ElementUsage) => {
                Unordered(&mut t.contained_element)
            }
            (Thing::ElementUsage(t), ClassKind::ParameterOverride) => {
                Unordered(&mut t.parameter_override)
            }
            (Thing::Parameter(t), ClassKind::ParameterValueSet) => Unordered(&mut t.value_set),
            (Thing::Parameter(t), ClassKind::ParameterSubscription) => {
                Unordered(&mut t.parameter_subscription)
            }
            (Thing::ParameterOverride(t), ClassKind::ParameterOverrideValueSet) => {
                Unordered(&mut t.value_set)
            }
            (Thing::ParameterOverride(t), ClassKind::ParameterSubscription) => {
                Unordered(&mut t.parameter_subscription)
            }
            (Thing::ParameterSubscription(t), ClassKind::ParameterSubscriptionValueSet) => {
                Unordered(&mut t.value_set)
            }
            (Thing::PossibleFiniteStateList(t), ClassKind::PossibleFiniteState) => {
                Ordered(&mut t.possible_state)
            }
            (Thing::ActualFiniteStateList(t), ClassKind::ActualFiniteState) => {
                Unordered(&mut t.actual_state)
            }
            (Thing::DomainFileStore(t), ClassKind::Folder) => Unordered(&mut t.folder),
            (Thing::DomainFileStore(t), ClassKind::File) => Unordered(&mut t.file),
            (Thing::File(t), ClassKind::FileRevision) => Unordered(&mut t.file_revision),
            _ => return None,
        };
        Some(slot)
    }

    /// Register `child` in this container. Ordered slots take `key`, or append
    /// when it is absent.
    pub fn add_child(
        &mut self,
        child_kind: ClassKind,
        child: Iid,
        key: Option<i64>,
    ) -> Result<(), ModelError> {
        let container = self.class_kind();
        match self.child_slot(child_kind) {
            Some(ChildSlot::Unordered(ids)) => {
                if !ids.contains(&child) {
                    ids.push(child);
                }
                Ok(())
            }
            Some(ChildSlot::Ordered(collection)) => {
                match key {
                    Some(key) => collection.insert(key, child)?,
                    None => {
                        collection.append(child)?;
                    }
                }
                Ok(())
            }
            None => Err(ModelError::InvalidContainment {
                container,
                child: child_kind,
            }),
        }
    }

    /// Unregister `child`. Returns `true` if it was present.
    pub fn remove_child(&mut self, child_kind: ClassKind, child: &Iid) -> bool {
        match self.child_slot(child_kind) {
            Some(ChildSlot::Unordered(ids)) => {
                let before = ids.len();
                ids.retain(|id| id != child);
                ids.len() != before
            }
            Some(ChildSlot::Ordered(collection)) => collection.remove(child).is_some(),
            None => false,
        }
    }

    /// Every same-partition reference this Thing holds, excluding containment.
    pub fn references(&self) -> Vec<Reference> {
        use RefStrength::{Derived, Strong, Weak};
        let mut out = Vec::new();
        let mut push = |field, target: Option<Iid>, strength| {
            if let Some(target) = target {
                out.push(Reference::new(field, target, strength));
            }
        };
        match self {
            Thing::Person(t) => push("defaultDomain", t.default_domain, Weak),
            Thing::ParameterType(t) => {
                for c in t.component.values() {
                    push("component", Some(c), Weak);
                }
            }
            Thing::EngineeringModelSetup(t) => {
                for d in &t.active_domain {
                    push("activeDomain", Some(*d), Weak);
                }
            }
            Thing::IterationSetup(t) => {
                push("sourceIterationSetup", t.source_iteration_setup, Weak)
            }
            Thing::Participant(t) => {
                push("person", Some(t.person), Strong);
                for d in &t.domain {
                    push("domain", Some(*d), Weak);
                }
                push("selectedDomain", t.selected_domain, Weak);
            }
            Thing::Iteration(t) => {
                push("defaultOption", t.default_option, Weak);
                push("topElement", t.top_element, Weak);
            }
            Thing::ElementUsage(t) => {
                push("elementDefinition", Some(t.element_definition), Strong);
                for o in &t.excluded_option {
                    push("excludedOption", Some(*o), Weak);
                }
            }
            Thing::Parameter(t) => push("stateDependence", t.state_dependence, Weak),
            Thing::ParameterOverride(t) => push("parameter", Some(t.parameter), Strong),
            Thing::ParameterValueSet(t) => {
                push("actualOption", t.actual_option, Derived);
                push("actualState", t.actual_state, Derived);
            }
            Thing::ParameterOverrideValueSet(t) => {
                push("parameterValueSet", Some(t.parameter_value_set), Derived)
            }
            Thing::ParameterSubscriptionValueSet(t) => {
                push("subscribedValueSet", Some(t.subscribed_value_set), Derived)
            }
            Thing::PossibleFiniteStateList(t) => push("defaultState", t.default_state, Weak),
            Thing::ActualFiniteStateList(t) => {
                for l in t.possible_finite_state_list.values() {
                    push("possibleFiniteStateList", Some(l), Weak);
                }
                for o in &t.exclude_option {
                    push("excludeOption", Some(*o), Weak);
                }
            }
            Thing::ActualFiniteState(t) => {
                for s in &t.possible_state {
                    push("possibleState", Some(*s), Derived);
                }
            }
            Thing::Folder(t) => push("containingFolder", t.containing_folder, Strong),
            Thing::FileRevision(t) => push("containingFolder", t.containing_folder, Weak),
            Thing::SiteDirectory(_)
            | Thing::DomainOfExpertise(_)
            | Thing::EngineeringModel(_)
            | Thing::Option(_)
            | Thing::ElementDefinition(_)
            | Thing::ParameterSubscription(_)
            | Thing::PossibleFiniteState(_)
            | Thing::DiagramCanvas(_)
            | Thing::DomainFileStore(_)
            | Thing::File(_) => {}
        }
        out
    }

    /// Clear every weak reference to `target`. Returns `true` if anything
    /// changed.
    pub fn drop_reference(&mut self, target: &Iid) -> bool {
        fn clear(slot: &mut Option<Iid>, target: &Iid) -> bool {
            if slot.as_ref() == Some(target) {
                *slot = None;
                true
            } else {
                false
            }
        }
        fn retain(ids: &mut Vec<Iid>, target: &Iid) -> bool {
            let before = ids.len();
            ids.retain(|id| id != target);
            ids.len() != before
        }
        match self {
            Thing::Person(t) => clear(&mut t.default_domain, target),
            Thing::ParameterType(t) => t.component.remove(target).is_some(),
            Thing::EngineeringModelSetup(t) => retain(&mut t.active_domain, target),
            Thing::IterationSetup(t) => clear(&mut t.source_iteration_setup, target),
            Thing::Participant(t) => {
                retain(&mut t.domain, target) | clear(&mut t.selected_domain, target)
            }
            Thing::Iteration(t) => {
                clear(&mut t.default_option, target) | clear(&mut t.top_element, target)
            }
            Thing::ElementUsage(t) => retain(&mut t.excluded_option, target),
            Thing::Parameter(t) => clear(&mut t.state_dependence, target),
            Thing::PossibleFiniteStateList(t) => clear(&mut t.default_state, target),
            Thing::ActualFiniteStateList(t) => {
                t.possible_finite_state_list.remove(target).is_some()
                    | retain(&mut t.exclude_option, target)
            }
            Thing::FileRevision(t) => clear(&mut t.containing_folder, target),
            _ => false,
        }
    }
}
