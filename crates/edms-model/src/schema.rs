//! Update semantics of each field, by class.

use edms_types::ClassKind;

/// How a field reacts to the `set` and `remove` parts of an update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldShape {
    /// Replaced wholesale by `set`.
    Scalar,
    /// Unordered reference collection: `set` unions, `remove` subtracts.
    Set,
    /// Ordered references: `set` inserts or re-keys, `remove` subtracts.
    Ordered,
    /// Ordered containment: `set` may only re-key existing members.
    OrderedContainment,
    /// Unordered containment, changed through create and delete only.
    Containment,
    /// Maintained by the synchronization engines.
    Derived,
    /// Fixed at creation.
    Immutable,
}

impl FieldShape {
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Set | Self::Ordered | Self::OrderedContainment)
    }
}

/// Value-array fields of the value-set classes. Their contents are opaque
/// user text and are never interpreted as references.
pub const VALUE_ARRAY_FIELDS: [&str; 5] = ["manual", "computed", "formula", "reference", "published"];

pub fn field_shape(kind: ClassKind, field: &str) -> FieldShape {
    use ClassKind as K;
    use FieldShape::*;

    match field {
        "iid" | "classKind" | "revisionNumber" => return Immutable,
        "excludedDomain" | "excludedPerson" => return Set,
        _ => {}
    }

    match (kind, field) {
        (K::SiteDirectory, "domain" | "person" | "parameterType" | "model") => Containment,
        (K::ParameterType, "component") => Ordered,
        (K::EngineeringModelSetup, "iterationSetup" | "participant") => Containment,
        (K::EngineeringModelSetup, "activeDomain") => Set,
        (K::EngineeringModelSetup, "engineeringModelIid") => Immutable,
        (
            K::IterationSetup,
            "iterationIid" | "iterationNumber" | "sourceIterationSetup" | "createdOn",
        ) => Immutable,
        (K::Participant, "person") => Immutable,
        (K::Participant, "domain") => Set,
        (K::EngineeringModel, "iteration") => Containment,
        (K::EngineeringModel, "engineeringModelSetup") => Immutable,
        (K::Iteration, "iterationSetup") => Immutable,
        (K::Iteration, "option") => OrderedContainment,
        (
            K::Iteration,
            "element"
            | "possibleFiniteStateList"
            | "actualFiniteStateList"
            | "domainFileStore"
            | "diagramCanvas",
        ) => Containment,
        (K::ElementDefinition, "parameter" | "containedElement") => Containment,
        (K::ElementUsage, "parameterOverride") => Containment,
        (K::ElementUsage, "excludedOption") => Set,
        (K::Parameter, "parameterType") => Immutable,
        (K::Parameter | K::ParameterOverride | K::ParameterSubscription, "valueSet") => Derived,
        (K::Parameter | K::ParameterOverride, "parameterSubscription") => Containment,
        (K::ParameterOverride, "parameter") => Immutable,
        (K::ParameterValueSet, "actualOption" | "actualState") => Derived,
        (K::ParameterOverrideValueSet, "parameterValueSet") => Derived,
        (K::ParameterSubscriptionValueSet, "subscribedValueSet") => Derived,
        (K::PossibleFiniteStateList, "possibleState") => OrderedContainment,
        (K::ActualFiniteStateList, "possibleFiniteStateList") => Ordered,
        (K::ActualFiniteStateList, "actualState") => Derived,
        (K::ActualFiniteStateList, "excludeOption") => Set,
        (K::ActualFiniteState, "possibleState") => Derived,
        (K::DomainFileStore, "folder" | "file") => Containment,
        (K::File, "fileRevision") => Containment,
        (K::FileRevision, "contentHash" | "size" | "creator" | "createdOn") => Immutable,
        _ => Scalar,
    }
}
