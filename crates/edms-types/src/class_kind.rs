use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The partition a class of Thing lives in.
///
/// Each partition has its own revision counter and its own write lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionKind {
    SiteDirectory,
    EngineeringModel,
}

/// Closed tag identifying the variant of a Thing.
///
/// Serializes as the bare class name (e.g. `"ActualFiniteState"`), which is
/// the value carried in the `classKind` field of every serialized Thing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassKind {
    // Site directory
    SiteDirectory,
    DomainOfExpertise,
    Person,
    ParameterType,
    EngineeringModelSetup,
    IterationSetup,
    Participant,
    // Engineering model
    EngineeringModel,
    Iteration,
    Option,
    ElementDefinition,
    ElementUsage,
    Parameter,
    ParameterOverride,
    ParameterSubscription,
    ParameterValueSet,
    ParameterOverrideValueSet,
    ParameterSubscriptionValueSet,
    PossibleFiniteStateList,
    PossibleFiniteState,
    ActualFiniteStateList,
    ActualFiniteState,
    DiagramCanvas,
    DomainFileStore,
    Folder,
    File,
    FileRevision,
}

impl ClassKind {
    /// Every class kind, in declaration order.
    pub const ALL: [ClassKind; 27] = [
        Self::SiteDirectory,
        Self::DomainOfExpertise,
        Self::Person,
        Self::ParameterType,
        Self::EngineeringModelSetup,
        Self::IterationSetup,
        Self::Participant,
        Self::EngineeringModel,
        Self::Iteration,
        Self::Option,
        Self::ElementDefinition,
        Self::ElementUsage,
        Self::Parameter,
        Self::ParameterOverride,
        Self::ParameterSubscription,
        Self::ParameterValueSet,
        Self::ParameterOverrideValueSet,
        Self::ParameterSubscriptionValueSet,
        Self::PossibleFiniteStateList,
        Self::PossibleFiniteState,
        Self::ActualFiniteStateList,
        Self::ActualFiniteState,
        Self::DiagramCanvas,
        Self::DomainFileStore,
        Self::Folder,
        Self::File,
        Self::FileRevision,
    ];

    /// The class name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SiteDirectory => "SiteDirectory",
            Self::DomainOfExpertise => "DomainOfExpertise",
            Self::Person => "Person",
            Self::ParameterType => "ParameterType",
            Self::EngineeringModelSetup => "EngineeringModelSetup",
            Self::IterationSetup => "IterationSetup",
            Self::Participant => "Participant",
            Self::EngineeringModel => "EngineeringModel",
            Self::Iteration => "Iteration",
            Self::Option => "Option",
            Self::ElementDefinition => "ElementDefinition",
            Self::ElementUsage => "ElementUsage",
            Self::Parameter => "Parameter",
            Self::ParameterOverride => "ParameterOverride",
            Self::ParameterSubscription => "ParameterSubscription",
            Self::ParameterValueSet => "ParameterValueSet",
            Self::ParameterOverrideValueSet => "ParameterOverrideValueSet",
            Self::ParameterSubscriptionValueSet => "ParameterSubscriptionValueSet",
            Self::PossibleFiniteStateList => "PossibleFiniteStateList",
            Self::PossibleFiniteState => "PossibleFiniteState",
            Self::ActualFiniteStateList => "ActualFiniteStateList",
            Self::ActualFiniteState => "ActualFiniteState",
            Self::DiagramCanvas => "DiagramCanvas",
            Self::DomainFileStore => "DomainFileStore",
            Self::Folder => "Folder",
            Self::File => "File",
            Self::FileRevision => "FileRevision",
        }
    }

    /// The partition instances of this class are stored in.
    pub fn partition(&self) -> PartitionKind {
        match self {
            Self::SiteDirectory
            | Self::DomainOfExpertise
            | Self::Person
            | Self::ParameterType
            | Self::EngineeringModelSetup
            | Self::IterationSetup
            | Self::Participant => PartitionKind::SiteDirectory,
            _ => PartitionKind::EngineeringModel,
        }
    }

    /// Returns `true` for the three value-set classes.
    pub fn is_value_set(&self) -> bool {
        matches!(
            self,
            Self::ParameterValueSet
                | Self::ParameterOverrideValueSet
                | Self::ParameterSubscriptionValueSet
        )
    }

    /// Returns `true` for classes whose instances are only ever produced by
    /// the synchronization engines, never by a client create.
    pub fn is_derived(&self) -> bool {
        self.is_value_set() || matches!(self, Self::ActualFiniteState)
    }
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TypeError::UnknownClassKind(s.to_string()))
    }
}
