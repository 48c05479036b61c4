//! Concrete Thing classes, grouped by concern.

pub mod engineering_model;
pub mod file_store;
pub mod finite_state;
pub mod parameter;
pub mod site_directory;

pub use engineering_model::{
    DiagramCanvas, ElementDefinition, ElementUsage, EngineeringModel, Iteration, ModelOption,
};
pub use file_store::{DomainFileStore, File, FileRevision, Folder};
pub use finite_state::{
    ActualFiniteState, ActualFiniteStateList, PossibleFiniteState, PossibleFiniteStateList,
};
pub use parameter::{
    Parameter, ParameterOverride, ParameterOverrideValueSet, ParameterSubscription,
    ParameterSubscriptionValueSet, ParameterValueSet,
};
pub use site_directory::{
    DomainOfExpertise, EngineeringModelSetup, IterationSetup, Participant, ParameterType, Person,
    SiteDirectory,
};
