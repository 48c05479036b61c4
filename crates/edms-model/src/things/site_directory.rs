//! Reference data and model setup kept in the site directory partition.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use edms_types::{AccessRight, ClassKind, Iid, OrderedCollection, RevisionNumber};

fn default_true() -> bool {
    true
}

/// Root of the site directory partition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDirectory {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub name: String,
    #[serde(default)]
    pub domain: Vec<Iid>,
    #[serde(default)]
    pub person: Vec<Iid>,
    #[serde(default)]
    pub parameter_type: Vec<Iid>,
    #[serde(default)]
    pub model: Vec<Iid>,
}

impl SiteDirectory {
    pub fn new(iid: Iid, name: impl Into<String>) -> Self {
        Self {
            iid,
            revision_number: RevisionNumber::ZERO,
            excluded_domain: Vec::new(),
            excluded_person: Vec::new(),
            name: name.into(),
            domain: Vec::new(),
            person: Vec::new(),
            parameter_type: Vec::new(),
            model: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainOfExpertise {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub name: String,
    pub short_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub short_name: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub default_domain: Option<Iid>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Site administrators may write to the site directory.
    #[serde(default)]
    pub is_site_admin: bool,
}

impl Person {
    /// An active, non-administrator person.
    pub fn new(iid: Iid, short_name: impl Into<String>) -> Self {
        Self {
            iid,
            revision_number: RevisionNumber::ZERO,
            excluded_domain: Vec::new(),
            excluded_person: Vec::new(),
            short_name: short_name.into(),
            given_name: String::new(),
            surname: String::new(),
            default_domain: None,
            is_active: true,
            is_site_admin: false,
        }
    }
}

/// A quantity, enumeration or compound type a parameter is typed by.
///
/// Scalar types have no components; compound types list their component
/// types in order and carry one value slot per component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterType {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub name: String,
    pub short_name: String,
    #[serde(default)]
    pub component: OrderedCollection,
}

impl ParameterType {
    /// Number of value slots a value array of this type holds.
    pub fn component_count(&self) -> usize {
        self.component.len().max(1)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineeringModelSetup {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub name: String,
    pub short_name: String,
    pub engineering_model_iid: Iid,
    #[serde(default)]
    pub iteration_setup: Vec<Iid>,
    #[serde(default)]
    pub participant: Vec<Iid>,
    #[serde(default)]
    pub active_domain: Vec<Iid>,
}

impl EngineeringModelSetup {
    pub fn new(
        iid: Iid,
        name: impl Into<String>,
        short_name: impl Into<String>,
        engineering_model_iid: Iid,
    ) -> Self {
        Self {
            iid,
            revision_number: RevisionNumber::ZERO,
            excluded_domain: Vec::new(),
            excluded_person: Vec::new(),
            name: name.into(),
            short_name: short_name.into(),
            engineering_model_iid,
            iteration_setup: Vec::new(),
            participant: Vec::new(),
            active_domain: Vec::new(),
        }
    }
}

/// Setup record of one iteration. Soft-deleted, never removed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationSetup {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    #[serde(default)]
    pub iteration_number: u32,
    /// Iid of the Iteration in the engineering model partition.
    #[serde(default)]
    pub iteration_iid: Option<Iid>,
    #[serde(default = "Utc::now")]
    pub created_on: DateTime<Utc>,
    #[serde(default)]
    pub frozen_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub source_iteration_setup: Option<Iid>,
    #[serde(default)]
    pub description: String,
}

impl IterationSetup {
    pub fn new(iid: Iid, iteration_number: u32, iteration_iid: Iid) -> Self {
        Self {
            iid,
            revision_number: RevisionNumber::ZERO,
            excluded_domain: Vec::new(),
            excluded_person: Vec::new(),
            iteration_number,
            iteration_iid: Some(iteration_iid),
            created_on: Utc::now(),
            frozen_on: None,
            is_deleted: false,
            source_iteration_setup: None,
            description: String::new(),
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen_on.is_some()
    }
}

/// Membership of a person in an engineering model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub person: Iid,
    #[serde(default)]
    pub domain: Vec<Iid>,
    #[serde(default)]
    pub selected_domain: Option<Iid>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Per-class grants. Classes without an entry fall back to
    /// [`AccessRight::default`].
    #[serde(default)]
    pub permission: BTreeMap<ClassKind, AccessRight>,
}

impl Participant {
    pub fn new(iid: Iid, person: Iid, domain: Vec<Iid>) -> Self {
        Self {
            iid,
            revision_number: RevisionNumber::ZERO,
            excluded_domain: Vec::new(),
            excluded_person: Vec::new(),
            person,
            selected_domain: domain.first().copied(),
            domain,
            is_active: true,
            permission: BTreeMap::new(),
        }
    }

    pub fn access_right(&self, class_kind: ClassKind) -> AccessRight {
        self.permission.get(&class_kind).copied().unwrap_or_default()
    }
}
