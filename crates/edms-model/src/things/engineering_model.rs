//! Structural content of an engineering model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use edms_types::{Iid, OrderedCollection, RevisionNumber};

/// Root of an engineering model partition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineeringModel {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub engineering_model_setup: Iid,
    #[serde(default)]
    pub iteration: Vec<Iid>,
}

impl EngineeringModel {
    pub fn new(iid: Iid, engineering_model_setup: Iid) -> Self {
        Self {
            iid,
            revision_number: RevisionNumber::ZERO,
            excluded_domain: Vec::new(),
            excluded_person: Vec::new(),
            engineering_model_setup,
            iteration: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Iteration {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub iteration_setup: Iid,
    #[serde(default)]
    pub option: OrderedCollection,
    #[serde(default)]
    pub default_option: Option<Iid>,
    #[serde(default)]
    pub top_element: Option<Iid>,
    #[serde(default)]
    pub element: Vec<Iid>,
    #[serde(default)]
    pub possible_finite_state_list: Vec<Iid>,
    #[serde(default)]
    pub actual_finite_state_list: Vec<Iid>,
    #[serde(default)]
    pub domain_file_store: Vec<Iid>,
    #[serde(default)]
    pub diagram_canvas: Vec<Iid>,
}

impl Iteration {
    /// An empty iteration described by `iteration_setup`.
    pub fn new(iid: Iid, iteration_setup: Iid) -> Self {
        Self {
            iid,
            revision_number: RevisionNumber::ZERO,
            excluded_domain: Vec::new(),
            excluded_person: Vec::new(),
            iteration_setup,
            option: OrderedCollection::new(),
            default_option: None,
            top_element: None,
            element: Vec::new(),
            possible_finite_state_list: Vec::new(),
            actual_finite_state_list: Vec::new(),
            domain_file_store: Vec::new(),
            diagram_canvas: Vec::new(),
        }
    }
}

/// A design option of an iteration. Serialized with class kind `Option`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelOption {
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
pub struct ElementDefinition {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub name: String,
    pub short_name: String,
    pub owner: Iid,
    #[serde(default)]
    pub parameter: Vec<Iid>,
    #[serde(default)]
    pub contained_element: Vec<Iid>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementUsage {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub name: String,
    pub short_name: String,
    pub owner: Iid,
    pub element_definition: Iid,
    #[serde(default)]
    pub excluded_option: Vec<Iid>,
    #[serde(default)]
    pub parameter_override: Vec<Iid>,
}

/// A diagram that can be locked by a person and hidden from other domains.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramCanvas {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub name: String,
    #[serde(default = "Utc::now")]
    pub created_on: DateTime<Utc>,
    #[serde(default)]
    pub owner: Option<Iid>,
    /// Only meaningful together with `locked_by`.
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub locked_by: Option<Iid>,
}
