//! Possible and actual finite states.

use serde::{Deserialize, Serialize};

use edms_types::{ActualFiniteStateKind, Iid, OrderedCollection, RevisionNumber};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PossibleFiniteStateList {
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
    pub possible_state: OrderedCollection,
    #[serde(default)]
    pub default_state: Option<Iid>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PossibleFiniteState {
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
pub struct ActualFiniteStateList {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub owner: Iid,
    #[serde(default)]
    pub possible_finite_state_list: OrderedCollection,
    #[serde(default)]
    pub actual_state: Vec<Iid>,
    #[serde(default)]
    pub exclude_option: Vec<Iid>,
}

/// One combination of possible states, derived from its list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualFiniteState {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    #[serde(default)]
    pub kind: ActualFiniteStateKind,
    #[serde(default)]
    pub possible_state: Vec<Iid>,
}
