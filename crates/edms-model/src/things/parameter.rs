//! Parameters, their overrides and subscriptions, and the value sets the
//! fan-out engine maintains for them.

use serde::{Deserialize, Serialize};

use edms_types::{Iid, RevisionNumber, ValueArray, ValueSwitch};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub owner: Iid,
    pub parameter_type: Iid,
    #[serde(default)]
    pub scale: Option<Iid>,
    #[serde(default)]
    pub is_option_dependent: bool,
    #[serde(default)]
    pub state_dependence: Option<Iid>,
    #[serde(default)]
    pub value_set: Vec<Iid>,
    #[serde(default)]
    pub parameter_subscription: Vec<Iid>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterOverride {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub owner: Iid,
    pub parameter: Iid,
    #[serde(default)]
    pub value_set: Vec<Iid>,
    #[serde(default)]
    pub parameter_subscription: Vec<Iid>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSubscription {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub owner: Iid,
    #[serde(default)]
    pub value_set: Vec<Iid>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterValueSet {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    #[serde(default)]
    pub actual_option: Option<Iid>,
    #[serde(default)]
    pub actual_state: Option<Iid>,
    pub manual: ValueArray,
    pub computed: ValueArray,
    pub formula: ValueArray,
    pub reference: ValueArray,
    pub published: ValueArray,
    #[serde(default)]
    pub value_switch: ValueSwitch,
}

impl ParameterValueSet {
    /// A value set with every array set to the empty sentinel.
    pub fn empty(
        iid: Iid,
        actual_option: Option<Iid>,
        actual_state: Option<Iid>,
        components: usize,
    ) -> Self {
        Self {
            iid,
            revision_number: RevisionNumber::ZERO,
            excluded_domain: Vec::new(),
            excluded_person: Vec::new(),
            actual_option,
            actual_state,
            manual: ValueArray::empty(components),
            computed: ValueArray::empty(components),
            formula: ValueArray::empty(components),
            reference: ValueArray::empty(components),
            published: ValueArray::empty(components),
            value_switch: ValueSwitch::Manual,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterOverrideValueSet {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub parameter_value_set: Iid,
    pub manual: ValueArray,
    pub computed: ValueArray,
    pub formula: ValueArray,
    pub reference: ValueArray,
    pub published: ValueArray,
    #[serde(default)]
    pub value_switch: ValueSwitch,
}

impl ParameterOverrideValueSet {
    pub fn empty(iid: Iid, parameter_value_set: Iid, components: usize) -> Self {
        Self {
            iid,
            revision_number: RevisionNumber::ZERO,
            excluded_domain: Vec::new(),
            excluded_person: Vec::new(),
            parameter_value_set,
            manual: ValueArray::empty(components),
            computed: ValueArray::empty(components),
            formula: ValueArray::empty(components),
            reference: ValueArray::empty(components),
            published: ValueArray::empty(components),
            value_switch: ValueSwitch::Manual,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSubscriptionValueSet {
    pub iid: Iid,
    #[serde(default)]
    pub revision_number: RevisionNumber,
    #[serde(default)]
    pub excluded_domain: Vec<Iid>,
    #[serde(default)]
    pub excluded_person: Vec<Iid>,
    pub subscribed_value_set: Iid,
    pub manual: ValueArray,
    #[serde(default)]
    pub value_switch: ValueSwitch,
}

impl ParameterSubscriptionValueSet {
    pub fn empty(iid: Iid, subscribed_value_set: Iid, components: usize) -> Self {
        Self {
            iid,
            revision_number: RevisionNumber::ZERO,
            excluded_domain: Vec::new(),
            excluded_person: Vec::new(),
            subscribed_value_set,
            manual: ValueArray::empty(components),
            value_switch: ValueSwitch::Manual,
        }
    }
}
