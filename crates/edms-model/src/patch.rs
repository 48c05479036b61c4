//! Applying client updates to a Thing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use edms_types::{ClassKind, Iid, OrderedCollection, OrderedItem};

use crate::error::ModelError;
use crate::schema::{field_shape, FieldShape, VALUE_ARRAY_FIELDS};
use crate::thing::Thing;

/// Field-level changes to one Thing.
///
/// `set` replaces scalars, unions unordered collections and inserts or
/// re-keys ordered items. `remove` drops values from collections.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    #[serde(default)]
    pub set: Map<String, Value>,
    #[serde(default)]
    pub remove: Map<String, Value>,
}

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }

    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.set.insert(field.into(), value);
        self
    }

    pub fn remove(mut self, field: impl Into<String>, value: Value) -> Self {
        self.remove.insert(field.into(), value);
        self
    }

    /// Wire names of every field this patch touches.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.set.keys().chain(self.remove.keys()).map(String::as_str)
    }
}

/// Apply `patch` to `thing`, returning the updated copy.
pub fn apply_patch(thing: &Thing, patch: &Patch) -> Result<Thing, ModelError> {
    let kind = thing.class_kind();
    let mut value = serde_json::to_value(thing)?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| ModelError::Malformed("thing is not a JSON object".into()))?;

    for (field, new) in &patch.set {
        let current = field_mut(object, kind, field)?;
        match field_shape(kind, field) {
            FieldShape::Immutable | FieldShape::Derived | FieldShape::Containment => {
                return Err(protected(kind, field));
            }
            FieldShape::Scalar => *current = new.clone(),
            FieldShape::Set => {
                let mut ids: Vec<Iid> = parse(field, current.clone())?;
                for id in parse::<Vec<Iid>>(field, new.clone())? {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                *current = serde_json::to_value(ids)?;
            }
            shape @ (FieldShape::Ordered | FieldShape::OrderedContainment) => {
                let mut collection: OrderedCollection = parse(field, current.clone())?;
                let items: Vec<OrderedItem> = parse(field, new.clone())?;
                let (moves, inserts): (Vec<_>, Vec<_>) =
                    items.into_iter().partition(|item| collection.contains(&item.v));
                if shape == FieldShape::OrderedContainment && !inserts.is_empty() {
                    return Err(ModelError::InvalidValue {
                        field: field.clone(),
                        reason: "new members must be created, not set".into(),
                    });
                }
                let moves: Vec<(Iid, i64)> = moves.iter().map(|item| (item.v, item.k)).collect();
                collection.reorder_many(&moves)?;
                for item in inserts {
                    collection.insert(item.k, item.v)?;
                }
                *current = serde_json::to_value(collection)?;
            }
        }
    }

    for (field, dropped) in &patch.remove {
        let current = field_mut(object, kind, field)?;
        let dropped = removal_targets(field, dropped)?;
        match field_shape(kind, field) {
            FieldShape::Set => {
                let mut ids: Vec<Iid> = parse(field, current.clone())?;
                ids.retain(|id| !dropped.contains(id));
                *current = serde_json::to_value(ids)?;
            }
            FieldShape::Ordered => {
                let mut collection: OrderedCollection = parse(field, current.clone())?;
                for id in &dropped {
                    collection.remove(id);
                }
                *current = serde_json::to_value(collection)?;
            }
            FieldShape::Scalar => {
                return Err(ModelError::InvalidValue {
                    field: field.clone(),
                    reason: "not a collection".into(),
                });
            }
            FieldShape::OrderedContainment
            | FieldShape::Containment
            | FieldShape::Derived
            | FieldShape::Immutable => return Err(protected(kind, field)),
        }
    }

    Ok(serde_json::from_value(value)?)
}

/// Rewrite every reference found in `map`, leaving value arrays untouched.
pub fn remap(thing: &Thing, map: &HashMap<Iid, Iid>) -> Result<Thing, ModelError> {
    let mut value = serde_json::to_value(thing)?;
    if let Some(object) = value.as_object_mut() {
        for (field, entry) in object.iter_mut() {
            if VALUE_ARRAY_FIELDS.contains(&field.as_str()) || field == "contentHash" {
                continue;
            }
            remap_value(entry, map);
        }
    }
    Ok(serde_json::from_value(value)?)
}

/// A copy of `thing` as a client may create it: containment and derived
/// fields emptied and the revision reset. Children are created separately
/// under their container; derived fields are filled by the engines.
pub fn detached(thing: &Thing) -> Result<Thing, ModelError> {
    let kind = thing.class_kind();
    let mut value = serde_json::to_value(thing)?;
    if let Some(object) = value.as_object_mut() {
        for (field, entry) in object.iter_mut() {
            match field_shape(kind, field) {
                FieldShape::Containment | FieldShape::OrderedContainment | FieldShape::Derived => {
                    *entry = if entry.is_array() { Value::Array(Vec::new()) } else { Value::Null };
                }
                _ if field == "revisionNumber" => *entry = Value::from(0u64),
                _ => {}
            }
        }
    }
    Ok(serde_json::from_value(value)?)
}

fn remap_value(value: &mut Value, map: &HashMap<Iid, Iid>) {
    match value {
        Value::String(s) => {
            if let Some(mapped) = s.parse::<Iid>().ok().and_then(|id| map.get(&id)) {
                *s = mapped.to_string();
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|item| remap_value(item, map)),
        Value::Object(fields) => fields.values_mut().for_each(|item| remap_value(item, map)),
        _ => {}
    }
}

fn field_mut<'a>(
    object: &'a mut Map<String, Value>,
    kind: ClassKind,
    field: &str,
) -> Result<&'a mut Value, ModelError> {
    object.get_mut(field).ok_or_else(|| ModelError::UnknownField {
        kind,
        field: field.to_string(),
    })
}

fn protected(kind: ClassKind, field: &str) -> ModelError {
    ModelError::ProtectedField {
        kind,
        field: field.to_string(),
    }
}

fn parse<T: serde::de::DeserializeOwned>(field: &str, value: Value) -> Result<T, ModelError> {
    serde_json::from_value(value).map_err(|e| ModelError::InvalidValue {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

/// Removal lists may name bare iids or `{k, v}` items.
fn removal_targets(field: &str, value: &Value) -> Result<Vec<Iid>, ModelError> {
    let entries = value.as_array().ok_or_else(|| ModelError::InvalidValue {
        field: field.to_string(),
        reason: "expected an array".into(),
    })?;
    entries
        .iter()
        .map(|entry| match entry {
            Value::Object(_) => parse::<OrderedItem>(field, entry.clone()).map(|item| item.v),
            _ => parse::<Iid>(field, entry.clone()),
        })
        .collect()
}
