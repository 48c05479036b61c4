//! Sparse-keyed ordered reference collections.
//!
//! Order is carried by explicit integer keys rather than list position, so a
//! reorder only touches the items that move. Keys may be sparse and negative.

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::iid::Iid;

/// A key/value pair placing a reference inside an ordered collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderedItem {
    /// Sort key.
    pub k: i64,
    /// Referenced Thing.
    pub v: Iid,
}

impl OrderedItem {
    pub fn new(k: i64, v: Iid) -> Self {
        Self { k, v }
    }
}

/// Collection of [`OrderedItem`]s kept in ascending key order.
///
/// Invariants: keys are unique, values are unique.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<OrderedItem>", into = "Vec<OrderedItem>")]
pub struct OrderedCollection {
    items: Vec<OrderedItem>,
}

impl OrderedCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from arbitrary items, validating uniqueness.
    pub fn from_items(items: impl IntoIterator<Item = OrderedItem>) -> Result<Self, TypeError> {
        let mut collection = Self::new();
        for item in items {
            collection.insert(item.k, item.v)?;
        }
        Ok(collection)
    }

    /// Build a collection keyed 1..=n from values in order.
    pub fn from_values(values: impl IntoIterator<Item = Iid>) -> Result<Self, TypeError> {
        let mut collection = Self::new();
        for value in values {
            collection.append(value)?;
        }
        Ok(collection)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = &OrderedItem> {
        self.items.iter()
    }

    /// Referenced values in ascending key order.
    pub fn values(&self) -> impl Iterator<Item = Iid> + '_ {
        self.items.iter().map(|item| item.v)
    }

    pub fn contains(&self, value: &Iid) -> bool {
        self.items.iter().any(|item| item.v == *value)
    }

    /// The key currently assigned to `value`.
    pub fn key_of(&self, value: &Iid) -> Option<i64> {
        self.items.iter().find(|item| item.v == *value).map(|item| item.k)
    }

    /// Largest key in the collection.
    pub fn max_key(&self) -> Option<i64> {
        self.items.last().map(|item| item.k)
    }

    /// Insert `value` at `key`.
    pub fn insert(&mut self, key: i64, value: Iid) -> Result<(), TypeError> {
        if let Some(holder) = self.items.iter().find(|item| item.k == key) {
            return Err(TypeError::DuplicateKey {
                key,
                holder: holder.v,
            });
        }
        if self.contains(&value) {
            return Err(TypeError::DuplicateValue(value));
        }
        let position = self.items.partition_point(|item| item.k < key);
        self.items.insert(position, OrderedItem::new(key, value));
        Ok(())
    }

    /// Insert `value` after the current last item and return its key.
    pub fn append(&mut self, value: Iid) -> Result<i64, TypeError> {
        let key = self.max_key().map_or(1, |k| k.saturating_add(1));
        self.insert(key, value)?;
        Ok(key)
    }

    /// Remove `value`, returning the key it held.
    pub fn remove(&mut self, value: &Iid) -> Option<i64> {
        let position = self.items.iter().position(|item| item.v == *value)?;
        Some(self.items.remove(position).k)
    }

    /// Move a single value to a new key.
    pub fn reorder(&mut self, value: Iid, new_key: i64) -> Result<(), TypeError> {
        self.reorder_many(&[(value, new_key)])
    }

    /// Move several values at once.
    ///
    /// All listed values are lifted out first and re-inserted at their new
    /// keys, so swapping two keys in one call is legal. Unlisted items keep
    /// their keys. On error the collection is left unchanged.
    pub fn reorder_many(&mut self, moves: &[(Iid, i64)]) -> Result<(), TypeError> {
        let mut next = self.clone();
        for (value, _) in moves {
            if next.remove(value).is_none() {
                return Err(TypeError::MissingValue(*value));
            }
        }
        for (value, key) in moves {
            next.insert(*key, *value)?;
        }
        *self = next;
        Ok(())
    }
}

impl TryFrom<Vec<OrderedItem>> for OrderedCollection {
    type Error = TypeError;

    fn try_from(items: Vec<OrderedItem>) -> Result<Self, Self::Error> {
        Self::from_items(items)
    }
}

impl From<OrderedCollection> for Vec<OrderedItem> {
    fn from(collection: OrderedCollection) -> Self {
        collection.items
    }
}
