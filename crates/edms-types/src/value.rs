use serde::{Deserialize, Serialize};

/// Sentinel stored in every slot of a freshly created value array.
pub const EMPTY_VALUE: &str = "-";

/// Ordered array of textual values, one per parameter-type component.
///
/// Values are opaque strings and round-trip byte-for-byte.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueArray(pub Vec<String>);

impl ValueArray {
    /// `["-"; components]`.
    pub fn empty(components: usize) -> Self {
        Self(vec![EMPTY_VALUE.to_string(); components])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if every slot holds the empty sentinel.
    pub fn is_unset(&self) -> bool {
        self.0.iter().all(|v| v == EMPTY_VALUE)
    }
}

impl<S: Into<String>> FromIterator<S> for ValueArray {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Which value array of a value set is the effective one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueSwitch {
    Computed,
    #[default]
    Manual,
    Reference,
}

/// Kind of an actual finite state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActualFiniteStateKind {
    #[default]
    Mandatory,
    Forbidden,
}
