use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::checklist::Checklists;
use crate::errors::DomainError;

/// Named slot in the store. Each key is bound to one [`CollectionShape`] for
/// the lifetime of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionKey {
    AdventureDeck,
    Names,
    Quotes,
    Checklists,
}

impl CollectionKey {
    pub const ALL: [CollectionKey; 4] =
        [Self::AdventureDeck, Self::Names, Self::Quotes, Self::Checklists];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdventureDeck => "adventure_deck",
            Self::Names => "names",
            Self::Quotes => "quotes",
            Self::Checklists => "checklists",
        }
    }

    pub fn shape(self) -> CollectionShape {
        match self {
            Self::AdventureDeck | Self::Quotes => CollectionShape::List,
            Self::Names => CollectionShape::NamedLists,
            Self::Checklists => CollectionShape::Checklists,
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == value.trim())
            .ok_or_else(|| format!("unknown collection key `{value}`"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectionShape {
    List,
    NamedLists,
    Checklists,
}

impl fmt::Display for CollectionShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::List => "a list of strings",
            Self::NamedLists => "a mapping of category to string lists",
            Self::Checklists => "a mapping of checklist name to items",
        })
    }
}

/// Category name → candidate values, used for compound picks such as
/// `name` + `surname`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamedLists(pub BTreeMap<String, Vec<String>>);

impl NamedLists {
    pub fn category(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CollectionValue {
    List(Vec<String>),
    NamedLists(NamedLists),
    Checklists(Checklists),
}

impl CollectionValue {
    pub fn shape(&self) -> CollectionShape {
        match self {
            Self::List(_) => CollectionShape::List,
            Self::NamedLists(_) => CollectionShape::NamedLists,
            Self::Checklists(_) => CollectionShape::Checklists,
        }
    }

    /// Number of top-level entries: list items, categories or checklists.
    pub fn len(&self) -> usize {
        match self {
            Self::List(items) => items.len(),
            Self::NamedLists(lists) => lists.0.len(),
            Self::Checklists(checklists) => checklists.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parses a persisted value using the shape bound to `key`.
    pub fn decode(key: CollectionKey, raw: &str) -> Result<Self, DomainError> {
        let decoded = match key.shape() {
            CollectionShape::List => serde_json::from_str(raw).map(Self::List),
            CollectionShape::NamedLists => serde_json::from_str(raw).map(Self::NamedLists),
            CollectionShape::Checklists => serde_json::from_str(raw).map(Self::Checklists),
        };

        decoded.map_err(|error| match json_kind(raw) {
            Some(found) if found != expected_json_kind(key.shape()) => {
                DomainError::ShapeMismatch { key, expected: key.shape(), found }
            }
            _ => DomainError::Malformed { key, message: error.to_string() },
        })
    }

    pub fn encode(&self, key: CollectionKey) -> Result<String, DomainError> {
        if self.shape() != key.shape() {
            return Err(DomainError::ShapeMismatch {
                key,
                expected: key.shape(),
                found: expected_json_kind(self.shape()),
            });
        }

        serde_json::to_string(self)
            .map_err(|error| DomainError::Malformed { key, message: error.to_string() })
    }

    pub fn into_list(self, key: CollectionKey) -> Result<Vec<String>, DomainError> {
        match self {
            Self::List(items) => Ok(items),
            other => Err(other.mismatch(key, CollectionShape::List)),
        }
    }

    pub fn into_named_lists(self, key: CollectionKey) -> Result<NamedLists, DomainError> {
        match self {
            Self::NamedLists(lists) => Ok(lists),
            other => Err(other.mismatch(key, CollectionShape::NamedLists)),
        }
    }

    pub fn into_checklists(self, key: CollectionKey) -> Result<Checklists, DomainError> {
        match self {
            Self::Checklists(checklists) => Ok(checklists),
            other => Err(other.mismatch(key, CollectionShape::Checklists)),
        }
    }

    fn mismatch(&self, key: CollectionKey, expected: CollectionShape) -> DomainError {
        DomainError::ShapeMismatch { key, expected, found: expected_json_kind(self.shape()) }
    }
}

fn expected_json_kind(shape: CollectionShape) -> &'static str {
    match shape {
        CollectionShape::List => "array",
        CollectionShape::NamedLists | CollectionShape::Checklists => "object",
    }
}

fn json_kind(raw: &str) -> Option<&'static str> {
    let value = serde_json::from_str::<serde_json::Value>(raw).ok()?;
    Some(match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    })
}
