use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Checklist name → ordered items.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checklists(BTreeMap<String, Vec<String>>);

impl Checklists {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn items(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// Creates an empty checklist when `name` is unknown. Returns whether it was created.
    pub fn ensure(&mut self, name: &str) -> bool {
        if self.0.contains_key(name) {
            return false;
        }
        self.0.insert(name.to_owned(), Vec::new());
        true
    }

    /// Appends `items` in order. No items leaves the checklist unchanged.
    pub fn add_items(&mut self, name: &str, items: &[String]) -> Result<&[String], DomainError> {
        let checklist =
            self.0.get_mut(name).ok_or_else(|| DomainError::UnknownChecklist(name.to_owned()))?;
        checklist.extend(items.iter().cloned());
        Ok(checklist.as_slice())
    }

    /// Removes items by 1-based position into the list as it stood before the call.
    ///
    /// Every position is validated before anything is removed, so a bad
    /// position leaves the checklist untouched. A position given twice is
    /// removed once.
    pub fn remove_positions(
        &mut self,
        name: &str,
        positions: &[String],
    ) -> Result<&[String], DomainError> {
        if positions.is_empty() {
            return Err(DomainError::MissingArgument("remove needs at least one item number"));
        }

        let checklist =
            self.0.get_mut(name).ok_or_else(|| DomainError::UnknownChecklist(name.to_owned()))?;
        let len = checklist.len();

        let mut indices = BTreeSet::new();
        for raw in positions {
            let position = raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|position| (1..=len).contains(position))
                .ok_or_else(|| DomainError::InvalidPosition { raw: raw.clone(), len })?;
            indices.insert(position - 1);
        }

        for index in indices.into_iter().rev() {
            checklist.remove(index);
        }

        Ok(checklist.as_slice())
    }

    pub fn delete(&mut self, name: &str) -> Option<Vec<String>> {
        self.0.remove(name)
    }
}

impl From<BTreeMap<String, Vec<String>>> for Checklists {
    fn from(value: BTreeMap<String, Vec<String>>) -> Self {
        Self(value)
    }
}
