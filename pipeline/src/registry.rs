//! Named datasets held by the caller, one collection per kind of dataset.
use crate::dataset::Dataset;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use thiserror::Error;
use tracing::debug;

/// The category a stored dataset belongs to.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Anode,
    Cathode,
    FullCell,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NamedDataset {
    pub name: String,
    pub data: Dataset,
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("No {kind} dataset named '{name}'")]
    NotFound { kind: DatasetKind, name: String },
    #[error("Exactly one {kind} dataset must be selected, found {found}")]
    SelectionCount { kind: DatasetKind, found: usize },
}

/// Insertion ordered collections of named datasets, keyed by [DatasetKind].
#[derive(Debug, Default)]
pub struct DatasetRegistry {
    entries: HashMap<DatasetKind, Vec<NamedDataset>>,
}

impl DatasetRegistry {
    /// Stores a dataset, replacing any dataset of the same kind and name in place.
    pub fn store(&mut self, kind: DatasetKind, dataset: NamedDataset) {
        let entries = self.entries.entry(kind).or_default();
        match entries.iter_mut().find(|entry| entry.name == dataset.name) {
            Some(existing) => {
                debug!("Replacing {kind} dataset '{}'", dataset.name);
                *existing = dataset;
            }
            None => {
                debug!("Storing {kind} dataset '{}'", dataset.name);
                entries.push(dataset);
            }
        }
    }

    pub fn get(&self, kind: DatasetKind, name: &str) -> Result<&NamedDataset, RegistryError> {
        self.entries
            .get(&kind)
            .and_then(|entries| entries.iter().find(|entry| entry.name == name))
            .ok_or_else(|| RegistryError::NotFound {
                kind,
                name: name.to_owned(),
            })
    }

    pub fn remove(&mut self, kind: DatasetKind, name: &str) -> Result<NamedDataset, RegistryError> {
        let not_found = || RegistryError::NotFound {
            kind,
            name: name.to_owned(),
        };
        let entries = self.entries.get_mut(&kind).ok_or_else(not_found)?;
        let index = entries
            .iter()
            .position(|entry| entry.name == name)
            .ok_or_else(not_found)?;
        Ok(entries.remove(index))
    }

    /// Names of the datasets of one kind, in the order they were first stored.
    pub fn names(&self, kind: DatasetKind) -> impl Iterator<Item = &str> {
        self.entries
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        DatasetKind::iter()
            .filter_map(|kind| self.entries.get(&kind))
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves a selection which must name exactly one dataset of the given kind.
    pub fn single_selected(
        &self,
        kind: DatasetKind,
        selected: &[&str],
    ) -> Result<&NamedDataset, RegistryError> {
        match selected {
            [name] => self.get(kind, name),
            _ => Err(RegistryError::SelectionCount {
                kind,
                found: selected.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::sample_dataset;

    fn named(name: &str) -> NamedDataset {
        NamedDataset {
            name: name.to_owned(),
            data: sample_dataset(),
        }
    }

    #[test]
    fn kind_names() {
        assert_eq!(DatasetKind::FullCell.to_string(), "full_cell");
        assert_eq!("cathode".parse::<DatasetKind>().unwrap(), DatasetKind::Cathode);
        assert_eq!(
            serde_json::to_string(&DatasetKind::Anode).unwrap(),
            "\"anode\""
        );
    }

    #[test]
    fn store_and_replace() {
        let mut registry = DatasetRegistry::default();
        registry.store(DatasetKind::Anode, named("a"));
        registry.store(DatasetKind::Anode, named("b"));
        registry.store(DatasetKind::Cathode, named("a"));

        let mut replacement = named("a");
        replacement.data = replacement
            .data
            .filter_rows(&[true, false, false, false, false, false])
            .unwrap();
        registry.store(DatasetKind::Anode, replacement);

        assert_eq!(registry.names(DatasetKind::Anode).collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.get(DatasetKind::Anode, "a").unwrap().data.num_rows(),
            1
        );
        assert_eq!(
            registry.get(DatasetKind::Cathode, "a").unwrap().data.num_rows(),
            6
        );
    }

    #[test]
    fn remove() {
        let mut registry = DatasetRegistry::default();
        registry.store(DatasetKind::FullCell, named("fc"));
        assert_eq!(registry.remove(DatasetKind::FullCell, "fc").unwrap().name, "fc");
        assert!(registry.is_empty());
        assert_eq!(
            registry.remove(DatasetKind::FullCell, "fc"),
            Err(RegistryError::NotFound {
                kind: DatasetKind::FullCell,
                name: "fc".to_owned()
            })
        );
        assert_eq!(registry.names(DatasetKind::Cathode).count(), 0);
    }

    #[test]
    fn single_selection() {
        let mut registry = DatasetRegistry::default();
        registry.store(DatasetKind::Anode, named("a"));
        registry.store(DatasetKind::Anode, named("b"));
        assert_eq!(
            registry
                .single_selected(DatasetKind::Anode, &["b"])
                .unwrap()
                .name,
            "b"
        );
        assert_eq!(
            registry.single_selected(DatasetKind::Anode, &["a", "b"]),
            Err(RegistryError::SelectionCount {
                kind: DatasetKind::Anode,
                found: 2
            })
        );
        assert!(registry.single_selected(DatasetKind::Anode, &[]).is_err());
    }
}
