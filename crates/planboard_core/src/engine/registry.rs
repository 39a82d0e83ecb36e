//! Registered containers and lazy day-bucket resolution.

use crate::model::container::{Container, ContainerKey};
use std::collections::BTreeMap;

/// Long-lived containers keyed by identity.
///
/// Day buckets are never registered; `resolve` materialises them on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerRegistry {
    containers: BTreeMap<ContainerKey, Container>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_containers(containers: impl IntoIterator<Item = Container>) -> Self {
        Self {
            containers: containers
                .into_iter()
                .map(|container| (container.key.clone(), container))
                .collect(),
        }
    }

    /// Registers or replaces one container.
    pub fn register(&mut self, container: Container) {
        self.containers.insert(container.key.clone(), container);
    }

    /// Returns a registered container only.
    pub fn get(&self, key: &ContainerKey) -> Option<&Container> {
        self.containers.get(key)
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Resolves a registered container or the implicit day bucket for `key`.
    ///
    /// A day lane takes the capacity of the registered category it is named
    /// after; a lane-less day bucket is unbounded.
    pub fn resolve(&self, key: &ContainerKey) -> Option<Container> {
        match key {
            ContainerKey::Day { date, lane } => {
                let mut bucket = Container::day_bucket(*date, lane.clone());
                bucket.capacity = lane
                    .as_ref()
                    .and_then(|lane| self.containers.get(&ContainerKey::category(lane.as_str())))
                    .and_then(|category| category.capacity);
                Some(bucket)
            }
            _ => self.containers.get(key).cloned(),
        }
    }

    /// Registered containers sorted by `position ASC, key ASC`.
    pub fn ordered(&self) -> Vec<Container> {
        let mut containers: Vec<Container> = self.containers.values().cloned().collect();
        containers.sort_by(|a, b| a.position.cmp(&b.position).then(a.key.cmp(&b.key)));
        containers
    }

    /// Next append rank for a newly registered container.
    pub fn next_position(&self) -> i64 {
        self.containers
            .values()
            .map(|container| container.position + 1)
            .max()
            .unwrap_or(0)
    }

    /// Applies container rank writes; unknown keys are ignored.
    pub fn apply_positions(&mut self, changed: &[Container]) {
        for update in changed {
            if let Some(container) = self.containers.get_mut(&update.key) {
                container.position = update.position;
            }
        }
    }
}
