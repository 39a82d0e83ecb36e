//! Board/planner view model.
//!
//! # Responsibility
//! - Group the item table by container and sort each group by position.
//! - Expose capacity placeholders and completed-overflow splits for rendering.
//!
//! # Invariants
//! - Derived synchronously from the item table; holds no ordering state of
//!   its own.
//! - Completed items are never dropped, only split into shown/hidden lists.

use crate::engine::registry::ContainerRegistry;
use crate::engine::table::ItemTable;
use crate::model::container::{Container, ContainerKey};
use crate::model::item::{Item, ItemId};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Rendering options for derived views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    /// When `false`, every completed overflow item goes to the hidden list.
    pub completed_overflow_visible: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            completed_overflow_visible: true,
        }
    }
}

/// One container's derived rendering state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerView {
    pub container: Container,
    /// Every item in the container, `position ASC`.
    pub items: Vec<Item>,
    pub active_count: usize,
    /// Placeholder count for capacity-limited containers.
    pub empty_slots: Option<usize>,
    /// Completed items shown inside the remaining capacity.
    pub completed_shown: Vec<Item>,
    /// Completed items available on demand.
    pub completed_hidden: Vec<Item>,
}

impl ContainerView {
    fn derive(container: Container, items: Vec<Item>, options: ViewOptions) -> Self {
        let active_count = items.iter().filter(|item| item.is_active()).count();
        let completed: Vec<Item> = items.iter().filter(|item| item.completed).cloned().collect();

        let (empty_slots, shown_limit) = match container.capacity {
            Some(capacity) => {
                let free = (capacity as usize).saturating_sub(active_count);
                (Some(free), free)
            }
            None => (None, completed.len()),
        };
        let shown_limit = if options.completed_overflow_visible {
            shown_limit.min(completed.len())
        } else {
            0
        };
        let mut completed_shown = completed;
        let completed_hidden = completed_shown.split_off(shown_limit);

        Self {
            container,
            items,
            active_count,
            empty_slots,
            completed_shown,
            completed_hidden,
        }
    }

    pub fn key(&self) -> &ContainerKey {
        &self.container.key
    }

    /// Active items in order.
    pub fn active(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|item| item.is_active())
    }
}

/// Grouped, sorted snapshot of the whole item set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    /// Registered containers in rank order, then day buckets by key.
    containers: Vec<ContainerView>,
    index: BTreeMap<ContainerKey, usize>,
    /// Number of leading entries in `containers` that are rank-ordered.
    ranked: usize,
}

impl BoardView {
    /// Derives the view from the current item table and registry.
    pub fn derive(items: &ItemTable, registry: &ContainerRegistry, options: ViewOptions) -> Self {
        let mut containers = Vec::new();
        for container in registry.ordered() {
            let ordered = items.ordered_in(&container.key);
            containers.push(ContainerView::derive(container, ordered, options));
        }
        let ranked = containers.len();

        // Day buckets and rows left in unregistered containers still render.
        for key in items.container_keys() {
            if registry.get(&key).is_some() {
                continue;
            }
            let container = registry.resolve(&key).unwrap_or_else(|| Container {
                title: key.to_string(),
                key: key.clone(),
                capacity: None,
                position: 0,
            });
            containers.push(ContainerView::derive(container, items.ordered_in(&key), options));
        }

        let index = containers
            .iter()
            .enumerate()
            .map(|(slot, view)| (view.key().clone(), slot))
            .collect();
        Self {
            containers,
            index,
            ranked,
        }
    }

    pub fn containers(&self) -> &[ContainerView] {
        &self.containers
    }

    pub fn container(&self, key: &ContainerKey) -> Option<&ContainerView> {
        self.index.get(key).map(|slot| &self.containers[*slot])
    }

    /// Ordered items of one container; empty for unknown keys.
    pub fn items_in(&self, key: &ContainerKey) -> &[Item] {
        self.container(key)
            .map(|view| view.items.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the container and index currently holding `id`.
    pub fn locate(&self, id: ItemId) -> Option<(ContainerKey, usize)> {
        self.containers.iter().find_map(|view| {
            view.items
                .iter()
                .position(|item| item.id == id)
                .map(|index| (view.key().clone(), index))
        })
    }

    /// Rank of a registered container among its siblings.
    pub fn container_rank(&self, key: &ContainerKey) -> Option<usize> {
        self.index.get(key).copied().filter(|slot| *slot < self.ranked)
    }

    /// Every day-bucket view on `date`, ordered by lane.
    pub fn day(&self, date: NaiveDate) -> Vec<&ContainerView> {
        self.containers[self.ranked..]
            .iter()
            .filter(|view| view.key().date() == Some(date))
            .collect()
    }
}
