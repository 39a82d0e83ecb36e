//! Owned in-memory item table.
//!
//! Items are stored once, keyed by id. Per-container order is always derived
//! on read from `(position, id)`; the table never keeps a second ordering.

use crate::model::container::ContainerKey;
use crate::model::item::{Item, ItemId, PositionUpdate};
use std::collections::{BTreeMap, BTreeSet};

/// Arena of items keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemTable {
    items: BTreeMap<ItemId, Item>,
}

impl ItemTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Self {
        Self {
            items: items.into_iter().map(|item| (item.id, item)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn insert(&mut self, item: Item) -> Option<Item> {
        self.items.insert(item.id, item)
    }

    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        self.items.remove(&id)
    }

    /// Items of one container, sorted by `position ASC, id ASC`.
    pub fn ordered_in(&self, key: &ContainerKey) -> Vec<Item> {
        let mut items: Vec<Item> = self
            .items
            .values()
            .filter(|item| item.container == *key)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.position.cmp(&b.position).then(a.id.cmp(&b.id)));
        items
    }

    /// Count of non-completed items in one container.
    pub fn active_count_in(&self, key: &ContainerKey) -> usize {
        self.items
            .values()
            .filter(|item| item.container == *key && item.is_active())
            .count()
    }

    /// Every container key that currently holds at least one item.
    pub fn container_keys(&self) -> BTreeSet<ContainerKey> {
        self.items
            .values()
            .map(|item| item.container.clone())
            .collect()
    }

    /// Applies slot writes to known items; unknown ids are ignored.
    pub fn apply_updates(&mut self, updates: &[PositionUpdate]) {
        for update in updates {
            if let Some(item) = self.items.get_mut(&update.id) {
                item.container = update.container.clone();
                item.position = update.position;
            }
        }
    }

    /// Copies every item held by any of `keys`.
    pub fn snapshot_of(&self, keys: &[ContainerKey]) -> Vec<Item> {
        self.items
            .values()
            .filter(|item| keys.contains(&item.container))
            .cloned()
            .collect()
    }

    /// Replaces the contents of `keys` with `fresh`.
    ///
    /// Rows currently in `keys` are dropped, and so is any stale copy of a
    /// fresh id held elsewhere, so one id never lives in two containers.
    pub fn replace_containers(&mut self, keys: &[ContainerKey], fresh: Vec<Item>) {
        self.items.retain(|_, item| !keys.contains(&item.container));
        for item in fresh {
            self.items.insert(item.id, item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ItemTable;
    use crate::model::container::ContainerKey;
    use crate::model::item::{Item, PositionUpdate};

    #[test]
    fn replace_containers_never_duplicates_an_id() {
        let big = ContainerKey::category("big");
        let medium = ContainerKey::category("medium");
        let mut moved = Item::new(big.clone(), "moved");
        let mut table = ItemTable::from_items([moved.clone()]);

        table.apply_updates(&[PositionUpdate {
            id: moved.id,
            container: medium.clone(),
            position: 0,
        }]);
        assert_eq!(table.ordered_in(&medium).len(), 1);

        moved.position = 0;
        table.replace_containers(&[big.clone(), medium.clone()], vec![moved.clone()]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.ordered_in(&big), vec![moved]);
        assert!(table.ordered_in(&medium).is_empty());
    }

    #[test]
    fn active_count_skips_completed_items() {
        let big = ContainerKey::category("big");
        let mut done = Item::new(big.clone(), "done");
        done.completed = true;
        let table = ItemTable::from_items([done, Item::new(big.clone(), "open")]);
        assert_eq!(table.active_count_in(&big), 1);
    }
}
