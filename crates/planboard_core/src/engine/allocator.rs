//! Position allocator: dense integer ranks for one ordered sequence.
//!
//! # Responsibility
//! - Insert one entry at a requested index and renumber the sequence.
//! - Report only the entries whose persisted slot actually changes.
//!
//! # Invariants
//! - Input sequences are sorted by `position ASC`.
//! - Output positions are exactly `0..n`, with no gaps or duplicates.
//! - Re-inserting an entry at its current index reports no changes.

use crate::model::container::{Container, ContainerKey};
use crate::model::item::{Item, ItemId};

/// Anything that owns a dense rank inside a parent sequence.
pub trait Positioned: Clone {
    type Id: Clone + Eq;

    fn order_id(&self) -> Self::Id;
    fn position(&self) -> i64;
    fn set_position(&mut self, position: i64);
}

impl Positioned for Item {
    type Id = ItemId;

    fn order_id(&self) -> ItemId {
        self.id
    }

    fn position(&self) -> i64 {
        self.position
    }

    fn set_position(&mut self, position: i64) {
        self.position = position;
    }
}

impl Positioned for Container {
    type Id = ContainerKey;

    fn order_id(&self) -> ContainerKey {
        self.key.clone()
    }

    fn position(&self) -> i64 {
        self.position
    }

    fn set_position(&mut self, position: i64) {
        self.position = position;
    }
}

/// New total order plus the minimal set of slot rewrites to persist it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation<T> {
    /// Full sequence after the operation, positions already renumbered.
    pub order: Vec<T>,
    /// Entries whose slot differs from the input snapshot, in order.
    pub changed: Vec<T>,
}

impl<T> Allocation<T> {
    /// Returns whether persisting this allocation would write nothing.
    pub fn is_noop(&self) -> bool {
        self.changed.is_empty()
    }
}

/// Places `moving` at `target_index` inside `current_order`.
///
/// `current_order` contains `moving` for a same-sequence reorder and excludes
/// it for a relocation from another sequence. A relocated entry is always
/// reported as changed, even when its numeric position happens to match.
/// `target_index` is clamped to `[0, len]` where `len` excludes `moving`.
pub fn compute_insertion<T: Positioned>(
    current_order: &[T],
    moving: T,
    target_index: usize,
) -> Allocation<T> {
    let moving_id = moving.order_id();
    let relocated = !current_order
        .iter()
        .any(|entry| entry.order_id() == moving_id);

    let mut order: Vec<T> = current_order
        .iter()
        .filter(|entry| entry.order_id() != moving_id)
        .cloned()
        .collect();
    let index = target_index.min(order.len());
    order.insert(index, moving);

    let changed = renumber(&mut order, |entry| {
        relocated && entry.order_id() == moving_id
    });
    Allocation { order, changed }
}

/// Removes `removed_id` from `current_order` and closes the gap.
///
/// Removing an id that is not present only normalizes the sequence.
pub fn compute_removal<T: Positioned>(current_order: &[T], removed_id: &T::Id) -> Allocation<T> {
    let mut order: Vec<T> = current_order
        .iter()
        .filter(|entry| entry.order_id() != *removed_id)
        .cloned()
        .collect();
    let changed = renumber(&mut order, |_| false);
    Allocation { order, changed }
}

/// Appends `moving` to the end of `current_order`.
pub fn compute_append<T: Positioned>(current_order: &[T], moving: T) -> Allocation<T> {
    compute_insertion(current_order, moving, usize::MAX)
}

/// Returns the index of `id` in a sorted sequence.
pub fn index_of<T: Positioned>(order: &[T], id: &T::Id) -> Option<usize> {
    order.iter().position(|entry| entry.order_id() == *id)
}

fn renumber<T: Positioned>(order: &mut [T], force: impl Fn(&T) -> bool) -> Vec<T> {
    let mut changed = Vec::new();
    for (index, entry) in order.iter_mut().enumerate() {
        let position = index as i64;
        if entry.position() != position || force(entry) {
            entry.set_position(position);
            changed.push(entry.clone());
        }
    }
    changed
}
