//! Item domain model.
//!
//! # Responsibility
//! - Define the record the engine orders (a planner task or a board card).
//! - Define the minimal write shape used to persist ordering changes.
//!
//! # Invariants
//! - `id` is stable and never reused for another item.
//! - `container` and `position` are only changed together, by a move.
//! - `title` is opaque payload; the engine never orders by it.

use crate::model::container::ContainerKey;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for every orderable item.
pub type ItemId = Uuid;

/// One orderable unit held by a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable item id.
    pub id: ItemId,
    /// Container currently holding the item.
    pub container: ContainerKey,
    /// Dense zero-based rank inside `container`.
    pub position: i64,
    /// Completed items do not count against container capacity.
    pub completed: bool,
    /// User-facing label.
    pub title: String,
}

impl Item {
    /// Creates an active item with a generated id.
    ///
    /// Position is assigned by the engine on insertion; `0` is a placeholder.
    pub fn new(container: ContainerKey, title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), container, title)
    }

    /// Creates an active item with a caller-provided id.
    pub fn with_id(id: ItemId, container: ContainerKey, title: impl Into<String>) -> Self {
        Self {
            id,
            container,
            position: 0,
            completed: false,
            title: title.into(),
        }
    }

    /// Returns whether this item counts against container capacity.
    pub fn is_active(&self) -> bool {
        !self.completed
    }

    /// Returns the ordering slot this item currently occupies.
    pub fn slot(&self) -> PositionUpdate {
        PositionUpdate {
            id: self.id,
            container: self.container.clone(),
            position: self.position,
        }
    }
}

/// One persisted ordering write: `id` now lives at `position` in `container`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: ItemId,
    pub container: ContainerKey,
    pub position: i64,
}
