//! Engine error taxonomy.

use crate::model::container::ContainerKey;
use crate::model::item::ItemId;
use crate::repo::position_repo::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors from ordering engine operations.
///
/// Every variant leaves the in-memory item table as it was before the call.
#[derive(Debug)]
pub enum EngineError {
    /// Item is unknown to the in-memory table (stale reference).
    ItemNotFound(ItemId),
    /// Target container is neither registered nor an implicit day bucket.
    ContainerNotFound(ContainerKey),
    /// Target container already holds `capacity` active items.
    CapacityExceeded {
        container: ContainerKey,
        capacity: u32,
    },
    /// Day move requested for an item that does not live in a day bucket.
    NotDayBucket(ItemId),
    /// Title is blank after trim.
    InvalidTitle,
    /// Container still has staged writes awaiting confirm/rollback.
    ContainerBusy(ContainerKey),
    /// Two-phase ticket is no longer at the head of its container queues.
    StaleTicket(u64),
    /// Store rejected the write; the optimistic change was rolled back.
    PersistenceFailure(StoreError),
}

impl EngineError {
    /// Returns whether this is an expected, user-visible rejection rather
    /// than a failure (e.g. "category is full").
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::CapacityExceeded { .. } | Self::NotDayBucket(_) | Self::InvalidTitle
        )
    }

    /// Returns whether the caller's view of the item set is stale.
    pub fn is_stale_reference(&self) -> bool {
        matches!(self, Self::ItemNotFound(_) | Self::ContainerNotFound(_))
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::ContainerNotFound(key) => write!(f, "container not found: {key}"),
            Self::CapacityExceeded {
                container,
                capacity,
            } => write!(f, "{container} is full ({capacity} active items)"),
            Self::NotDayBucket(id) => write!(f, "item is not scheduled on a day: {id}"),
            Self::InvalidTitle => write!(f, "title must not be blank"),
            Self::ContainerBusy(key) => write!(f, "{key} has unconfirmed moves pending"),
            Self::StaleTicket(ticket) => write!(f, "move ticket {ticket} is stale"),
            Self::PersistenceFailure(err) => write!(f, "failed to persist move: {err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PersistenceFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        Self::PersistenceFailure(value)
    }
}
