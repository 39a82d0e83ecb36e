//! Drag session controller.
//!
//! # Responsibility
//! - Track the one entity being dragged and the current drop candidate.
//! - Turn a drop into at most one move intent for the executor.
//!
//! # Invariants
//! - At most one session is active; a second start is rejected.
//! - Drop, cancel and every error path end in `Idle`.
//! - The controller never mutates items; it only emits intents.

use crate::engine::view::BoardView;
use crate::model::container::ContainerKey;
use crate::model::item::ItemId;
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Something a pointer can grab or hover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEntity {
    Item(ItemId),
    Container(ContainerKey),
}

/// Neutral drag event shape forwarded by the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragEvent {
    pub dragged: DragEntity,
    /// `None` when the pointer is over no valid drop target.
    pub over: Option<DragEntity>,
}

/// Terminal output of a drag session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveIntent {
    /// Place one item at `index` within `target`.
    MoveItem {
        item_id: ItemId,
        target: ContainerKey,
        index: usize,
    },
    /// Place one registered container at `index` among its siblings.
    ReorderContainer { key: ContainerKey, index: usize },
}

/// Controller state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging {
        active: DragEntity,
    },
    Hovering {
        active: DragEntity,
        over: DragEntity,
    },
}

/// Errors from drag session transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragError {
    /// A session is already running for this entity.
    SessionActive(DragEntity),
    /// Event arrived while no session was running.
    NoActiveSession,
    /// Event names a different dragged entity than the running session.
    EntityMismatch {
        active: DragEntity,
        dragged: DragEntity,
    },
}

impl Display for DragError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SessionActive(active) => write!(f, "drag session already active for {active:?}"),
            Self::NoActiveSession => write!(f, "no drag session is active"),
            Self::EntityMismatch { active, dragged } => write!(
                f,
                "drag event for {dragged:?} does not match active session {active:?}"
            ),
        }
    }
}

impl Error for DragError {}

/// Serial drag session state machine.
#[derive(Debug, Clone, Default)]
pub struct DragSession {
    phase: DragPhase,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != DragPhase::Idle
    }

    /// `Idle -> Dragging`.
    pub fn start(&mut self, dragged: DragEntity) -> Result<(), DragError> {
        if let Some(active) = self.active() {
            return Err(DragError::SessionActive(active.clone()));
        }
        debug!("event=drag_session module=engine status=start entity={dragged:?}");
        self.phase = DragPhase::Dragging { active: dragged };
        Ok(())
    }

    /// `Dragging <-> Hovering` as the pointer crosses drop candidates.
    pub fn hover(&mut self, event: &DragEvent) -> Result<(), DragError> {
        let active = self.check_event(event)?;
        self.phase = match event.over.clone() {
            Some(over) => DragPhase::Hovering { active, over },
            None => DragPhase::Dragging { active },
        };
        Ok(())
    }

    /// Ends the session and resolves the drop into an intent.
    ///
    /// Returns `Ok(None)` for drops with no target or no effective move.
    pub fn finish(
        &mut self,
        event: &DragEvent,
        view: &BoardView,
    ) -> Result<Option<MoveIntent>, DragError> {
        let checked = self.check_event(event);
        self.phase = DragPhase::Idle;
        let active = checked?;

        let intent = event
            .over
            .as_ref()
            .and_then(|over| resolve_drop(&active, over, view));
        debug!(
            "event=drag_session module=engine status=drop entity={active:?} intent={}",
            intent.is_some()
        );
        Ok(intent)
    }

    /// Abandons the session without any mutation.
    pub fn cancel(&mut self) {
        if let Some(active) = self.active() {
            debug!("event=drag_session module=engine status=cancel entity={active:?}");
        }
        self.phase = DragPhase::Idle;
    }

    /// Where the dragged entity would land right now, for the insertion
    /// indicator only.
    pub fn insertion_point(&self, view: &BoardView) -> Option<MoveIntent> {
        match &self.phase {
            DragPhase::Hovering { active, over } => resolve_drop(active, over, view),
            _ => None,
        }
    }

    fn active(&self) -> Option<&DragEntity> {
        match &self.phase {
            DragPhase::Idle => None,
            DragPhase::Dragging { active } | DragPhase::Hovering { active, .. } => Some(active),
        }
    }

    fn check_event(&self, event: &DragEvent) -> Result<DragEntity, DragError> {
        let active = self.active().ok_or(DragError::NoActiveSession)?;
        if *active != event.dragged {
            return Err(DragError::EntityMismatch {
                active: active.clone(),
                dragged: event.dragged.clone(),
            });
        }
        Ok(active.clone())
    }
}

/// Resolves `active` dropped on `over` against the current view.
pub fn resolve_drop(active: &DragEntity, over: &DragEntity, view: &BoardView) -> Option<MoveIntent> {
    match active {
        DragEntity::Item(item_id) => resolve_item_drop(*item_id, over, view),
        DragEntity::Container(key) => resolve_container_drop(key, over, view),
    }
}

fn resolve_item_drop(item_id: ItemId, over: &DragEntity, view: &BoardView) -> Option<MoveIntent> {
    let current = view.locate(item_id)?;
    let (target, index) = match over {
        DragEntity::Item(over_id) if *over_id == item_id => return None,
        DragEntity::Item(over_id) => view.locate(*over_id)?,
        DragEntity::Container(key) => {
            // Append: length of the target without the dragged item itself.
            let len = view
                .items_in(key)
                .iter()
                .filter(|item| item.id != item_id)
                .count();
            (key.clone(), len)
        }
    };
    if current == (target.clone(), index) {
        return None;
    }
    Some(MoveIntent::MoveItem {
        item_id,
        target,
        index,
    })
}

fn resolve_container_drop(
    key: &ContainerKey,
    over: &DragEntity,
    view: &BoardView,
) -> Option<MoveIntent> {
    let current = view.container_rank(key)?;
    let over_key = match over {
        DragEntity::Container(over_key) => over_key.clone(),
        DragEntity::Item(over_id) => view.locate(*over_id)?.0,
    };
    let index = view.container_rank(&over_key)?;
    if index == current {
        return None;
    }
    Some(MoveIntent::ReorderContainer {
        key: key.clone(),
        index,
    })
}
