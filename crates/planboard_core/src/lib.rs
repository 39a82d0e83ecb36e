//! Core ordering engine for Planboard.
//! This crate is the single source of truth for item and container order.

pub mod clock;
pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{CategoryConfig, ConfigError, PlannerConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use engine::allocator::{
    compute_append, compute_insertion, compute_removal, Allocation, Positioned,
};
pub use engine::drag::{
    resolve_drop, DragEntity, DragError, DragEvent, DragPhase, DragSession, MoveIntent,
};
pub use engine::error::{EngineError, EngineResult};
pub use engine::executor::{MoveExecutor, MoveOutcome, MovePlan, MoveTicket, RollForwardReport};
pub use engine::registry::ContainerRegistry;
pub use engine::table::ItemTable;
pub use engine::view::{BoardView, ContainerView, ViewOptions};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::container::{Container, ContainerKey, ContainerKeyError, ContainerKind};
pub use model::item::{Item, ItemId, PositionUpdate};
pub use repo::position_repo::{PositionStore, SqlitePositionStore, StoreError, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
