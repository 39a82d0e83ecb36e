//! Persistence collaborator contracts and the SQLite implementation.
//!
//! # Responsibility
//! - Define the write/read surface the ordering engine needs.
//! - Isolate SQL details from engine orchestration.
//!
//! # Invariants
//! - Each batch write succeeds or fails as a unit.
//! - Reads return items ordered by `position ASC, item_uuid ASC`.

pub mod position_repo;
