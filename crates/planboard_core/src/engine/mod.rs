//! Ordering engine: allocator, executor, drag session, and view model.
//!
//! # Responsibility
//! - Keep one owned item table as the only source of ordering truth.
//! - Turn drag input into validated, persisted, dense position writes.
//!
//! # Invariants
//! - Only the executor mutates items; the drag controller emits intents.
//! - Views are re-derived from the table, never cached as a second order.

pub mod allocator;
pub mod drag;
pub mod error;
pub mod executor;
pub mod registry;
pub mod table;
pub mod view;
