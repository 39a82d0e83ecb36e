//! Ordering domain model shared by the planner and the kanban board.
//!
//! # Responsibility
//! - Define the orderable unit (`Item`) and its bucket (`Container`).
//! - Give container identity one canonical, parseable text form.
//!
//! # Invariants
//! - An item belongs to exactly one container at any instant.
//! - Within one container, persisted positions are dense: `0..n`.
//! - Day buckets are implicit and resolved by key, never pre-created.

pub mod container;
pub mod item;
