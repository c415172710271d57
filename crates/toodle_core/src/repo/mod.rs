//! Repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Keep SQL inside the core persistence boundary.
//! - Report semantic errors (`NotFound`) next to transport errors.
//!
//! # Invariants
//! - Write paths validate models before any SQL mutation.
//! - Read paths reject rows that violate model invariants.

pub mod item_repo;
pub mod label_repo;
