//! Domain model for stored items and labels.
//!
//! # Invariants
//! - Every item is identified by a stable `ItemId` assigned at creation.
//! - Optional dates are `Option<i64>`; no numeric sentinel stands for "absent".

pub mod item;
pub mod label;
