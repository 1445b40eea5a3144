//! Item and field-slot domain model.
//!
//! # Responsibility
//! - Define the stored item document and its versioned field map.
//! - Define the coordinate system used to address field slots.
//!
//! # Invariants
//! - Every item is identified by a stable `ItemId`.
//! - Field slots are addressed by structural `FieldCoordinate` equality.

pub mod coordinate;
pub mod item;
