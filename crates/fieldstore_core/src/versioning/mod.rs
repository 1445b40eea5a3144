//! Version derivation and field mutation over item records.
//!
//! # Responsibility
//! - Derive version lists and new version numbers from a record's field map.
//! - Apply batched field and property edits to a loaded record.
//!
//! # Invariants
//! - Functions here only touch the in-memory record; callers persist it with
//!   one whole-document write.

pub mod mutation;
pub mod resolver;
