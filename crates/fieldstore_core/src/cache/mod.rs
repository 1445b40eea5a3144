//! In-process caches in front of the item store.
//!
//! # Responsibility
//! - Keep structural item metadata close to tree-navigation callers.
//!
//! # Invariants
//! - Cached values are derived copies; the store stays the source of truth.
//! - Entries are replaced whole, never mutated in place.

pub mod structural_cache;
