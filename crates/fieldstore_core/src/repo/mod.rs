//! Persistence contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the document-store contract the provider depends on.
//! - Isolate SQL and JSON encoding details from versioning logic.
//!
//! # Invariants
//! - An item is read and written as one whole document.
//! - Stores report semantic problems (`InvalidData`) separately from
//!   transport errors.

pub mod blob_repo;
mod error;
pub mod item_repo;
mod schema;

pub use error::{StoreError, StoreResult};
