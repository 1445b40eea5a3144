//! Host-facing services.
//!
//! # Responsibility
//! - Orchestrate store, cache and versioning calls into the operation set a
//!   content-management host calls.
//! - Keep callers decoupled from storage details.

pub mod provider;
pub mod tree_navigator;
