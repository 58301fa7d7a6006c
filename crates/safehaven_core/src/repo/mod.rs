//! Local persistence for the fallback data source.
//!
//! # Responsibility
//! - Define the injectable key/value persistence contract.
//! - Shape the posts/reports collections stored under it.
//!
//! # Invariants
//! - Nothing above this layer touches raw bytes or storage keys.

pub mod kv_store;
pub mod local_repo;
