//! Domain model for the community feed and incident reports.
//!
//! # Responsibility
//! - Define the records exchanged with the remote service and persisted in
//!   the local fallback store.
//! - Keep the JSON wire shape in one place so both data sources agree.
//!
//! # Invariants
//! - Posts and comments are never deleted; they only gain likes/comments.
//! - Reports are write-once from the client's point of view.

pub mod post;
pub mod report;
pub mod seed;
