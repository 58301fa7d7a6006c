//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate remote and local data sources into use-case level APIs.
//! - Keep callers decoupled from transport and storage details.

pub mod data_store;
