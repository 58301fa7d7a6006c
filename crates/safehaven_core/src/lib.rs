//! Core data access and chat logic for SafeHaven.
//!
//! Posts and reports go through `DataStore`, which prefers the remote API and
//! falls back to a per-device key-value store. The support chat lives in
//! `chat`.

pub mod chat;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod remote;
pub mod repo;
pub mod service;

pub use chat::{
    ChatBackend, ChatConfig, ChatError, ChatMessage, ChatSession, Conversation, GeminiBackend,
};
pub use config::{AppConfig, ConfigError};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use model::post::{AuthorIdentity, Comment, Post, PostId, PostValidationError};
pub use model::report::{
    GeoPoint, IncidentKind, IncidentTime, LocalReport, Report, ReportPayload,
    ReportValidationError, Reporter,
};
pub use remote::{HttpRemoteApi, RemoteApi, RemoteError};
pub use repo::kv_store::{KeyValueStore, KvError, MemoryKvStore, SqliteKvStore};
pub use repo::local_repo::{LocalRepository, RepoError};
pub use service::data_store::{DataStore, Fetched};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
