//! Remote service client.
//!
//! # Responsibility
//! - Define the contract of the authoritative posts/reports backend.
//! - Classify every failure so callers can fall back uniformly.
//!
//! # Invariants
//! - Every call is attempted exactly once; no retries live here.
//! - Any transport error or non-2xx status is an `Err`.

pub mod http_api;

use crate::model::post::{Comment, Post};
use crate::model::report::ReportPayload;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use http_api::HttpRemoteApi;

pub type RemoteResult<T> = Result<T, RemoteError>;

#[derive(Debug)]
pub enum RemoteError {
    /// The client was configured with an unusable base URL.
    Config(String),
    /// Connection, DNS, TLS or timeout failure.
    Transport(reqwest::Error),
    /// The service answered with a non-success status.
    Status { status: u16, endpoint: String },
    /// The response body did not match the expected shape.
    Decode(reqwest::Error),
}

impl RemoteError {
    /// Short stable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Transport(err) if err.is_timeout() => "timeout",
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
        }
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(message) => write!(f, "{message}"),
            Self::Transport(err) => write!(f, "remote request failed: {err}"),
            Self::Status { status, endpoint } => {
                write!(f, "remote returned status {status} for {endpoint}")
            }
            Self::Decode(err) => write!(f, "remote response could not be decoded: {err}"),
        }
    }
}

impl Error for RemoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) | Self::Decode(err) => Some(err),
            Self::Config(_) | Self::Status { .. } => None,
        }
    }
}

/// Authoritative backend for posts and reports.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Lightweight reachability probe.
    async fn health(&self) -> bool;

    async fn fetch_posts(&self) -> RemoteResult<Vec<Post>>;

    async fn create_post(&self, post: &Post) -> RemoteResult<()>;

    async fn add_comment(&self, post_id: &str, comment: &Comment) -> RemoteResult<()>;

    async fn like_post(&self, post_id: &str) -> RemoteResult<()>;

    async fn submit_report(&self, report: &ReportPayload) -> RemoteResult<()>;
}
