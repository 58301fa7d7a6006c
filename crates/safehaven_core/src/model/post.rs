//! Post and comment records.
//!
//! # Responsibility
//! - Define the feed records shared by remote and local data sources.
//! - Compose new posts/comments the way the feed UI submits them.
//!
//! # Invariants
//! - `likes` is unsigned, so a post can never carry a negative count.
//! - `comments` keeps insertion order, which is also display order.
//! - Client-composed ids are derived from creation time and are not stable
//!   once the remote service accepts the record.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Post identifier as exchanged with the remote service.
pub type PostId = String;

const ANONYMOUS_AUTHOR: &str = "Anonymous";
const UNNAMED_MEMBER_AUTHOR: &str = "Community Member";
const COMMENT_AUTHOR: &str = "You";

/// One community feed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: String,
    pub content: String,
    /// ISO-8601 creation timestamp.
    pub timestamp: String,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Reply attached to exactly one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub content: String,
    pub timestamp: String,
}

/// How the author chose to present themselves on a new post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorIdentity {
    Anonymous,
    Named(String),
}

impl AuthorIdentity {
    /// Resolves the display name stored on the post.
    ///
    /// A named identity with a blank name falls back to a generic label.
    pub fn display_name(&self) -> String {
        match self {
            Self::Anonymous => ANONYMOUS_AUTHOR.to_string(),
            Self::Named(name) => {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    UNNAMED_MEMBER_AUTHOR.to_string()
                } else {
                    trimmed.to_string()
                }
            }
        }
    }
}

/// Validation errors for client-composed feed records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostValidationError {
    EmptyContent,
}

impl Display for PostValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyContent => write!(f, "content cannot be blank"),
        }
    }
}

impl Error for PostValidationError {}

impl Post {
    /// Composes a new post at `now` with zero likes and no comments.
    ///
    /// # Errors
    /// - Returns `EmptyContent` when `content` is blank.
    pub fn compose(
        identity: &AuthorIdentity,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, PostValidationError> {
        let content = require_content(content.into())?;
        Ok(Self {
            id: time_derived_id(now),
            author: identity.display_name(),
            content,
            timestamp: iso_timestamp(now),
            likes: 0,
            comments: Vec::new(),
        })
    }

    /// Increments the like counter by exactly one.
    ///
    /// Saturates instead of wrapping on the (theoretical) `u32::MAX` edge.
    pub fn add_like(&mut self) {
        self.likes = self.likes.saturating_add(1);
    }
}

impl Comment {
    /// Composes a comment authored by the current user at `now`.
    ///
    /// # Errors
    /// - Returns `EmptyContent` when `content` is blank.
    pub fn compose(
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, PostValidationError> {
        let content = require_content(content.into())?;
        Ok(Self {
            id: time_derived_id(now),
            author: COMMENT_AUTHOR.to_string(),
            content,
            timestamp: iso_timestamp(now),
        })
    }
}

/// Epoch-millisecond identifier, matching what the feed UI generates.
pub fn time_derived_id(now: DateTime<Utc>) -> String {
    now.timestamp_millis().to_string()
}

/// ISO-8601 UTC timestamp with millisecond precision and a `Z` suffix.
pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn require_content(content: String) -> Result<String, PostValidationError> {
    if content.trim().is_empty() {
        return Err(PostValidationError::EmptyContent);
    }
    Ok(content)
}
