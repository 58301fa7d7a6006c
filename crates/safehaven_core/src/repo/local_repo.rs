//! Typed local fallback collections over a key/value store.
//!
//! # Responsibility
//! - Serialize the posts and reports collections as JSON under fixed keys.
//! - Apply the local equivalents of remote writes (prepend, like, comment,
//!   append report) as one read-modify-write each.
//! - Seed an uninitialized posts collection with the built-in examples.
//!
//! # Invariants
//! - Reads of the posts collection always yield a usable list; missing or
//!   unreadable data is replaced by the seed and written back.
//! - Unreadable report data is moved aside, never overwritten in place.
//! - Writes that fail to persist still return the updated in-memory list.

use crate::model::post::{Comment, Post};
use crate::model::report::LocalReport;
use crate::model::seed::seed_posts;
use crate::repo::kv_store::{KeyValueStore, KvError};
use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const POSTS_KEY: &str = "safehaven_posts";
pub const REPORTS_KEY: &str = "safehaven_reports";

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Kv(KvError),
    /// Stored bytes under `key` are not a valid collection.
    Corrupt {
        key: &'static str,
        source: serde_json::Error,
    },
    Encode(serde_json::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kv(err) => write!(f, "{err}"),
            Self::Corrupt { key, source } => {
                write!(f, "stored collection `{key}` is unreadable: {source}")
            }
            Self::Encode(err) => write!(f, "failed to encode collection: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Kv(err) => Some(err),
            Self::Corrupt { source, .. } => Some(source),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<KvError> for RepoError {
    fn from(value: KvError) -> Self {
        Self::Kv(value)
    }
}

/// Local fallback store for posts and reports.
pub struct LocalRepository<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> LocalRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads the stored posts, `None` when never initialized.
    pub fn load_posts(&self) -> RepoResult<Option<Vec<Post>>> {
        self.read_json(POSTS_KEY)
    }

    pub fn save_posts(&self, posts: &[Post]) -> RepoResult<()> {
        self.write_json(POSTS_KEY, posts)
    }

    /// Returns the stored posts, seeding (and persisting) when needed.
    pub fn posts_or_seed(&self) -> Vec<Post> {
        match self.load_posts() {
            Ok(Some(posts)) => return posts,
            Ok(None) => debug!("event=local_seed module=local_repo status=start reason=empty"),
            Err(err) => warn!(
                "event=local_seed module=local_repo status=start reason=unreadable error={err}"
            ),
        }

        let seed = seed_posts();
        self.persist_posts(&seed);
        seed
    }

    /// Inserts `post` at the front (most recent first) and persists.
    pub fn prepend_post(&self, post: Post) -> Vec<Post> {
        let mut posts = self.posts_or_seed();
        posts.insert(0, post);
        self.persist_posts(&posts);
        posts
    }

    /// Adds exactly one like to the post with `post_id`, if present.
    pub fn increment_likes(&self, post_id: &str) -> Vec<Post> {
        self.update_post(post_id, Post::add_like)
    }

    /// Appends `comment` after the existing comments of `post_id`, if present.
    pub fn append_comment(&self, post_id: &str, comment: Comment) -> Vec<Post> {
        self.update_post(post_id, move |post| post.comments.push(comment))
    }

    /// Reads locally kept reports; an uninitialized list is empty.
    pub fn load_reports(&self) -> RepoResult<Vec<LocalReport>> {
        Ok(self.read_json(REPORTS_KEY)?.unwrap_or_default())
    }

    /// Appends `report` to the local report list.
    ///
    /// An unreadable existing list is preserved under a side key before a
    /// fresh list is started.
    pub fn append_report(&self, report: LocalReport) -> RepoResult<()> {
        let mut reports = match self.load_reports() {
            Ok(reports) => reports,
            Err(RepoError::Corrupt { .. }) => {
                self.quarantine(REPORTS_KEY, &report.id)?;
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        reports.push(report);
        self.write_json(REPORTS_KEY, &reports)
    }

    fn update_post(&self, post_id: &str, apply: impl FnOnce(&mut Post)) -> Vec<Post> {
        let mut posts = self.posts_or_seed();
        match posts.iter_mut().find(|post| post.id == post_id) {
            Some(post) => apply(post),
            None => debug!("event=local_update module=local_repo status=skipped post_id={post_id}"),
        }
        self.persist_posts(&posts);
        posts
    }

    fn persist_posts(&self, posts: &[Post]) {
        if let Err(err) = self.save_posts(posts) {
            error!(
                "event=local_write module=local_repo status=error key={POSTS_KEY} count={} error={err}",
                posts.len()
            );
        }
    }

    fn quarantine(&self, key: &'static str, suffix: &str) -> RepoResult<()> {
        if let Some(raw) = self.store.get(key)? {
            let side_key = format!("{key}.corrupt.{suffix}");
            self.store.set(&side_key, &raw)?;
            warn!("event=local_quarantine module=local_repo status=ok key={key} moved_to={side_key}");
        }
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, key: &'static str) -> RepoResult<Option<T>> {
        match self.store.get(key)? {
            Some(raw) => serde_json::from_slice(&raw)
                .map(Some)
                .map_err(|source| RepoError::Corrupt { key, source }),
            None => Ok(None),
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> RepoResult<()> {
        let raw = serde_json::to_vec(value).map_err(RepoError::Encode)?;
        self.store.set(key, &raw)?;
        Ok(())
    }
}
