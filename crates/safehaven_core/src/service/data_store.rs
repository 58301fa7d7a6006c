//! Resilient data store facade.
//!
//! # Responsibility
//! - Present one read/write contract over posts and reports.
//! - Prefer the remote service and substitute the local fallback store when
//!   a remote call fails.
//! - Resync from the remote after every successful remote write.
//!
//! # Invariants
//! - Each operation attempts its remote call at most once.
//! - A write's fallback path reads only the local collection.
//! - No public operation returns an error; every path yields a usable value.
//! - Health checks are informational and never gate other operations.

use crate::model::post::{iso_timestamp, time_derived_id, Comment, Post};
use crate::model::report::{LocalReport, Report};
use crate::remote::{RemoteApi, RemoteError};
use crate::repo::kv_store::KeyValueStore;
use crate::repo::local_repo::LocalRepository;
use chrono::{Local, Utc};
use log::{error, info, warn};

/// Which data source produced an operation's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched<T> {
    /// The remote service answered successfully.
    Remote(T),
    /// The remote call failed and the local store answered instead.
    Fallback(T),
}

impl<T> Fetched<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Remote(value) | Self::Fallback(value) => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    pub fn source_label(&self) -> &'static str {
        match self {
            Self::Remote(_) => "remote",
            Self::Fallback(_) => "local",
        }
    }
}

/// Facade over a remote service and a local key/value fallback store.
pub struct DataStore<R: RemoteApi, S: KeyValueStore> {
    remote: R,
    local: LocalRepository<S>,
}

impl<R: RemoteApi, S: KeyValueStore> DataStore<R, S> {
    pub fn new(remote: R, store: S) -> Self {
        Self {
            remote,
            local: LocalRepository::new(store),
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn local(&self) -> &LocalRepository<S> {
        &self.local
    }

    /// Reports whether the remote posts endpoint is reachable.
    pub async fn check_health(&self) -> bool {
        let connected = self.remote.health().await;
        info!("event=health_check module=data_store status=ok connected={connected}");
        connected
    }

    /// Returns all posts, newest first, from the best available source.
    pub async fn get_posts(&self) -> Vec<Post> {
        self.get_posts_traced().await.into_inner()
    }

    pub async fn get_posts_traced(&self) -> Fetched<Vec<Post>> {
        let outcome = match self.remote.fetch_posts().await {
            Ok(posts) => Fetched::Remote(posts),
            Err(err) => {
                log_fallback("posts_read", None, &err);
                Fetched::Fallback(self.local.posts_or_seed())
            }
        };
        log_outcome("posts_read", &outcome);
        outcome
    }

    /// Submits `post` and returns the resulting collection.
    ///
    /// The caller-supplied id may be replaced by the remote service.
    pub async fn add_post(&self, post: Post) -> Vec<Post> {
        self.add_post_traced(post).await.into_inner()
    }

    pub async fn add_post_traced(&self, post: Post) -> Fetched<Vec<Post>> {
        match self.remote.create_post(&post).await {
            Ok(()) => self.resync("post_create").await,
            Err(err) => {
                log_fallback("post_create", Some(post.id.as_str()), &err);
                Fetched::Fallback(self.local.prepend_post(post))
            }
        }
    }

    /// Adds one like to `post_id`.
    ///
    /// This is an unconditional increment: repeated calls keep counting up.
    pub async fn toggle_like(&self, post_id: &str) -> Vec<Post> {
        self.toggle_like_traced(post_id).await.into_inner()
    }

    pub async fn toggle_like_traced(&self, post_id: &str) -> Fetched<Vec<Post>> {
        match self.remote.like_post(post_id).await {
            Ok(()) => self.resync("post_like").await,
            Err(err) => {
                log_fallback("post_like", Some(post_id), &err);
                Fetched::Fallback(self.local.increment_likes(post_id))
            }
        }
    }

    /// Appends `comment` to `post_id`'s comments.
    pub async fn add_comment(&self, post_id: &str, comment: Comment) -> Vec<Post> {
        self.add_comment_traced(post_id, comment)
            .await
            .into_inner()
    }

    pub async fn add_comment_traced(&self, post_id: &str, comment: Comment) -> Fetched<Vec<Post>> {
        match self.remote.add_comment(post_id, &comment).await {
            Ok(()) => self.resync("comment_add").await,
            Err(err) => {
                log_fallback("comment_add", Some(post_id), &err);
                Fetched::Fallback(self.local.append_comment(post_id, comment))
            }
        }
    }

    /// Submits `report`; always reports success to the caller.
    ///
    /// A live incident time is resolved against the current local time.
    pub async fn save_report(&self, report: &Report) -> bool {
        self.save_report_traced(report).await.into_inner()
    }

    pub async fn save_report_traced(&self, report: &Report) -> Fetched<bool> {
        let payload = report.to_payload(Local::now().naive_local());
        match self.remote.submit_report(&payload).await {
            Ok(()) => {
                info!("event=report_save module=data_store status=ok source=remote");
                Fetched::Remote(true)
            }
            Err(err) => {
                log_fallback("report_save", None, &err);
                let now = Utc::now();
                let local = LocalReport {
                    payload,
                    id: time_derived_id(now),
                    submitted_at: iso_timestamp(now),
                };
                let report_id = local.id.clone();
                match self.local.append_report(local) {
                    Ok(()) => info!(
                        "event=report_save module=data_store status=ok source=local report_id={report_id}"
                    ),
                    Err(err) => error!(
                        "event=report_save module=data_store status=error source=local report_id={report_id} error={err}"
                    ),
                }
                Fetched::Fallback(true)
            }
        }
    }

    /// Re-reads the full collection after a successful remote write.
    async fn resync(&self, event: &'static str) -> Fetched<Vec<Post>> {
        info!("event={event} module=data_store status=ok source=remote resync=true");
        self.get_posts_traced().await
    }
}

fn log_outcome(event: &str, outcome: &Fetched<Vec<Post>>) {
    let (Fetched::Remote(posts) | Fetched::Fallback(posts)) = outcome;
    info!(
        "event={event} module=data_store status=ok source={} count={}",
        outcome.source_label(),
        posts.len()
    );
}

fn log_fallback(event: &str, post_id: Option<&str>, err: &RemoteError) {
    warn!(
        "event={event} module=data_store status=fallback post_id={} error_code={} error={err}",
        post_id.unwrap_or("-"),
        err.code()
    );
}
