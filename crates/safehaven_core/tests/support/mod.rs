//! Shared fakes for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream;
use safehaven_core::chat::{ChatBackend, ChatError, ChatRequest, ChatResult, FragmentStream};
use safehaven_core::model::post::{Comment, Post};
use safehaven_core::model::report::ReportPayload;
use safehaven_core::remote::{RemoteApi, RemoteError, RemoteResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory remote service that can be switched offline.
#[derive(Default)]
pub struct ScriptedRemote {
    online: AtomicBool,
    posts: Mutex<Vec<Post>>,
    reports: Mutex<Vec<ReportPayload>>,
    calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl ScriptedRemote {
    pub fn online(posts: Vec<Post>) -> Self {
        let remote = Self::default();
        remote.online.store(true, Ordering::SeqCst);
        *remote.posts.lock().unwrap() = posts;
        remote
    }

    pub fn offline() -> Self {
        Self::default()
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of remote calls attempted, reachable or not.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn posts(&self) -> Vec<Post> {
        self.posts.lock().unwrap().clone()
    }

    pub fn reports(&self) -> Vec<ReportPayload> {
        self.reports.lock().unwrap().clone()
    }

    fn attempt(&self) -> RemoteResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::Status {
                status: 503,
                endpoint: "scripted".to_string(),
            })
        }
    }

    fn with_post(&self, post_id: &str, update: impl FnOnce(&mut Post)) -> RemoteResult<()> {
        let mut posts = self.posts.lock().unwrap();
        match posts.iter_mut().find(|post| post.id == post_id) {
            Some(post) => {
                update(post);
                Ok(())
            }
            None => Err(RemoteError::Status {
                status: 404,
                endpoint: format!("posts/{post_id}"),
            }),
        }
    }
}

#[async_trait]
impl RemoteApi for ScriptedRemote {
    async fn health(&self) -> bool {
        self.attempt().is_ok()
    }

    async fn fetch_posts(&self) -> RemoteResult<Vec<Post>> {
        self.attempt()?;
        Ok(self.posts())
    }

    async fn create_post(&self, post: &Post) -> RemoteResult<()> {
        self.attempt()?;
        let mut stored = post.clone();
        stored.id = format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.posts.lock().unwrap().insert(0, stored);
        Ok(())
    }

    async fn add_comment(&self, post_id: &str, comment: &Comment) -> RemoteResult<()> {
        self.attempt()?;
        self.with_post(post_id, |post| post.comments.push(comment.clone()))
    }

    async fn like_post(&self, post_id: &str) -> RemoteResult<()> {
        self.attempt()?;
        self.with_post(post_id, |post| post.likes += 1)
    }

    async fn submit_report(&self, report: &ReportPayload) -> RemoteResult<()> {
        self.attempt()?;
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

/// One scripted stream item: a text fragment or a mid-stream failure.
#[derive(Debug, Clone)]
pub enum Scripted {
    Text(&'static str),
    Fail,
}

/// Chat backend replaying a fixed script per call and recording requests.
#[derive(Default)]
pub struct ScriptedChat {
    replies: Mutex<Vec<Vec<Scripted>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChat {
    /// Each inner list is the fragment sequence of one reply, in call order.
    pub fn with_replies(replies: Vec<Vec<Scripted>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedChat {
    async fn stream_reply(&self, request: &ChatRequest) -> ChatResult<FragmentStream> {
        self.requests.lock().unwrap().push(request.clone());
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Err(ChatError::Api {
                status: 503,
                message: "no scripted reply".to_string(),
            });
        }
        let items: Vec<ChatResult<String>> = replies
            .remove(0)
            .into_iter()
            .map(|item| match item {
                Scripted::Text(text) => Ok(text.to_string()),
                Scripted::Fail => Err(ChatError::Api {
                    status: 500,
                    message: "stream interrupted".to_string(),
                }),
            })
            .collect();
        Ok(Box::pin(stream::iter(items)))
    }
}
