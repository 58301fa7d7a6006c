//! reqwest-backed implementation of `RemoteApi`.
//!
//! # Responsibility
//! - Map each remote operation onto its REST endpoint.
//! - Tag requests with an `X-Request-Id` for log correlation.
//!
//! # Invariants
//! - Collection endpoints keep their trailing slash (`/posts/`).
//! - Only 2xx responses count as success.

use super::{RemoteApi, RemoteError, RemoteResult};
use crate::model::post::{Comment, Post};
use crate::model::report::ReportPayload;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, Response, Url};
use std::time::{Duration, Instant};
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP client for the posts/reports backend.
#[derive(Debug, Clone)]
pub struct HttpRemoteApi {
    client: Client,
    base_url: Url,
}

impl HttpRemoteApi {
    /// Builds a client rooted at `base_url` (for example
    /// `http://localhost:5000/api`) with a per-request `timeout`.
    ///
    /// # Errors
    /// - `Config` when `base_url` is not an absolute http(s) URL.
    /// - `Transport` when the HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteError::Transport)?;
        Self::with_client(client, base_url)
    }

    /// Uses a caller-provided client (shared pools, custom TLS).
    pub fn with_client(client: Client, base_url: &str) -> RemoteResult<Self> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|err| RemoteError::Config(format!("invalid base url `{base_url}`: {err}")))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(RemoteError::Config(format!(
                "base url `{base_url}` must be an absolute http(s) url"
            )));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `segments` below the base path, always ending in `/`.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments).push("");
        }
        url
    }

    async fn send(&self, request: RequestBuilder, endpoint: &Url) -> RemoteResult<Response> {
        let request_id = Uuid::new_v4();
        let started_at = Instant::now();
        let result = request
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                debug!(
                    "event=remote_call module=remote status=error path={} request_id={} duration_ms={} error_code=transport",
                    endpoint.path(),
                    request_id,
                    started_at.elapsed().as_millis()
                );
                return Err(RemoteError::Transport(err));
            }
        };

        let status = response.status();
        debug!(
            "event=remote_call module=remote status={} path={} http_status={} request_id={} duration_ms={}",
            if status.is_success() { "ok" } else { "error" },
            endpoint.path(),
            status.as_u16(),
            request_id,
            started_at.elapsed().as_millis()
        );

        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                endpoint: endpoint.path().to_string(),
            });
        }
        Ok(response)
    }

    async fn post_json<T: serde::Serialize + ?Sized + Sync>(
        &self,
        segments: &[&str],
        body: &T,
    ) -> RemoteResult<()> {
        let url = self.endpoint(segments);
        let request = self.client.post(url.clone()).json(body);
        self.send(request, &url).await.map(|_| ())
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn health(&self) -> bool {
        let url = self.endpoint(&["posts"]);
        self.send(self.client.get(url.clone()), &url).await.is_ok()
    }

    async fn fetch_posts(&self) -> RemoteResult<Vec<Post>> {
        let url = self.endpoint(&["posts"]);
        let response = self.send(self.client.get(url.clone()), &url).await?;
        response.json::<Vec<Post>>().await.map_err(RemoteError::Decode)
    }

    async fn create_post(&self, post: &Post) -> RemoteResult<()> {
        self.post_json(&["posts"], post).await
    }

    async fn add_comment(&self, post_id: &str, comment: &Comment) -> RemoteResult<()> {
        self.post_json(&["posts", post_id, "comments"], comment)
            .await
    }

    async fn like_post(&self, post_id: &str) -> RemoteResult<()> {
        // The like endpoint takes no body, but still expects a JSON content type.
        self.post_json(&["posts", post_id, "like"], &serde_json::json!({}))
            .await
    }

    async fn submit_report(&self, report: &ReportPayload) -> RemoteResult<()> {
        self.post_json(&["reports"], report).await
    }
}
