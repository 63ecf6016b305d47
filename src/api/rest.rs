//! REST timeline source over reqwest.

use crate::api::session::SessionProvider;
use crate::api::source::{PageQuery, TimelineSource};
use crate::error::{Result, TimelineError};
use crate::types::{Post, TimelineKind};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// Join `path` onto the server base URL, treating the base as a directory.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    Ok(base.join(path)?)
}

/// Longest error body kept in [`TimelineError::Http`], in chars.
const MAX_ERROR_BODY: usize = 200;

/// User-facing text for a failed response: the body cut to
/// `MAX_ERROR_BODY` chars, or the status reason when the body is blank.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status.canonical_reason().unwrap_or("request failed").to_string();
    }
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}

/// Fetches timeline pages from `{base}/api/v1/timelines/...`.
pub struct RestTimelineSource {
    http: reqwest::Client,
    sessions: Arc<dyn SessionProvider>,
}

impl RestTimelineSource {
    pub fn new(sessions: Arc<dyn SessionProvider>) -> Self {
        Self::with_client(reqwest::Client::new(), sessions)
    }

    pub fn with_client(http: reqwest::Client, sessions: Arc<dyn SessionProvider>) -> Self {
        Self { http, sessions }
    }
}

#[async_trait]
impl TimelineSource for RestTimelineSource {
    #[tracing::instrument(level = "debug", skip(self), fields(timeline = kind.as_str()))]
    async fn fetch_page(&self, kind: TimelineKind, query: PageQuery) -> Result<Vec<Post>> {
        let session = self
            .sessions
            .session()
            .ok_or(TimelineError::NoClientAvailable)?;
        let url = endpoint(&session.base_url, kind.path())?;

        let resp = self
            .http
            .get(url)
            .bearer_auth(&session.token)
            .query(kind.fixed_query())
            .query(&query.to_pairs())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TimelineError::Http {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        let body = resp.bytes().await?;
        let posts: Vec<Post> = serde_json::from_slice(&body)?;
        tracing::debug!(count = posts.len(), "fetched timeline page");
        Ok(posts)
    }
}
