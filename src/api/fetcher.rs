//! Pagination on top of a [`TimelineSource`].

use crate::api::source::{PageQuery, TimelineSource};
use crate::error::{Result, TimelineError};
use crate::types::{Post, PostId, TimelineKind};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Default number of posts requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 40;

/// Stateless page fetcher for one timeline. Every call is an independent
/// request; failures come back verbatim and are never retried here.
pub struct PageFetcher<S> {
    source: Arc<S>,
    kind: TimelineKind,
    page_size: usize,
}

impl<S> Clone for PageFetcher<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            kind: self.kind,
            page_size: self.page_size,
        }
    }
}

impl<S: TimelineSource> PageFetcher<S> {
    pub fn new(source: Arc<S>, kind: TimelineKind) -> Self {
        Self::with_page_size(source, kind, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(source: Arc<S>, kind: TimelineKind, page_size: usize) -> Self {
        Self {
            source,
            kind,
            page_size: page_size.max(1),
        }
    }

    pub fn kind(&self) -> TimelineKind {
        self.kind
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Latest page, no cursor.
    pub async fn fetch_first_page(&self) -> Result<Vec<Post>> {
        self.source
            .fetch_page(
                self.kind,
                PageQuery {
                    limit: Some(self.page_size),
                    ..Default::default()
                },
            )
            .await
    }

    /// Everything newer than `min_id`, up to `max_pages` requests.
    ///
    /// Each round asks for the page right after the newest id seen so far and
    /// puts it in front of what was already collected, so the result stays
    /// newest first. Stops at the first empty page. Cancellation is checked
    /// once per round and discards the partial result.
    pub async fn fetch_new_pages(
        &self,
        min_id: PostId,
        max_pages: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Post>> {
        let mut collected: Vec<Post> = Vec::new();
        let mut min_id = min_id;

        for round in 0..max_pages {
            if cancel.is_cancelled() {
                tracing::debug!(round, "new-page backfill cancelled");
                return Err(TimelineError::Cancelled);
            }

            let page = self
                .source
                .fetch_page(
                    self.kind,
                    PageQuery {
                        min_id: Some(min_id.clone()),
                        limit: Some(self.page_size),
                        ..Default::default()
                    },
                )
                .await?;

            let Some(newest) = page.first() else {
                break;
            };
            min_id = newest.id.clone();

            let mut merged = page;
            merged.append(&mut collected);
            collected = merged;
        }

        Ok(collected)
    }

    /// The page older than `last_id`.
    pub async fn fetch_next_page(&self, last_id: PostId, offset: usize) -> Result<Vec<Post>> {
        self.source
            .fetch_page(
                self.kind,
                PageQuery {
                    max_id: Some(last_id),
                    offset: Some(offset),
                    limit: Some(self.page_size),
                    ..Default::default()
                },
            )
            .await
    }
}
