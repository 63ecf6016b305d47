//! Single-page timeline fetch primitive.

use crate::error::Result;
use crate::types::{Post, PostId, TimelineKind};
use async_trait::async_trait;

/// Cursor parameters for one timeline request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageQuery {
    /// Posts strictly older than this id.
    pub max_id: Option<PostId>,
    /// Posts immediately newer than this id.
    pub min_id: Option<PostId>,
    /// Newest posts, but none at or before this id.
    pub since_id: Option<PostId>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl PageQuery {
    /// Query string pairs in wire form.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = &self.max_id {
            pairs.push(("max_id", id.0.clone()));
        }
        if let Some(id) = &self.min_id {
            pairs.push(("min_id", id.0.clone()));
        }
        if let Some(id) = &self.since_id {
            pairs.push(("since_id", id.0.clone()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// Something that can return one page of a timeline, newest first.
#[async_trait]
pub trait TimelineSource: Send + Sync + 'static {
    async fn fetch_page(&self, kind: TimelineKind, query: PageQuery) -> Result<Vec<Post>>;
}
