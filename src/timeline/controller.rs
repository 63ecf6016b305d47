//! Orchestrates pagination and live events into one [`TimelineStore`].

use crate::api::{PageFetcher, TimelineSource};
use crate::cache::TimelineCache;
use crate::config::ClientConfig;
use crate::error::{Result, TimelineError};
use crate::stream::{ReceivedEvent, StreamEvent, StreamSignal};
use crate::timeline::store::TimelineStore;
use crate::types::{PostId, TimelineKind};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// What a `load` call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and applied.
    Loaded { count: usize },
    /// Another load was already running.
    InProgress,
    /// The last page came back empty; nothing more to fetch.
    NoMore,
    /// A previous failure stopped pagination until the next refresh.
    Halted,
}

/// Read-only view of the controller's bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerStatus {
    pub has_more: bool,
    pub is_loading: bool,
    /// User-visible error from the last failed fetch.
    pub error: Option<String>,
    /// Oldest id fetched so far; next page starts below it.
    pub cursor: Option<PostId>,
}

#[derive(Default)]
struct Pagination {
    cursor: Option<PostId>,
    loaded: bool,
    has_more: bool,
    error: Option<String>,
}

/// Resets the loading flag however the load ends, including cancellation.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Sole writer of one timeline's store.
pub struct TimelineController<S> {
    store: Arc<TimelineStore>,
    fetcher: PageFetcher<S>,
    reconnect_max_pages: usize,
    pagination: Mutex<Pagination>,
    loading: AtomicBool,
    cache: Option<TimelineCache>,
}

impl<S: TimelineSource> TimelineController<S> {
    pub fn new(fetcher: PageFetcher<S>, config: &ClientConfig) -> Result<Self> {
        let cache = match &config.cache_dir {
            Some(dir) => Some(TimelineCache::with_limit(dir, config.max_cached_posts)?),
            None => None,
        };
        Ok(Self {
            store: Arc::new(TimelineStore::new()),
            fetcher,
            reconnect_max_pages: config.reconnect_max_pages,
            pagination: Mutex::new(Pagination::default()),
            loading: AtomicBool::new(false),
            cache,
        })
    }

    /// Controller for `kind` reading pages from `source`.
    pub fn from_source(source: Arc<S>, kind: TimelineKind, config: &ClientConfig) -> Result<Self> {
        Self::new(
            PageFetcher::with_page_size(source, kind, config.page_size),
            config,
        )
    }

    /// The store, for readers.
    pub fn store(&self) -> Arc<TimelineStore> {
        Arc::clone(&self.store)
    }

    pub fn kind(&self) -> TimelineKind {
        self.fetcher.kind()
    }

    pub fn status(&self) -> ControllerStatus {
        let pagination = self.pagination.lock();
        ControllerStatus {
            has_more: pagination.has_more,
            is_loading: self.loading.load(Ordering::SeqCst),
            error: pagination.error.clone(),
            cursor: pagination.cursor.clone(),
        }
    }

    pub fn error(&self) -> Option<String> {
        self.pagination.lock().error.clone()
    }

    fn fail(&self, error: &TimelineError) {
        tracing::warn!(timeline = self.kind().as_str(), %error, "timeline fetch failed");
        let mut pagination = self.pagination.lock();
        pagination.error = Some(error.to_string());
        pagination.has_more = false;
    }

    /// Fetch the first page (`refresh`, or nothing loaded yet) or the next
    /// older page.
    pub async fn load(&self, refresh: bool) -> Result<LoadOutcome> {
        if self.loading.swap(true, Ordering::SeqCst) {
            return Ok(LoadOutcome::InProgress);
        }
        let _loading = LoadingGuard(&self.loading);

        let cursor = {
            let pagination = self.pagination.lock();
            if refresh {
                None
            } else if pagination.error.is_some() {
                return Ok(LoadOutcome::Halted);
            } else if pagination.loaded && !pagination.has_more {
                return Ok(LoadOutcome::NoMore);
            } else {
                pagination.cursor.clone()
            }
        };

        match cursor {
            None => self.load_first_page().await,
            Some(last_id) => self.load_next_page(last_id).await,
        }
    }

    async fn load_first_page(&self) -> Result<LoadOutcome> {
        {
            let mut pagination = self.pagination.lock();
            pagination.cursor = None;
            pagination.error = None;
        }

        let posts = match self.fetcher.fetch_first_page().await {
            Ok(posts) => posts,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        let count = posts.len();
        let tail = posts.last().map(|p| p.id.clone());
        self.store.set(posts);
        {
            let mut pagination = self.pagination.lock();
            pagination.cursor = tail;
            pagination.loaded = true;
            pagination.has_more = count > 0;
        }
        tracing::info!(timeline = self.kind().as_str(), count, "timeline refreshed");

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.save(self.kind(), &self.store.snapshot()) {
                tracing::warn!(error = %e, "could not write timeline cache");
            }
        }
        Ok(LoadOutcome::Loaded { count })
    }

    async fn load_next_page(&self, last_id: PostId) -> Result<LoadOutcome> {
        let offset = self.store.len();
        let posts = match self.fetcher.fetch_next_page(last_id, offset).await {
            Ok(posts) => posts,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        let count = posts.len();
        let tail = posts.last().map(|p| p.id.clone());
        self.store.append_all(posts);
        {
            let mut pagination = self.pagination.lock();
            if tail.is_some() {
                pagination.cursor = tail;
            }
            pagination.has_more = count > 0;
        }
        tracing::debug!(timeline = self.kind().as_str(), count, offset, "next page loaded");
        Ok(LoadOutcome::Loaded { count })
    }

    /// Merge one live event. Returns whether the store changed.
    pub fn on_stream_event(&self, event: &StreamEvent) -> bool {
        // Lookup and write go through one store call so a concurrent
        // refresh never sees half of it.
        match event {
            StreamEvent::Update(post) => self.store.insert_if_absent(post.clone(), 0),
            StreamEvent::StatusUpdate(post) => {
                self.store.replace_or_insert(post.clone(), 0);
                true
            }
            StreamEvent::Delete(id) => self.store.remove(id).is_some(),
        }
    }

    /// Whether an event tagged with these streams belongs to this timeline.
    /// Untagged events are accepted.
    pub fn accepts(&self, received: &ReceivedEvent) -> bool {
        received.streams.is_empty() || received.streams.contains(&self.kind().stream_name())
    }

    /// Fill the gap left by a stream outage. Returns how many posts were inserted.
    pub async fn on_reconnect(&self, cancel: &CancellationToken) -> Result<usize> {
        let Some(top) = self.store.first() else {
            return match self.load(true).await? {
                LoadOutcome::Loaded { count } => Ok(count),
                _ => Ok(0),
            };
        };

        let posts = match self
            .fetcher
            .fetch_new_pages(top.id, self.reconnect_max_pages, cancel)
            .await
        {
            Ok(posts) => posts,
            Err(TimelineError::Cancelled) => return Err(TimelineError::Cancelled),
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };
        if cancel.is_cancelled() {
            return Err(TimelineError::Cancelled);
        }

        let inserted = self.store.insert_all(posts, 0);
        tracing::info!(timeline = self.kind().as_str(), inserted, "backfilled after reconnect");
        Ok(inserted)
    }

    /// Seed an empty store from the on-disk cache. Returns how many posts were restored.
    pub fn restore_from_cache(&self) -> Result<usize> {
        let Some(cache) = &self.cache else {
            return Ok(0);
        };
        if !self.store.is_empty() {
            return Ok(0);
        }
        let Some(posts) = cache.load(self.kind())? else {
            return Ok(0);
        };

        let tail = posts.last().map(|p| p.id.clone());
        self.store.set(posts);
        let restored = self.store.len();
        let mut pagination = self.pagination.lock();
        pagination.cursor = tail;
        pagination.loaded = true;
        pagination.has_more = restored > 0;
        Ok(restored)
    }

    /// Pump stream signals into the store until the channel closes or
    /// `cancel` fires.
    pub async fn run(&self, mut signals: mpsc::Receiver<StreamSignal>, cancel: CancellationToken) {
        loop {
            let signal = tokio::select! {
                _ = cancel.cancelled() => break,
                signal = signals.recv() => signal,
            };
            match signal {
                None => break,
                Some(StreamSignal::Event(received)) => {
                    if self.accepts(&received) {
                        self.on_stream_event(&received.event);
                    }
                }
                Some(StreamSignal::Reconnected) => match self.on_reconnect(&cancel).await {
                    Ok(_) | Err(TimelineError::Cancelled) => {}
                    Err(e) => tracing::warn!(error = %e, "reconnect backfill failed"),
                },
                Some(StreamSignal::Connected) => {
                    tracing::debug!(timeline = self.kind().as_str(), "stream connected");
                }
                Some(StreamSignal::Disconnected { reason }) => {
                    tracing::debug!(timeline = self.kind().as_str(), %reason, "stream disconnected");
                }
            }
        }
    }
}
