//! Client configuration.

use crate::api::DEFAULT_PAGE_SIZE;
use crate::cache::DEFAULT_MAX_CACHED_POSTS;
use crate::stream::{StreamConfig, DEFAULT_RECONNECT_DELAY};
use std::path::PathBuf;
use std::time::Duration;

/// Pipeline configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Posts requested per page.
    /// Default: 40
    pub page_size: usize,

    /// Pause before reconnecting the stream after a failure.
    /// Default: 10s
    pub reconnect_delay: Duration,

    /// Upper bound on pages fetched to fill the gap after a reconnect.
    /// Default: 5
    pub reconnect_max_pages: usize,

    /// Capacity of the stream signal channel.
    /// Default: 256
    pub signal_buffer: usize,

    /// Directory for on-disk timeline snapshots (None = no cache).
    pub cache_dir: Option<PathBuf>,

    /// Newest posts kept per cached timeline.
    /// Default: 800
    pub max_cached_posts: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            reconnect_max_pages: 5,
            signal_buffer: 256,
            cache_dir: None,
            max_cached_posts: DEFAULT_MAX_CACHED_POSTS,
        }
    }
}

impl ClientConfig {
    /// Connection settings derived from this config.
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            reconnect_delay: self.reconnect_delay,
            signal_buffer: self.signal_buffer,
        }
    }
}
