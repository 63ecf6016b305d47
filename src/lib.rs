//! # NeoDB Timeline
//!
//! Timeline ingestion and reconciliation for NeoDB / Mastodon-compatible
//! clients: paginated REST fetches and a live streaming socket merged into
//! one ordered, deduplicated, filtered list of posts.
//!
//! ## Core Concepts
//!
//! - **TimelineStore**: serialized, duplicate-free sequence of posts
//! - **PageFetcher**: first page, new pages since an id, next page before an id
//! - **StreamConnection**: live socket with fixed-delay reconnect
//! - **TimelineController**: the only writer; merges pages and live events
//! - **ContentFilter**: query-time toggles for replies, boosts, threads, quotes
//!
//! ## Example
//!
//! ```ignore
//! use neodb_timeline::*;
//!
//! let sessions: Arc<dyn SessionProvider> = Arc::new(StaticSession::new(session));
//! let config = ClientConfig::default();
//!
//! let source = Arc::new(RestTimelineSource::new(sessions.clone()));
//! let controller = TimelineController::from_source(source, TimelineKind::Home, &config)?;
//! controller.load(true).await?;
//!
//! let connection = StreamConnection::new(
//!     Arc::new(WebSocketTransport::new(sessions)),
//!     config.stream_config(),
//! );
//! connection.subscribe([TimelineKind::Home.stream_name()]);
//! let signals = connection.connect();
//! controller.run(signals, CancellationToken::new()).await;
//!
//! let visible = controller.store().filtered_snapshot(&filter.get());
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod registry;
pub mod stream;
pub mod subscriptions;
pub mod timeline;
pub mod types;

// Re-exports
pub use api::{
    NoSession, PageFetcher, PageQuery, RestTimelineSource, Session, SessionProvider,
    StaticSession, TimelineSource,
};
pub use cache::TimelineCache;
pub use config::ClientConfig;
pub use error::{Result, TimelineError};
pub use filter::{ContentFilter, SharedFilter};
pub use registry::ControllerRegistry;
pub use stream::{
    ConnectionState, MemoryTransport, ReceivedEvent, StreamConfig, StreamConnection, StreamEvent,
    StreamSignal, StreamSocket, StreamTransport, WebSocketTransport,
};
pub use subscriptions::{
    ChangeFilter, DropReason, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
    TimelineChange,
};
pub use timeline::{ControllerStatus, LoadOutcome, TimelineController, TimelineStore};
pub use types::*;
