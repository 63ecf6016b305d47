//! REST side of the pipeline: sessions, single-page sources and pagination.

mod fetcher;
pub(crate) mod rest;
mod session;
mod source;

pub use fetcher::{PageFetcher, DEFAULT_PAGE_SIZE};
pub use rest::RestTimelineSource;
pub use session::{NoSession, Session, SessionProvider, StaticSession};
pub use source::{PageQuery, TimelineSource};
