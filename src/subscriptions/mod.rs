//! Change notifications for timeline stores.
//!
//! The presentation layer never mutates a store; it subscribes here and
//! re-reads `filtered_snapshot` when told something changed.
//!
//! Subscriptions support:
//! - Filtering by change kind (additions, replacements, removals)
//! - Bounded buffers with slow-subscriber dropping
//!
//! # Example
//!
//! ```ignore
//! let handle = store.subscribe(SubscriptionConfig::default());
//!
//! loop {
//!     match handle.recv() {
//!         Ok(TimelineChange::Dropped { .. }) | Err(_) => break,
//!         Ok(_) => render(store.filtered_snapshot(&filter.get())),
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::ChangeNotifier;
pub use types::{
    ChangeFilter, DropReason, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
    TimelineChange,
};
