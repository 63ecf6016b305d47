//! Subscription types for timeline change notifications.

use crate::types::PostId;
use serde::{Deserialize, Serialize};

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered changes before dropping subscriber.
    /// Default: 1000
    pub buffer_size: usize,

    /// Filter criteria.
    pub filter: ChangeFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            filter: ChangeFilter::all(),
        }
    }
}

/// Which kinds of change a subscriber wants.
#[derive(Clone, Debug, Default)]
pub struct ChangeFilter {
    /// Posts added at the head or tail, or the whole sequence replaced.
    pub include_additions: bool,

    /// Posts edited in place.
    pub include_replacements: bool,

    /// Posts removed or truncated away.
    pub include_removals: bool,
}

impl ChangeFilter {
    /// Everything.
    pub fn all() -> Self {
        Self {
            include_additions: true,
            include_replacements: true,
            include_removals: true,
        }
    }

    /// Only additions (new posts, refreshes).
    pub fn additions() -> Self {
        Self {
            include_additions: true,
            ..Default::default()
        }
    }

    /// Only removals.
    pub fn removals() -> Self {
        Self {
            include_removals: true,
            ..Default::default()
        }
    }

    pub(crate) fn matches(&self, change: &TimelineChange) -> bool {
        match change {
            TimelineChange::Reset { .. }
            | TimelineChange::Inserted { .. }
            | TimelineChange::Appended { .. } => self.include_additions,
            TimelineChange::Replaced { .. } => self.include_replacements,
            TimelineChange::Removed { .. } | TimelineChange::Truncated { .. } => {
                self.include_removals
            }
            TimelineChange::Dropped { .. } => true,
        }
    }
}

/// Changes emitted by a timeline store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimelineChange {
    /// The whole sequence was replaced (fresh load or clear).
    Reset { len: usize },

    /// `ids` were inserted starting at `index`.
    Inserted { index: usize, ids: Vec<PostId> },

    /// `ids` were added at the tail.
    Appended { ids: Vec<PostId> },

    /// The post at `index` was replaced by an edited version.
    Replaced { index: usize, id: PostId },

    /// A single post was removed.
    Removed { index: usize, id: PostId },

    /// Everything from `from` to the end was dropped.
    Truncated { from: usize, removed: usize },

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to manage a subscription.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Channel to receive changes.
    pub receiver: crossbeam_channel::Receiver<TimelineChange>,
}

impl SubscriptionHandle {
    /// Receive the next change (blocking).
    pub fn recv(&self) -> Result<TimelineChange, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a change (non-blocking).
    pub fn try_recv(&self) -> Result<TimelineChange, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<TimelineChange, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently buffered.
    pub fn drain(&self) -> Vec<TimelineChange> {
        self.receiver.try_iter().collect()
    }
}
