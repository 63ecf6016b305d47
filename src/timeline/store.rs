//! Serialized, duplicate-free sequence of posts backing one timeline view.

use crate::error::{Result, TimelineError};
use crate::filter::ContentFilter;
use crate::subscriptions::{
    ChangeNotifier, SubscriptionConfig, SubscriptionHandle, SubscriptionId, TimelineChange,
};
use crate::types::{Post, PostId};
use parking_lot::Mutex;
use std::collections::HashSet;

/// Ordered posts, newest first by caller contract.
///
/// Every read and write goes through one mutex, so two mutations never
/// interleave and readers always see a whole state. Ids are unique at all
/// times:
/// - `set` and `append*` keep the entry that was there first
/// - `insert*` keep the newly inserted post and drop the older entry
/// - `insert_if_absent` and `replace_or_insert` look up and write under the
///   same lock, for callers racing a refresh
pub struct TimelineStore {
    posts: Mutex<Vec<Post>>,
    notifier: ChangeNotifier,
}

impl TimelineStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            posts: Mutex::new(Vec::new()),
            notifier: ChangeNotifier::new(),
        }
    }

    // --- Reads ---

    /// Full ordered copy.
    pub fn snapshot(&self) -> Vec<Post> {
        self.posts.lock().clone()
    }

    /// Ordered copy of the posts that pass `filter`.
    pub fn filtered_snapshot(&self, filter: &ContentFilter) -> Vec<Post> {
        self.posts
            .lock()
            .iter()
            .filter(|p| filter.allows(p))
            .cloned()
            .collect()
    }

    /// Position of the first post with `id`.
    pub fn index_of(&self, id: &PostId) -> Option<usize> {
        self.posts.lock().iter().position(|p| &p.id == id)
    }

    pub fn contains(&self, id: &PostId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.posts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.lock().is_empty()
    }

    /// Newest post (head).
    pub fn first(&self) -> Option<Post> {
        self.posts.lock().first().cloned()
    }

    /// Oldest post (tail).
    pub fn last(&self) -> Option<Post> {
        self.posts.lock().last().cloned()
    }

    /// Ids in order.
    pub fn ids(&self) -> Vec<PostId> {
        self.posts.lock().iter().map(|p| p.id.clone()).collect()
    }

    // --- Mutations ---

    /// Replace the entire sequence.
    pub fn set(&self, posts: Vec<Post>) {
        let mut guard = self.posts.lock();
        let mut seen = HashSet::with_capacity(posts.len());
        *guard = posts
            .into_iter()
            .filter(|p| seen.insert(p.id.clone()))
            .collect();
        self.notifier.broadcast(TimelineChange::Reset { len: guard.len() });
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.set(Vec::new());
    }

    /// Add one post at the tail. Returns false if its id is already present.
    pub fn append(&self, post: Post) -> bool {
        self.append_all(vec![post]) == 1
    }

    /// Add posts at the tail, skipping ids already present. Returns how many were added.
    pub fn append_all(&self, posts: Vec<Post>) -> usize {
        let mut guard = self.posts.lock();
        let mut seen: HashSet<PostId> = guard.iter().map(|p| p.id.clone()).collect();
        let mut ids = Vec::new();
        for post in posts {
            if seen.insert(post.id.clone()) {
                ids.push(post.id.clone());
                guard.push(post);
            }
        }
        let added = ids.len();
        if added > 0 {
            self.notifier.broadcast(TimelineChange::Appended { ids });
        }
        added
    }

    /// Insert one post at `index`. An older entry with the same id is removed.
    pub fn insert(&self, post: Post, index: usize) {
        self.insert_all(vec![post], index);
    }

    /// Insert posts at `index`, in the given order.
    ///
    /// Entries already holding one of the incoming ids are removed first, so
    /// the new copy takes their place at the insertion point. `index` is
    /// clamped to the length left after that removal. Returns the number of
    /// posts inserted.
    pub fn insert_all(&self, posts: Vec<Post>, index: usize) -> usize {
        let mut seen = HashSet::with_capacity(posts.len());
        let incoming: Vec<Post> = posts
            .into_iter()
            .filter(|p| seen.insert(p.id.clone()))
            .collect();
        if incoming.is_empty() {
            return 0;
        }

        let mut guard = self.posts.lock();
        let mut index = index;
        let mut position = 0;
        let mut dropped = Vec::new();
        guard.retain(|p| {
            let keep = !seen.contains(&p.id);
            if !keep {
                if position < index {
                    index -= 1;
                }
                dropped.push((position - dropped.len(), p.id.clone()));
            }
            position += 1;
            keep
        });
        // Indices are as of each removal, applied in order.
        for (at, id) in dropped {
            self.notifier
                .broadcast(TimelineChange::Removed { index: at, id });
        }

        let index = index.min(guard.len());
        let ids: Vec<PostId> = incoming.iter().map(|p| p.id.clone()).collect();
        let count = ids.len();
        guard.splice(index..index, incoming);

        self.notifier
            .broadcast(TimelineChange::Inserted { index, ids });
        count
    }

    /// Insert `post` at `index` unless its id is already present. The lookup
    /// and the insert happen under one lock. Returns whether it was inserted.
    pub fn insert_if_absent(&self, post: Post, index: usize) -> bool {
        let mut guard = self.posts.lock();
        if guard.iter().any(|p| p.id == post.id) {
            return false;
        }
        let index = index.min(guard.len());
        let id = post.id.clone();
        guard.insert(index, post);
        self.notifier.broadcast(TimelineChange::Inserted {
            index,
            ids: vec![id],
        });
        true
    }

    /// Replace the entry carrying `post`'s id wherever it sits now, or insert
    /// `post` at `index` when there is none. Returns the replaced entry.
    pub fn replace_or_insert(&self, post: Post, index: usize) -> Option<Post> {
        let mut guard = self.posts.lock();
        match guard.iter().position(|p| p.id == post.id) {
            Some(at) => {
                let id = post.id.clone();
                let previous = std::mem::replace(&mut guard[at], post);
                self.notifier
                    .broadcast(TimelineChange::Replaced { index: at, id });
                Some(previous)
            }
            None => {
                let index = index.min(guard.len());
                let id = post.id.clone();
                guard.insert(index, post);
                self.notifier.broadcast(TimelineChange::Inserted {
                    index,
                    ids: vec![id],
                });
                None
            }
        }
    }

    /// Swap the post at `index` for `post`, returning the previous entry.
    ///
    /// The caller resolves `index` (normally through `index_of`); no check is
    /// made that the entry there carries the same id. If `post`'s id sits at
    /// some other index, that entry is dropped.
    pub fn replace(&self, post: Post, index: usize) -> Result<Post> {
        let mut guard = self.posts.lock();
        if index >= guard.len() {
            return Err(TimelineError::InvalidOperation(format!(
                "Replace index {} out of bounds (len={})",
                index,
                guard.len()
            )));
        }

        let mut index = index;
        let elsewhere = guard
            .iter()
            .enumerate()
            .find(|(i, p)| *i != index && p.id == post.id)
            .map(|(i, _)| i);
        if let Some(other) = elsewhere {
            guard.remove(other);
            if other < index {
                index -= 1;
            }
            self.notifier.broadcast(TimelineChange::Removed {
                index: other,
                id: post.id.clone(),
            });
        }

        let id = post.id.clone();
        let previous = std::mem::replace(&mut guard[index], post);
        self.notifier
            .broadcast(TimelineChange::Replaced { index, id });
        Ok(previous)
    }

    /// Drop every post at or after `index_of(anchor) + safe_offset`.
    ///
    /// No-op when `anchor` is absent. Returns the removed posts in order.
    pub fn remove_after(&self, anchor: &PostId, safe_offset: usize) -> Vec<Post> {
        let mut guard = self.posts.lock();
        let Some(index) = guard.iter().position(|p| &p.id == anchor) else {
            return Vec::new();
        };
        let from = index.saturating_add(safe_offset);
        if from >= guard.len() {
            return Vec::new();
        }
        let removed = guard.split_off(from);
        self.notifier.broadcast(TimelineChange::Truncated {
            from,
            removed: removed.len(),
        });
        removed
    }

    /// Remove the post with `id`. Idempotent.
    pub fn remove(&self, id: &PostId) -> Option<Post> {
        let mut guard = self.posts.lock();
        let index = guard.iter().position(|p| &p.id == id)?;
        let post = guard.remove(index);
        self.notifier.broadcast(TimelineChange::Removed {
            index,
            id: id.clone(),
        });
        Some(post)
    }

    // --- Observers ---

    /// Subscribe to change notifications.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        self.notifier.subscribe(config)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.notifier.unsubscribe(id)
    }
}

impl Default for TimelineStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Account, Visibility};
    use chrono::{TimeZone, Utc};

    fn post(id: &str) -> Post {
        Post {
            id: PostId::from(id),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            account: Account {
                id: "1".to_string(),
                username: "alice".to_string(),
                acct: "alice".to_string(),
                display_name: String::new(),
                avatar: String::new(),
            },
            content: format!("<p>post {}</p>", id),
            visibility: Visibility::Public,
            in_reply_to_id: None,
            in_reply_to_account_id: None,
            reblog: None,
            media_attachments: vec![],
            tags: vec![],
            replies_count: 0,
            reblogs_count: 0,
            favourites_count: 0,
            is_hidden: false,
        }
    }

    fn posts(ids: &[&str]) -> Vec<Post> {
        ids.iter().map(|id| post(id)).collect()
    }

    fn ids(store: &TimelineStore) -> Vec<String> {
        store.ids().into_iter().map(|id| id.0).collect()
    }

    #[test]
    fn test_set_dedups_keeping_first() {
        let store = TimelineStore::new();
        store.set(posts(&["3", "2", "3", "1"]));
        assert_eq!(ids(&store), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_append_skips_present() {
        let store = TimelineStore::new();
        store.set(posts(&["5", "4"]));
        assert!(!store.append(post("5")));
        assert_eq!(store.append_all(posts(&["4", "3", "2", "2"])), 2);
        assert_eq!(ids(&store), vec!["5", "4", "3", "2"]);
    }

    #[test]
    fn test_insert_at_head() {
        let store = TimelineStore::new();
        store.set(posts(&["5", "4", "3"]));
        store.insert(post("6"), 0);
        assert_eq!(ids(&store), vec!["6", "5", "4", "3"]);
    }

    #[test]
    fn test_insert_all_moves_existing_to_insertion_point() {
        let store = TimelineStore::new();
        store.set(posts(&["5", "4", "3"]));
        store.insert_all(posts(&["7", "6", "5"]), 0);
        assert_eq!(ids(&store), vec!["7", "6", "5", "4", "3"]);

        // Existing entry before the insertion point shifts the index down.
        let store = TimelineStore::new();
        store.set(posts(&["a", "b", "c", "d"]));
        store.insert_all(posts(&["a"]), 3);
        assert_eq!(ids(&store), vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn test_insert_index_clamped() {
        let store = TimelineStore::new();
        store.set(posts(&["2"]));
        store.insert(post("1"), 99);
        assert_eq!(ids(&store), vec!["2", "1"]);
    }

    #[test]
    fn test_replace() {
        let store = TimelineStore::new();
        store.set(posts(&["3", "2", "1"]));
        let mut edited = post("2");
        edited.content = "edited".to_string();

        let previous = store.replace(edited, 1).unwrap();
        assert_eq!(previous.content, "<p>post 2</p>");
        assert_eq!(store.snapshot()[1].content, "edited");
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_replace_out_of_bounds() {
        let store = TimelineStore::new();
        store.set(posts(&["1"]));
        let result = store.replace(post("1"), 1);
        assert!(matches!(result, Err(TimelineError::InvalidOperation(_))));
    }

    #[test]
    fn test_replace_keeps_ids_unique() {
        let store = TimelineStore::new();
        store.set(posts(&["3", "2", "1"]));
        // Caller picked the wrong slot; the other copy of "1" goes away.
        store.replace(post("1"), 0).unwrap();
        assert_eq!(ids(&store), vec!["1", "2"]);
    }

    #[test]
    fn test_insert_if_absent_never_moves_existing() {
        let store = TimelineStore::new();
        store.set(posts(&["5", "4"]));
        store.append_all(posts(&["3"]));

        assert!(!store.insert_if_absent(post("3"), 0));
        assert_eq!(ids(&store), vec!["5", "4", "3"]);

        assert!(store.insert_if_absent(post("6"), 0));
        assert!(store.insert_if_absent(post("1"), 99));
        assert_eq!(ids(&store), vec!["6", "5", "4", "3", "1"]);
    }

    #[test]
    fn test_replace_or_insert_follows_current_position() {
        let store = TimelineStore::new();
        store.set(posts(&["5", "4", "3"]));
        let stale_index = store.index_of(&PostId::from("3")).unwrap();
        assert_eq!(stale_index, 2);

        // A refresh lands between the lookup and the edit.
        store.set(posts(&["7", "6", "5", "4", "3"]));
        let mut edited = post("3");
        edited.content = "edited".to_string();
        let previous = store.replace_or_insert(edited, 0);

        assert_eq!(previous.map(|p| p.content), Some("<p>post 3</p>".to_string()));
        assert_eq!(ids(&store), vec!["7", "6", "5", "4", "3"]);
        assert_eq!(store.snapshot()[4].content, "edited");

        assert!(store.replace_or_insert(post("8"), 0).is_none());
        assert_eq!(ids(&store), vec!["8", "7", "6", "5", "4", "3"]);
    }

    #[test]
    fn test_concurrent_refresh_and_edits_keep_posts() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(TimelineStore::new());
        store.set(posts(&["5", "4", "3"]));

        let editor = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..500 {
                    store.replace_or_insert(post("3"), 0);
                    store.insert_if_absent(post("4"), 0);
                }
            })
        };
        for _ in 0..500 {
            store.set(posts(&["7", "6", "5", "4", "3"]));
        }
        editor.join().unwrap();

        // Every id of the refresh survives, still in order.
        assert_eq!(ids(&store), vec!["7", "6", "5", "4", "3"]);
    }

    #[test]
    fn test_insert_all_reports_dropped_duplicates() {
        let store = TimelineStore::new();
        store.set(posts(&["5", "4", "3", "2"]));
        let handle = store.subscribe(SubscriptionConfig::default());

        store.insert_all(posts(&["6", "4", "2"]), 0);

        assert_eq!(
            handle.drain(),
            vec![
                TimelineChange::Removed {
                    index: 1,
                    id: PostId::from("4"),
                },
                TimelineChange::Removed {
                    index: 2,
                    id: PostId::from("2"),
                },
                TimelineChange::Inserted {
                    index: 0,
                    ids: vec![PostId::from("6"), PostId::from("4"), PostId::from("2")],
                },
            ]
        );
        assert_eq!(ids(&store), vec!["6", "4", "2", "5", "3"]);
    }

    #[test]
    fn test_remove_after() {
        let store = TimelineStore::new();
        store.set(posts(&["7", "6", "5", "4", "3"]));
        let removed = store.remove_after(&PostId::from("5"), 2);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, PostId::from("3"));
        assert_eq!(ids(&store), vec!["7", "6", "5", "4"]);
    }

    #[test]
    fn test_remove_after_edges() {
        let store = TimelineStore::new();
        store.set(posts(&["3", "2", "1"]));
        assert!(store.remove_after(&PostId::from("9"), 0).is_empty());
        assert!(store.remove_after(&PostId::from("2"), 5).is_empty());
        assert_eq!(store.len(), 3);

        let removed = store.remove_after(&PostId::from("2"), 0);
        assert_eq!(removed.len(), 2);
        assert_eq!(ids(&store), vec!["3"]);
    }

    #[test]
    fn test_remove_idempotent() {
        let store = TimelineStore::new();
        store.set(posts(&["5", "4", "3"]));
        assert!(store.remove(&PostId::from("3")).is_some());
        let before = store.snapshot();
        assert!(store.remove(&PostId::from("3")).is_none());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_changes_are_broadcast_in_order() {
        let store = TimelineStore::new();
        let handle = store.subscribe(SubscriptionConfig::default());

        store.set(posts(&["2", "1"]));
        store.insert(post("3"), 0);
        store.remove(&PostId::from("1"));
        store.remove(&PostId::from("1"));

        let changes = handle.drain();
        assert_eq!(
            changes,
            vec![
                TimelineChange::Reset { len: 2 },
                TimelineChange::Inserted {
                    index: 0,
                    ids: vec![PostId::from("3")]
                },
                TimelineChange::Removed {
                    index: 2,
                    id: PostId::from("1")
                },
            ]
        );
    }

    #[test]
    fn test_filtered_snapshot_excludes_hidden() {
        let store = TimelineStore::new();
        let mut hidden = post("2");
        hidden.is_hidden = true;
        store.set(vec![post("3"), hidden, post("1")]);

        let visible = store.filtered_snapshot(&ContentFilter::default());
        let visible_ids: Vec<_> = visible.iter().map(|p| p.id.0.as_str()).collect();
        assert_eq!(visible_ids, vec!["3", "1"]);
        assert_eq!(store.len(), 3);
    }
}
