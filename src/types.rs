//! Core types for the timeline pipeline.

use crate::error::TimelineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Server-assigned post identifier. Opaque; compared only for equality.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        PostId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PostId({})", self.0)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        PostId(s.to_string())
    }
}

impl From<String> for PostId {
    fn from(s: String) -> Self {
        PostId(s)
    }
}

/// Microseconds since Unix epoch, taken from the local clock.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as i64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Author reference carried by every post.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub acct: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub avatar: String,
}

/// Post visibility. Values the client does not know are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
    Direct,
    Other(String),
}

impl From<String> for Visibility {
    fn from(s: String) -> Self {
        match s.as_str() {
            "public" => Visibility::Public,
            "unlisted" => Visibility::Unlisted,
            "private" => Visibility::Private,
            "direct" => Visibility::Direct,
            _ => Visibility::Other(s),
        }
    }
}

impl From<Visibility> for String {
    fn from(v: Visibility) -> Self {
        match v {
            Visibility::Public => "public".to_string(),
            Visibility::Unlisted => "unlisted".to_string(),
            Visibility::Private => "private".to_string(),
            Visibility::Direct => "direct".to_string(),
            Visibility::Other(s) => s,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub id: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: String,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// A single post (status). Identity is by `id` alone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "WirePost")]
pub struct Post {
    pub id: PostId,
    pub created_at: DateTime<Utc>,
    pub account: Account,
    pub content: String,
    pub visibility: Visibility,
    pub in_reply_to_id: Option<PostId>,
    pub in_reply_to_account_id: Option<String>,
    /// The boosted post, when this post is a boost.
    pub reblog: Option<Box<Post>>,
    pub media_attachments: Vec<MediaAttachment>,
    pub tags: Vec<Tag>,
    pub replies_count: u64,
    pub reblogs_count: u64,
    pub favourites_count: u64,
    /// Moderation flag: hidden posts never show in filtered views.
    pub is_hidden: bool,
}

impl Post {
    /// Whether this post replies to anything at all.
    pub fn is_reply(&self) -> bool {
        self.in_reply_to_id.is_some()
    }

    /// A reply to the author's own earlier post (a self-thread).
    pub fn is_self_reply(&self) -> bool {
        self.is_reply() && self.in_reply_to_account_id.as_deref() == Some(self.account.id.as_str())
    }

    /// A reply to somebody other than the author.
    pub fn is_reply_to_other(&self) -> bool {
        self.is_reply() && !self.is_self_reply()
    }

    /// Whether this post wraps another post.
    pub fn is_boost(&self) -> bool {
        self.reblog.is_some()
    }
}

/// Wire shape of a post. `hidden` also accepts the crate's own serialized
/// field name so cached posts round-trip.
#[derive(Deserialize)]
struct WirePost {
    id: PostId,
    created_at: DateTime<Utc>,
    account: Account,
    #[serde(default)]
    content: String,
    #[serde(default)]
    visibility: Visibility,
    #[serde(default)]
    in_reply_to_id: Option<PostId>,
    #[serde(default)]
    in_reply_to_account_id: Option<String>,
    #[serde(default)]
    reblog: Option<Box<Post>>,
    #[serde(default)]
    media_attachments: Vec<MediaAttachment>,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    replies_count: u64,
    #[serde(default)]
    reblogs_count: u64,
    #[serde(default)]
    favourites_count: u64,
    #[serde(default, alias = "is_hidden")]
    hidden: bool,
    #[serde(default)]
    filtered: Vec<FilterResult>,
}

#[derive(Deserialize)]
struct FilterResult {
    filter: FilterRule,
}

#[derive(Deserialize)]
struct FilterRule {
    #[serde(default)]
    filter_action: String,
}

impl From<WirePost> for Post {
    fn from(w: WirePost) -> Self {
        let filtered_out = w
            .filtered
            .iter()
            .any(|f| f.filter.filter_action == "hide");
        Post {
            id: w.id,
            created_at: w.created_at,
            account: w.account,
            content: w.content,
            visibility: w.visibility,
            in_reply_to_id: w.in_reply_to_id,
            in_reply_to_account_id: w.in_reply_to_account_id,
            reblog: w.reblog,
            media_attachments: w.media_attachments,
            tags: w.tags,
            replies_count: w.replies_count,
            reblogs_count: w.reblogs_count,
            favourites_count: w.favourites_count,
            is_hidden: w.hidden || filtered_out,
        }
    }
}

/// Named subscription channel on the streaming socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StreamName {
    /// `public:local`, the local feed.
    Local,
    /// `user`, the home feed.
    User,
    /// `public`, the federated feed.
    Public,
}

impl StreamName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamName::Local => "public:local",
            StreamName::User => "user",
            StreamName::Public => "public",
        }
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamName {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public:local" => Ok(StreamName::Local),
            "user" => Ok(StreamName::User),
            "public" => Ok(StreamName::Public),
            other => Err(TimelineError::UnknownStream(other.to_string())),
        }
    }
}

/// Timeline scope shown by a controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimelineKind {
    Home,
    Local,
    Federated,
}

impl TimelineKind {
    /// REST path relative to the server base URL.
    pub fn path(&self) -> &'static str {
        match self {
            TimelineKind::Home => "api/v1/timelines/home",
            TimelineKind::Local | TimelineKind::Federated => "api/v1/timelines/public",
        }
    }

    /// Extra fixed query parameters for this timeline.
    pub fn fixed_query(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            TimelineKind::Local => &[("local", "true")],
            _ => &[],
        }
    }

    /// Stream carrying live updates for this timeline.
    pub fn stream_name(&self) -> StreamName {
        match self {
            TimelineKind::Home => StreamName::User,
            TimelineKind::Local => StreamName::Local,
            TimelineKind::Federated => StreamName::Public,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineKind::Home => "home",
            TimelineKind::Local => "local",
            TimelineKind::Federated => "federated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire_post(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "created_at": "2024-03-01T12:00:00.000Z",
            "account": {"id": "1", "username": "alice", "acct": "alice", "display_name": "Alice", "avatar": "https://x/a.png"},
            "content": "<p>hi</p>",
            "visibility": "public",
            "in_reply_to_id": null,
            "in_reply_to_account_id": null,
            "reblog": null,
            "media_attachments": [],
            "tags": [{"name": "books", "url": "https://x/tags/books"}],
            "replies_count": 2,
            "reblogs_count": 1,
            "favourites_count": 5
        })
    }

    #[test]
    fn test_decode_mastodon_status() {
        let post: Post = serde_json::from_value(wire_post("109")).unwrap();
        assert_eq!(post.id, PostId::from("109"));
        assert_eq!(post.account.username, "alice");
        assert_eq!(post.visibility, Visibility::Public);
        assert_eq!(post.tags[0].name, "books");
        assert_eq!(post.favourites_count, 5);
        assert!(!post.is_hidden);
        assert!(!post.is_reply());
    }

    #[test]
    fn test_decode_hide_filter_marks_hidden() {
        let mut value = wire_post("110");
        value["filtered"] = json!([{"filter": {"filter_action": "hide"}, "keyword_matches": ["x"]}]);
        let post: Post = serde_json::from_value(value).unwrap();
        assert!(post.is_hidden);

        let mut value = wire_post("111");
        value["filtered"] = json!([{"filter": {"filter_action": "warn"}}]);
        let post: Post = serde_json::from_value(value).unwrap();
        assert!(!post.is_hidden);
    }

    #[test]
    fn test_unknown_visibility_preserved() {
        let mut value = wire_post("112");
        value["visibility"] = json!("local");
        let post: Post = serde_json::from_value(value).unwrap();
        assert_eq!(post.visibility, Visibility::Other("local".to_string()));
        let back = serde_json::to_value(&post).unwrap();
        assert_eq!(back["visibility"], "local");
    }

    #[test]
    fn test_reply_classification() {
        let mut value = wire_post("113");
        value["in_reply_to_id"] = json!("100");
        value["in_reply_to_account_id"] = json!("1");
        let post: Post = serde_json::from_value(value.clone()).unwrap();
        assert!(post.is_self_reply());
        assert!(!post.is_reply_to_other());

        value["in_reply_to_account_id"] = json!("2");
        let post: Post = serde_json::from_value(value).unwrap();
        assert!(post.is_reply_to_other());
    }

    #[test]
    fn test_stream_name_parse() {
        assert_eq!("public:local".parse::<StreamName>().unwrap(), StreamName::Local);
        assert_eq!(StreamName::User.to_string(), "user");
        assert!(matches!(
            "hashtag".parse::<StreamName>(),
            Err(TimelineError::UnknownStream(_))
        ));
    }

    #[test]
    fn test_timeline_kind_mapping() {
        assert_eq!(TimelineKind::Home.stream_name(), StreamName::User);
        assert_eq!(TimelineKind::Local.fixed_query(), &[("local", "true")]);
        assert_eq!(TimelineKind::Federated.path(), "api/v1/timelines/public");
    }
}
