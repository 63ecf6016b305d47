//! Wire envelope decoding for the streaming socket.
//!
//! Event kinds arrive as strings; they are turned into the closed
//! [`StreamEvent`] enum here and nowhere else.

use crate::error::{Result, TimelineError};
use crate::types::{Post, PostId, StreamName, Timestamp};
use serde::{Deserialize, Serialize};

/// A decoded live event.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// A new post.
    Update(Post),
    /// An edited post; same shape, merged by replacing.
    StatusUpdate(Post),
    /// A post was deleted.
    Delete(PostId),
}

impl StreamEvent {
    pub fn post_id(&self) -> &PostId {
        match self {
            StreamEvent::Update(post) | StreamEvent::StatusUpdate(post) => &post.id,
            StreamEvent::Delete(id) => id,
        }
    }
}

/// An event plus where and when it arrived.
#[derive(Clone, Debug, PartialEq)]
pub struct ReceivedEvent {
    pub event: StreamEvent,
    /// Streams the server tagged the message with. Names this client does not
    /// know are left out.
    pub streams: Vec<StreamName>,
    /// Local receipt time; for transient UI ordering only.
    pub received_at: Timestamp,
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    stream: Vec<String>,
    #[serde(default)]
    payload: Option<String>,
}

/// Decode one inbound text frame.
///
/// Returns `Ok(None)` for well-formed messages of kinds this pipeline does not
/// consume (notifications, filter changes, ...).
pub fn decode_message(text: &str) -> Result<Option<ReceivedEvent>> {
    let envelope: Envelope = serde_json::from_str(text)?;
    let payload = || {
        envelope
            .payload
            .as_deref()
            .ok_or_else(|| TimelineError::Decoding(format!("{} without payload", envelope.event)))
    };

    let event = match envelope.event.as_str() {
        "update" => StreamEvent::Update(serde_json::from_str(payload()?)?),
        "status.update" => StreamEvent::StatusUpdate(serde_json::from_str(payload()?)?),
        "delete" => {
            let id = payload()?.trim().trim_matches('"');
            if id.is_empty() {
                return Err(TimelineError::Decoding("delete with empty id".into()));
            }
            StreamEvent::Delete(PostId::from(id))
        }
        other => {
            tracing::debug!(event = other, "ignoring stream event kind");
            return Ok(None);
        }
    };

    let streams = envelope
        .stream
        .iter()
        .filter_map(|s| s.parse::<StreamName>().ok())
        .collect();

    Ok(Some(ReceivedEvent {
        event,
        streams,
        received_at: Timestamp::now(),
    }))
}

/// Outbound control frame.
#[derive(Serialize)]
struct Command<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    stream: &'a str,
}

/// `{"type":"subscribe","stream":<name>}`
pub fn subscribe_message(stream: StreamName) -> String {
    command("subscribe", stream)
}

/// `{"type":"unsubscribe","stream":<name>}`
pub fn unsubscribe_message(stream: StreamName) -> String {
    command("unsubscribe", stream)
}

fn command(kind: &str, stream: StreamName) -> String {
    let cmd = Command {
        kind,
        stream: stream.as_str(),
    };
    // Two string fields; serialization cannot fail.
    serde_json::to_string(&cmd).unwrap_or_default()
}
