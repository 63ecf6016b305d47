//! Streaming side of the pipeline.
//!
//! - [`StreamConnection`]: the connect/subscribe/reconnect state machine
//! - [`StreamTransport`] / [`StreamSocket`]: what it talks through
//! - [`WebSocketTransport`]: the real server endpoint
//! - [`MemoryTransport`]: channels, for tests and embedding

mod connection;
mod event;
mod memory;
mod transport;
mod websocket;

pub use connection::{
    ConnectionState, StreamConfig, StreamConnection, StreamSignal, DEFAULT_RECONNECT_DELAY,
};
pub use event::{decode_message, subscribe_message, unsubscribe_message, ReceivedEvent, StreamEvent};
pub use memory::{MemoryPeer, MemorySocket, MemoryTransport};
pub use transport::{StreamSocket, StreamTransport};
pub use websocket::{WebSocketSocket, WebSocketTransport};
