//! Seam between the connection state machine and the actual socket.

use crate::error::Result;
use async_trait::async_trait;

/// An open duplex text connection.
#[async_trait]
pub trait StreamSocket: Send + 'static {
    /// Send one text frame.
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Next inbound text frame. `None` when the peer closed the connection.
    async fn recv_text(&mut self) -> Option<Result<String>>;

    /// Close politely. Errors are ignored by callers.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Opens sockets to the streaming endpoint using the caller's current
/// credentials.
#[async_trait]
pub trait StreamTransport: Send + Sync + 'static {
    type Socket: StreamSocket;

    async fn open(&self) -> Result<Self::Socket>;
}
