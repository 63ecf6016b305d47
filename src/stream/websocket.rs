//! WebSocket transport over tokio-tungstenite.

use crate::api::rest::endpoint;
use crate::api::SessionProvider;
use crate::error::{Result, TimelineError};
use crate::stream::transport::{StreamSocket, StreamTransport};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

/// Path of the streaming endpoint relative to the server base.
const STREAMING_PATH: &str = "api/v1/streaming";

/// `wss://host/api/v1/streaming?access_token=...` for an `https://host` base.
pub(crate) fn streaming_url(base: &Url, token: &str) -> Result<Url> {
    let mut url = endpoint(base, STREAMING_PATH)?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(TimelineError::InvalidUrl(format!(
                "unsupported scheme: {}",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| TimelineError::InvalidUrl(format!("cannot use scheme {}", scheme)))?;
    url.query_pairs_mut().append_pair("access_token", token);
    Ok(url)
}

/// Opens WebSocket connections with the session's bearer token.
pub struct WebSocketTransport {
    sessions: Arc<dyn SessionProvider>,
}

impl WebSocketTransport {
    pub fn new(sessions: Arc<dyn SessionProvider>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl StreamTransport for WebSocketTransport {
    type Socket = WebSocketSocket;

    async fn open(&self) -> Result<WebSocketSocket> {
        let session = self
            .sessions
            .session()
            .ok_or(TimelineError::NoClientAvailable)?;
        let url = streaming_url(&session.base_url, &session.token)?;
        let (inner, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        tracing::debug!(host = url.host_str().unwrap_or_default(), "streaming socket open");
        Ok(WebSocketSocket { inner })
    }
}

pub struct WebSocketSocket {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl StreamSocket for WebSocketSocket {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.inner.send(Message::text(text)).await?;
        Ok(())
    }

    async fn recv_text(&mut self) -> Option<Result<String>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Binary(bytes)) => {
                    return Some(
                        String::from_utf8(bytes.to_vec())
                            .map_err(|e| TimelineError::Decoding(e.to_string())),
                    )
                }
                Ok(Message::Close(_)) => return None,
                // Ping/pong are answered by tungstenite itself.
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close(None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streaming_url() {
        let base = Url::parse("https://neodb.social/").unwrap();
        let url = streaming_url(&base, "tok en").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://neodb.social/api/v1/streaming?access_token=tok+en"
        );

        let local = Url::parse("http://localhost:8000").unwrap();
        assert_eq!(streaming_url(&local, "t").unwrap().scheme(), "ws");
    }

    #[test]
    fn test_streaming_url_rejects_other_schemes() {
        let base = Url::parse("ftp://example.org/").unwrap();
        assert!(matches!(
            streaming_url(&base, "t"),
            Err(TimelineError::InvalidUrl(_))
        ));
    }
}
