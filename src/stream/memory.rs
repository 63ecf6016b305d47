//! In-process transport backed by channels.
//!
//! Each socket handed out by [`MemoryTransport::open`] is scripted up front
//! with [`MemoryTransport::push_socket`] or [`MemoryTransport::push_failure`];
//! when nothing is queued, `open` waits until something is.

use crate::error::{Result, TimelineError};
use crate::stream::transport::{StreamSocket, StreamTransport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;

enum Scripted {
    Socket(MemorySocket),
    Fail(String),
}

/// Channel-backed [`StreamTransport`].
#[derive(Default)]
pub struct MemoryTransport {
    queue: Mutex<VecDeque<Scripted>>,
    ready: Notify,
    opened_at: Mutex<Vec<Instant>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a socket for the next `open`; returns the far end.
    pub fn push_socket(&self) -> MemoryPeer {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        self.queue.lock().push_back(Scripted::Socket(MemorySocket {
            inbound: inbound_rx,
            outbound: outbound_tx,
        }));
        self.ready.notify_one();
        MemoryPeer {
            inbound: Some(inbound_tx),
            outbound: outbound_rx,
        }
    }

    /// Make the next `open` fail with a transport error.
    pub fn push_failure(&self, reason: impl Into<String>) {
        self.queue.lock().push_back(Scripted::Fail(reason.into()));
        self.ready.notify_one();
    }

    /// How many times `open` was attempted and got an answer.
    pub fn open_count(&self) -> usize {
        self.opened_at.lock().len()
    }

    /// When each answered `open` happened (tokio clock).
    pub fn open_instants(&self) -> Vec<Instant> {
        self.opened_at.lock().clone()
    }
}

#[async_trait]
impl StreamTransport for MemoryTransport {
    type Socket = MemorySocket;

    async fn open(&self) -> Result<MemorySocket> {
        loop {
            let next = self.queue.lock().pop_front();
            if let Some(scripted) = next {
                self.opened_at.lock().push(Instant::now());
                return match scripted {
                    Scripted::Socket(socket) => Ok(socket),
                    Scripted::Fail(reason) => Err(TimelineError::Transport(reason)),
                };
            }
            self.ready.notified().await;
        }
    }
}

/// Pipeline side of an in-memory connection.
pub struct MemorySocket {
    inbound: mpsc::UnboundedReceiver<Result<String>>,
    outbound: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl StreamSocket for MemorySocket {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.outbound
            .send(text)
            .map_err(|_| TimelineError::Transport("peer went away".into()))
    }

    async fn recv_text(&mut self) -> Option<Result<String>> {
        self.inbound.recv().await
    }
}

/// Test/server side of an in-memory connection.
pub struct MemoryPeer {
    inbound: Option<mpsc::UnboundedSender<Result<String>>>,
    outbound: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// Deliver a text frame to the pipeline.
    pub fn send(&self, text: impl Into<String>) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(Ok(text.into()));
        }
    }

    /// Deliver a receive error to the pipeline.
    pub fn fail(&self, reason: impl Into<String>) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(Err(TimelineError::Transport(reason.into())));
        }
    }

    /// Close from the far end; the pipeline sees end-of-stream.
    pub fn close(&mut self) {
        self.inbound = None;
    }

    /// Next frame the pipeline sent, waiting for it.
    pub async fn next_sent(&mut self) -> Option<String> {
        self.outbound.recv().await
    }

    /// Frames the pipeline has sent so far.
    pub fn sent(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.outbound.try_recv() {
            frames.push(frame);
        }
        frames
    }
}
