//! Live streaming connection with fixed-delay reconnect.
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──open ok──▶ Subscribed
//!      ▲                          │                       │
//!      │                      open failed          send/recv failed
//!      │                          ▼                       ▼
//!      └───────── stop() ◀── Disconnected ◀───────────────┘
//!                                 │
//!                       sleep(reconnect_delay)
//!                                 │
//!                                 └──▶ Connecting
//! ```
//!
//! One background task drives the machine. The delay is fixed, not
//! exponential; a failure schedules exactly one new attempt.

use crate::stream::event::{decode_message, subscribe_message, unsubscribe_message, ReceivedEvent};
use crate::stream::transport::{StreamSocket, StreamTransport};
use crate::types::StreamName;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Default pause between a failure and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(10);

/// Connection configuration.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Pause before reconnecting after a transport failure.
    /// Default: 10s
    pub reconnect_delay: Duration,

    /// Capacity of the signal channel returned by `connect`.
    /// Default: 256
    pub signal_buffer: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            signal_buffer: 256,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Subscribed,
}

/// What the connection reports to its consumer.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamSignal {
    /// First successful open after `connect()`.
    Connected,
    /// Open succeeded after a failure; the consumer should backfill the gap.
    Reconnected,
    /// A decoded live event.
    Event(ReceivedEvent),
    /// The transport failed; a reconnect is scheduled.
    Disconnected { reason: String },
}

enum Command {
    Subscribe(Vec<StreamName>),
    Unsubscribe(Vec<StreamName>),
}

struct Driver {
    cancel: CancellationToken,
    commands: mpsc::UnboundedSender<Command>,
}

/// Owns a single live socket to the streaming endpoint.
pub struct StreamConnection<T: StreamTransport> {
    transport: Arc<T>,
    config: StreamConfig,
    requested: Arc<Mutex<BTreeSet<StreamName>>>,
    state: Arc<watch::Sender<ConnectionState>>,
    driver: Mutex<Option<Driver>>,
}

impl<T: StreamTransport> StreamConnection<T> {
    pub fn new(transport: Arc<T>, config: StreamConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            config,
            requested: Arc::new(Mutex::new(BTreeSet::new())),
            state: Arc::new(state),
            driver: Mutex::new(None),
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Streams that will be (re)subscribed on every open.
    pub fn requested_streams(&self) -> BTreeSet<StreamName> {
        self.requested.lock().clone()
    }

    /// Start the connection, replacing any previous one. Must be called from
    /// within a tokio runtime.
    pub fn connect(&self) -> mpsc::Receiver<StreamSignal> {
        self.stop();

        let cancel = CancellationToken::new();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (signals_tx, signals_rx) = mpsc::channel(self.config.signal_buffer.max(1));

        let machine = Machine {
            transport: Arc::clone(&self.transport),
            reconnect_delay: self.config.reconnect_delay,
            requested: Arc::clone(&self.requested),
            state: Arc::clone(&self.state),
            cancel: cancel.clone(),
            commands: commands_rx,
            signals: signals_tx,
        };
        tokio::spawn(machine.run());

        *self.driver.lock() = Some(Driver {
            cancel,
            commands: commands_tx,
        });
        signals_rx
    }

    /// Add streams to the requested set. Sent right away when subscribed,
    /// otherwise on the next open.
    pub fn subscribe(&self, streams: impl IntoIterator<Item = StreamName>) {
        let added: Vec<StreamName> = {
            let mut requested = self.requested.lock();
            streams.into_iter().filter(|s| requested.insert(*s)).collect()
        };
        if added.is_empty() {
            return;
        }
        if let Some(driver) = self.driver.lock().as_ref() {
            let _ = driver.commands.send(Command::Subscribe(added));
        }
    }

    /// Drop streams from the requested set.
    pub fn unsubscribe(&self, streams: impl IntoIterator<Item = StreamName>) {
        let removed: Vec<StreamName> = {
            let mut requested = self.requested.lock();
            streams.into_iter().filter(|s| requested.remove(s)).collect()
        };
        if removed.is_empty() {
            return;
        }
        if let Some(driver) = self.driver.lock().as_ref() {
            let _ = driver.commands.send(Command::Unsubscribe(removed));
        }
    }

    /// Tear down the transport and cancel any pending reconnect.
    pub fn stop(&self) {
        if let Some(driver) = self.driver.lock().take() {
            driver.cancel.cancel();
            tracing::info!("streaming connection stopped");
        }
        self.state.send_replace(ConnectionState::Disconnected);
    }
}

impl<T: StreamTransport> Drop for StreamConnection<T> {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.get_mut().take() {
            driver.cancel.cancel();
        }
    }
}

/// How one socket session ended.
enum SessionEnd {
    Stopped,
    Failed(String),
}

/// State owned by the background task.
struct Machine<T: StreamTransport> {
    transport: Arc<T>,
    reconnect_delay: Duration,
    requested: Arc<Mutex<BTreeSet<StreamName>>>,
    state: Arc<watch::Sender<ConnectionState>>,
    cancel: CancellationToken,
    commands: mpsc::UnboundedReceiver<Command>,
    signals: mpsc::Sender<StreamSignal>,
}

impl<T: StreamTransport> Machine<T> {
    fn set_state(&self, state: ConnectionState) {
        // A stopped machine no longer owns the published state.
        if !self.cancel.is_cancelled() {
            self.state.send_replace(state);
        }
    }

    /// Deliver a signal unless stopped first. False when cancelled or the
    /// consumer is gone.
    async fn emit(&self, signal: StreamSignal) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            sent = self.signals.send(signal) => sent.is_ok(),
        }
    }

    async fn run(mut self) {
        let mut reconnecting = false;

        loop {
            self.set_state(ConnectionState::Connecting);
            let opened = tokio::select! {
                _ = self.cancel.cancelled() => break,
                opened = self.transport.open() => opened,
            };

            let reason = match opened {
                Ok(socket) => {
                    self.set_state(ConnectionState::Subscribed);
                    match self.session(socket, reconnecting).await {
                        SessionEnd::Stopped => break,
                        SessionEnd::Failed(reason) => reason,
                    }
                }
                Err(e) => e.to_string(),
            };

            self.set_state(ConnectionState::Disconnected);
            tracing::warn!(
                %reason,
                delay_secs = self.reconnect_delay.as_secs_f64(),
                "streaming connection lost, reconnect scheduled"
            );
            if !self.emit(StreamSignal::Disconnected { reason }).await {
                break;
            }

            reconnecting = true;
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        self.set_state(ConnectionState::Disconnected);
    }

    async fn session(&mut self, mut socket: T::Socket, reconnecting: bool) -> SessionEnd {
        let mut active = BTreeSet::new();
        let wanted: Vec<StreamName> = self.requested.lock().iter().copied().collect();
        for name in wanted {
            if let Err(e) = socket.send_text(subscribe_message(name)).await {
                return SessionEnd::Failed(e.to_string());
            }
            active.insert(name);
        }

        tracing::info!(streams = active.len(), reconnecting, "streaming connection subscribed");
        let opened = if reconnecting {
            StreamSignal::Reconnected
        } else {
            StreamSignal::Connected
        };
        if !self.emit(opened).await {
            let _ = socket.close().await;
            return SessionEnd::Stopped;
        }

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = socket.close().await;
                    return SessionEnd::Stopped;
                }
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        let _ = socket.close().await;
                        return SessionEnd::Stopped;
                    };
                    if let Err(reason) = Self::apply(&mut socket, &mut active, command).await {
                        return SessionEnd::Failed(reason);
                    }
                }
                frame = socket.recv_text() => match frame {
                    Some(Ok(text)) => match decode_message(&text) {
                        Ok(Some(event)) => {
                            tracing::debug!(id = %event.event.post_id(), "stream event");
                            if !self.emit(StreamSignal::Event(event)).await {
                                let _ = socket.close().await;
                                return SessionEnd::Stopped;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => tracing::warn!(error = %e, "dropping malformed stream message"),
                    },
                    Some(Err(e)) => return SessionEnd::Failed(e.to_string()),
                    None => return SessionEnd::Failed("connection closed by server".to_string()),
                },
            }
        }
    }

    async fn apply(
        socket: &mut T::Socket,
        active: &mut BTreeSet<StreamName>,
        command: Command,
    ) -> Result<(), String> {
        match command {
            Command::Subscribe(names) => {
                for name in names {
                    if active.insert(name) {
                        socket
                            .send_text(subscribe_message(name))
                            .await
                            .map_err(|e| e.to_string())?;
                    }
                }
            }
            Command::Unsubscribe(names) => {
                for name in names {
                    if active.remove(&name) {
                        socket
                            .send_text(unsubscribe_message(name))
                            .await
                            .map_err(|e| e.to_string())?;
                    }
                }
            }
        }
        Ok(())
    }
}
