//! ChannelClient - keeps one channel's stream connected
//!
//! ## Lifecycle
//!
//! ```text
//! spawn → Connecting → Open ──(close / error)──► Closed ──(delay)──► Connecting → …
//!             │          │
//!             └─ refused ┴──────────────────────► Closed
//!
//! Shutdown (any phase) → Closing → Closed, no further retries
//! ```
//!
//! Every successful open starts a new epoch and clears the buffered samples
//! and latches. Reconnects happen after a fixed delay, forever.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

use crate::error::ProtocolError;
use crate::protocol::StreamMessage;
use crate::transport::{Connection, Frame, Transport};
use crate::view::ChannelView;

use super::buffer::RetentionPolicy;
use super::state::{Applied, ChannelKey, ChannelState, ConnectionPhase};

/// Delay between a close event and the next connect attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// Fixed-interval reconnect policy without a retry cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Settings shared by every client of a dashboard
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClientSettings {
    pub reconnect: ReconnectPolicy,
    pub retention: RetentionPolicy,
}

/// Commands that can be sent to a ChannelClient
#[derive(Debug)]
enum ChannelCommand {
    /// Close the connection and stop; pending reconnects are cancelled
    Shutdown,
}

/// How a connection epoch ended
enum EpochEnd {
    /// Transport closed; schedule a reconnect
    Closed,

    /// Teardown requested
    Shutdown,
}

/// Actor owning a single channel connection
struct ChannelClient {
    key: ChannelKey,
    url: Url,
    transport: Arc<dyn Transport>,
    reconnect: ReconnectPolicy,
    command_rx: mpsc::Receiver<ChannelCommand>,
    state_tx: watch::Sender<ChannelState>,
}

impl ChannelClient {
    /// Run until a Shutdown command arrives or every handle is dropped
    #[instrument(skip(self), fields(channel = %self.key))]
    async fn run(mut self) {
        debug!("starting channel client");

        loop {
            self.set_phase(ConnectionPhase::Connecting);
            debug!("connecting to {}", self.url);

            let connected = tokio::select! {
                biased;

                command = self.command_rx.recv() => {
                    log_stop(command);
                    break;
                }

                result = self.transport.connect(&self.url) => result,
            };

            let end = match connected {
                Ok(connection) => self.stream(connection).await,
                Err(e) => {
                    warn!("connection failed: {}", e);
                    self.state_tx.send_modify(|state| {
                        state.phase = ConnectionPhase::Closed;
                        state.last_error = Some(e.to_string());
                    });
                    EpochEnd::Closed
                }
            };

            if let EpochEnd::Shutdown = end {
                break;
            }

            info!("reconnecting in {}ms", self.reconnect.delay.as_millis());

            tokio::select! {
                biased;

                command = self.command_rx.recv() => {
                    log_stop(command);
                    break;
                }

                _ = tokio::time::sleep(self.reconnect.delay) => {}
            }

            self.state_tx
                .send_modify(|state| state.reconnect_attempts += 1);
        }

        self.set_phase(ConnectionPhase::Closed);
        debug!("channel client stopped");
    }

    /// Drive one open connection until it closes or teardown is requested
    async fn stream(&mut self, mut connection: Box<dyn Connection>) -> EpochEnd {
        self.state_tx.send_modify(ChannelState::begin_epoch);
        info!("connected, epoch {}", self.state_tx.borrow().epoch);

        loop {
            tokio::select! {
                biased;

                command = self.command_rx.recv() => {
                    log_stop(command);
                    self.set_phase(ConnectionPhase::Closing);
                    connection.close().await;
                    return EpochEnd::Shutdown;
                }

                frame = connection.next_frame() => {
                    match frame {
                        Some(Ok(Frame::Text(text))) => {
                            self.handle_decoded(StreamMessage::decode(&text));
                        }
                        Some(Ok(Frame::Binary(bytes))) => {
                            self.handle_decoded(StreamMessage::decode_bytes(&bytes));
                        }
                        Some(Ok(Frame::Close)) => {
                            info!("connection closed by server");
                            self.set_phase(ConnectionPhase::Closing);
                            connection.close().await;
                            break;
                        }
                        Some(Err(e)) => {
                            warn!("connection lost: {}", e);
                            self.state_tx
                                .send_modify(|state| state.last_error = Some(e.to_string()));
                            break;
                        }
                        None => {
                            info!("connection ended");
                            break;
                        }
                    }
                }
            }
        }

        self.set_phase(ConnectionPhase::Closed);
        EpochEnd::Closed
    }

    fn handle_decoded(&self, decoded: Result<StreamMessage, ProtocolError>) {
        match decoded {
            Ok(message) => {
                let now = Instant::now();
                let mut applied = Applied::Appended;
                self.state_tx
                    .send_modify(|state| applied = state.apply(message, now));

                match applied {
                    Applied::Appended => trace!("sample appended"),
                    Applied::LatchOnly => trace!("sample after end of stream, latches only"),
                    Applied::Finished => info!("stream finished"),
                }
            }
            Err(e) => {
                warn!("dropping frame: {}", e);
                self.state_tx.send_modify(ChannelState::record_dropped);
            }
        }
    }

    fn set_phase(&self, phase: ConnectionPhase) {
        self.state_tx.send_if_modified(|state| {
            let changed = state.phase != phase;
            state.phase = phase;
            changed
        });
    }
}

fn log_stop(command: Option<ChannelCommand>) {
    match command {
        Some(ChannelCommand::Shutdown) => debug!("received shutdown command"),
        None => debug!("all handles dropped, shutting down"),
    }
}

/// Handle for a running ChannelClient
///
/// Dropping the handle stops the client as well; `shutdown` additionally
/// waits until the connection is closed.
pub struct ChannelHandle {
    key: ChannelKey,
    url: Url,
    sender: mpsc::Sender<ChannelCommand>,
    state_rx: watch::Receiver<ChannelState>,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    /// Spawn a client for `key`, connecting to `url`
    pub fn spawn(
        key: ChannelKey,
        url: Url,
        transport: Arc<dyn Transport>,
        settings: ClientSettings,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let (state_tx, state_rx) =
            watch::channel(ChannelState::new(key.clone(), settings.retention));

        let client = ChannelClient {
            key: key.clone(),
            url: url.clone(),
            transport,
            reconnect: settings.reconnect,
            command_rx: cmd_rx,
            state_tx,
        };

        let task = tokio::spawn(client.run());

        Self {
            key,
            url,
            sender: cmd_tx,
            state_rx,
            task,
        }
    }

    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<ChannelState> {
        self.state_rx.clone()
    }

    /// Borrow the current state; do not hold across an await
    pub fn state(&self) -> watch::Ref<'_, ChannelState> {
        self.state_rx.borrow()
    }

    /// Derive the display attributes from the current state
    pub fn view(&self) -> ChannelView {
        ChannelView::from_state(&self.state_rx.borrow())
    }

    /// Whether the client task has exited
    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }

    /// Close the connection, cancel pending reconnects and wait for the
    /// client to exit
    pub async fn shutdown(self) -> Result<()> {
        // the client may already be gone; the join below still applies
        let _ = self.sender.send(ChannelCommand::Shutdown).await;

        self.task
            .await
            .with_context(|| format!("channel client {} did not stop cleanly", self.key))
    }
}
