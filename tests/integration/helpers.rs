//! Local detection-service stand-in for integration tests

use futures::{SinkExt, StreamExt};
use sod_monitor::channel::ChannelState;
use sod_monitor::protocol::WireFrame;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use url::Url;

/// Upper bound for anything a test waits on
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// What the server does on one accepted connection
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Text frames, sent as-is
    pub frames: Vec<String>,

    /// Close the connection after the last frame instead of holding it open
    pub close: bool,
}

impl Script {
    pub fn hold(frames: Vec<WireFrame>) -> Self {
        Self::raw(frames.iter().map(to_json).collect())
    }

    pub fn close_after(frames: Vec<WireFrame>) -> Self {
        Self {
            close: true,
            ..Self::hold(frames)
        }
    }

    /// Hold the connection open after sending arbitrary text frames
    pub fn raw(frames: Vec<String>) -> Self {
        Self {
            frames,
            close: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Handshake completed for this request path
    Connected(String),
    /// The peer went away
    Disconnected(String),
}

/// WebSocket server on a random local port
///
/// Connections take scripts from the queue in accept order; once the queue is
/// empty they are held open without sending anything.
pub struct TestServer {
    pub base: Url,
    events: mpsc::UnboundedReceiver<ServerEvent>,
}

impl TestServer {
    pub async fn start(scripts: Vec<Script>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let queue = Arc::new(Mutex::new(VecDeque::from(scripts)));
        let (event_tx, events) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let queue = queue.clone();
                let event_tx = event_tx.clone();
                tokio::spawn(async move {
                    let mut path = String::new();
                    let callback = |request: &Request, response: Response| {
                        path = request.uri().path().to_string();
                        Ok(response)
                    };
                    let Ok(mut ws) = accept_hdr_async(stream, callback).await else {
                        return;
                    };

                    let script = queue.lock().unwrap().pop_front().unwrap_or_default();
                    event_tx.send(ServerEvent::Connected(path.clone())).ok();

                    for frame in &script.frames {
                        if ws.send(Message::Text(frame.clone())).await.is_err() {
                            break;
                        }
                    }
                    if script.close {
                        ws.close(None).await.ok();
                    }

                    while let Some(Ok(_)) = ws.next().await {}
                    event_tx.send(ServerEvent::Disconnected(path)).ok();
                });
            }
        });

        Self {
            base: Url::parse(&format!("ws://{}/ws", addr)).unwrap(),
            events,
        }
    }

    pub async fn next_event(&mut self) -> ServerEvent {
        tokio::time::timeout(TEST_TIMEOUT, self.events.recv())
            .await
            .expect("timed out waiting for a server event")
            .expect("server stopped")
    }
}

/// Wait until the channel state satisfies `predicate`
pub async fn wait_for_state(
    rx: &mut watch::Receiver<ChannelState>,
    predicate: impl FnMut(&ChannelState) -> bool,
) -> ChannelState {
    tokio::time::timeout(TEST_TIMEOUT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for channel state")
        .expect("channel actor stopped")
        .clone()
}

/// The reference stream: three samples, SoD at 2, then end of stream
pub fn reference_frames() -> Vec<WireFrame> {
    vec![
        sample_frame(0, 3.0, -1, 0.0),
        sample_frame(1, 3.1, -1, 5.2),
        sample_frame(2, 6.0, 2, 5.2),
        finished_frame(),
    ]
}

/// Sample frame the way the detection service emits it
pub fn sample_frame(index: i64, raw: f64, sod_index: i64, threshold: f64) -> WireFrame {
    let split = threshold > 0.0 && raw > threshold;
    WireFrame {
        index: Some(index),
        raw: Some(raw),
        below_threshold: (!split).then_some(raw),
        above_threshold: split.then_some(raw),
        sod_index: Some(sod_index),
        threshold: Some(threshold),
        status: None,
    }
}

pub fn finished_frame() -> WireFrame {
    WireFrame {
        status: Some("Finished".to_string()),
        ..WireFrame::default()
    }
}

pub fn to_json(frame: &WireFrame) -> String {
    serde_json::to_string(frame).unwrap()
}
