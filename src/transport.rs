//! Streaming transport used by the channel clients
//!
//! The client only needs two things from a connection: the next inbound frame
//! and a way to close it. `Transport` is the connector; `WsTransport` is the
//! WebSocket implementation used in production.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Message, client::IntoClientRequest},
};
use tracing::{debug, trace};
use url::Url;

use crate::error::TransportError;

const USER_AGENT: &str = concat!("sod-viewer/", env!("CARGO_PKG_VERSION"));

/// How long a closing connection waits for the peer's close frame
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Inbound frame as seen by a channel client
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),

    /// Peer started the close handshake
    Close,
}

/// An established, receive-only stream
#[async_trait]
pub trait Connection: Send {
    /// Next frame, or `None` once the stream has ended
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>>;

    /// Close the connection; errors while closing are ignored
    async fn close(&mut self);
}

/// Opens connections to channel endpoints
///
/// A transport holds no per-channel state, so one instance can be shared by
/// every client.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Connection>, TransportError>;
}

/// Build `{base}/{dataset}/{channel}` with both parts encoded as single path
/// segments
pub fn channel_url(base: &Url, dataset: &str, channel: &str) -> Result<Url, TransportError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| TransportError::InvalidRequest(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .push(dataset)
        .push(channel);
    Ok(url)
}

/// WebSocket transport based on tokio-tungstenite
#[derive(Debug, Clone, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Connection>, TransportError> {
        let host = url
            .host_str()
            .ok_or_else(|| TransportError::InvalidRequest(format!("{} has no host", url)))?;

        // wss -> https, ws -> http
        let origin_scheme = if url.scheme() == "wss" { "https" } else { "http" };
        let origin = match url.port() {
            Some(port) => format!("{}://{}:{}", origin_scheme, host, port),
            None => format!("{}://{}", origin_scheme, host),
        };

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let headers = request.headers_mut();
        headers.insert(
            "Origin",
            origin
                .parse()
                .map_err(|_| TransportError::InvalidRequest(format!("bad origin {}", origin)))?,
        );
        headers.insert(
            "User-Agent",
            USER_AGENT
                .parse()
                .map_err(|_| TransportError::InvalidRequest("bad user agent".to_string()))?,
        );

        debug!("connecting: url={}, origin={}", url, origin);

        let (stream, _) = connect_async(request).await.map_err(|e| {
            TransportError::ConnectFailed(format!("{} ({})", e, url))
        })?;

        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(TransportError::ReadFailed(e.to_string()))),
            };

            match message {
                Message::Text(text) => return Some(Ok(Frame::Text(text))),
                Message::Binary(bytes) => return Some(Ok(Frame::Binary(bytes))),
                Message::Close(_) => return Some(Ok(Frame::Close)),
                // pongs are answered by tungstenite itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                    trace!("skipping control frame");
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            trace!("error while closing websocket: {}", e);
        }
        // drain until the peer acknowledges the close
        let drain = async {
            while let Some(Ok(_)) = self.stream.next().await {}
            let _ = self.stream.flush().await;
        };
        if tokio::time::timeout(CLOSE_TIMEOUT, drain).await.is_err() {
            debug!("peer did not acknowledge close in time");
        }
    }
}
