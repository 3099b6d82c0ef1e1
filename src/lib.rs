//! Live bearing-health dashboard client
//!
//! Streams per-channel sample frames from a remote onset-of-degradation
//! detection service over WebSocket, keeps one latched state per channel, and
//! derives what a dashboard needs to show from it.

pub mod channel;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod view;

#[cfg(feature = "dashboard")]
pub mod viewer;

pub use channel::{ChannelHandle, ChannelKey, ChannelState, ConnectionPhase, RetentionPolicy};
pub use config::Config;
pub use dashboard::{Dashboard, DatasetSpec, Registry};
pub use protocol::{StreamMessage, StreamSample, WireFrame};
pub use transport::{Transport, WsTransport};
pub use view::{ChannelView, HealthStatus};
