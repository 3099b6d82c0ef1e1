//! Per-channel streaming clients
//!
//! Each channel of the active dataset gets one client actor. The actor owns
//! the connection, applies incoming frames to its `ChannelState` and
//! publishes the state through a `watch` channel.
//!
//! ```text
//! detection service ──ws──► ChannelClient (actor) ──watch──► view / TUI
//!                                  ▲
//!                                  └── ChannelCommand::Shutdown (ChannelHandle)
//! ```

pub mod buffer;
pub mod client;
pub mod state;

pub use buffer::{RetentionPolicy, SampleBuffer};
pub use client::{ChannelHandle, ClientSettings, ReconnectPolicy};
pub use state::{Applied, ChannelKey, ChannelState, ConnectionPhase};
