//! Per-channel state and its transitions
//!
//! `ChannelState` is written only by the channel's own client actor. All the
//! rules for how frames affect the state live here so they can be tested
//! without a connection.

use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::protocol::{SampleFrame, StreamMessage, StreamSample};

use super::buffer::{RetentionPolicy, SampleBuffer};

/// Identifies one channel within one dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey {
    pub dataset: String,
    pub channel: String,
}

impl ChannelKey {
    pub fn new(dataset: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            channel: channel.into(),
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.dataset, self.channel)
    }
}

/// Lifecycle phase of a channel's connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    #[default]
    Uninstantiated,
    Connecting,
    Open,
    Closing,
    Closed,
}

/// What applying a frame did to the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Sample appended to the buffer
    Appended,

    /// Sample arrived after the stream finished; only latches were updated
    LatchOnly,

    /// Stream-end frame
    Finished,
}

/// Observable state of one channel
#[derive(Debug, Clone)]
pub struct ChannelState {
    pub key: ChannelKey,
    pub phase: ConnectionPhase,
    pub buffer: SampleBuffer,

    /// Latched start-of-degradation index
    pub sod_index: Option<u64>,

    /// Latched detection threshold, always > 0 when set
    pub threshold: Option<f64>,

    /// Set once the service signalled the end of the stream
    pub terminal: bool,

    /// Successful opens so far
    pub epoch: u64,

    /// Reconnects issued after close events
    pub reconnect_attempts: u64,

    /// Non-conforming frames dropped
    pub dropped_frames: u64,

    pub last_message_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl ChannelState {
    pub fn new(key: ChannelKey, retention: RetentionPolicy) -> Self {
        Self {
            key,
            phase: ConnectionPhase::Uninstantiated,
            buffer: SampleBuffer::new(retention),
            sod_index: None,
            threshold: None,
            terminal: false,
            epoch: 0,
            reconnect_attempts: 0,
            dropped_frames: 0,
            last_message_at: None,
            last_error: None,
        }
    }

    /// Connection opened: start a new epoch with empty state
    pub fn begin_epoch(&mut self) {
        self.phase = ConnectionPhase::Open;
        self.buffer.clear();
        self.sod_index = None;
        self.threshold = None;
        self.terminal = false;
        self.epoch += 1;
        self.last_error = None;
    }

    /// Apply a decoded frame received at `now`
    pub fn apply(&mut self, message: StreamMessage, now: Instant) -> Applied {
        self.last_message_at = Some(Utc::now());

        match message {
            StreamMessage::Finished => {
                self.terminal = true;
                Applied::Finished
            }
            StreamMessage::Sample(SampleFrame {
                sample,
                sod_index,
                threshold,
            }) => {
                let applied = if self.terminal {
                    Applied::LatchOnly
                } else {
                    self.buffer.push(sample, now);
                    Applied::Appended
                };

                if let Some(sod_index) = sod_index {
                    self.sod_index = Some(sod_index);
                }
                if let Some(threshold) = threshold {
                    self.threshold = Some(threshold);
                }

                applied
            }
        }
    }

    /// Count a frame that failed to decode
    pub fn record_dropped(&mut self) {
        self.dropped_frames += 1;
    }

    pub fn samples(&self) -> impl Iterator<Item = &StreamSample> {
        self.buffer.iter()
    }

    pub fn last_sample(&self) -> Option<&StreamSample> {
        self.buffer.last()
    }

    pub fn is_degraded(&self) -> bool {
        self.sod_index.is_some()
    }
}
