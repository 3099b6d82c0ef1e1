//! Display attributes derived from a channel's state
//!
//! Everything here is a pure function of `ChannelState`; the presentation
//! layer recomputes a `ChannelView` whenever it renders.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::channel::{ChannelState, ConnectionPhase, RetentionPolicy};

/// Health classification of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

impl HealthStatus {
    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Degraded => "Degradation Detected",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl ConnectionPhase {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionPhase::Uninstantiated => "Initializing...",
            ConnectionPhase::Connecting => "Connecting...",
            ConnectionPhase::Open => "Live",
            ConnectionPhase::Closing => "Closing...",
            ConnectionPhase::Closed => "Disconnected",
        }
    }
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Chart series as `(index, value)` points
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub raw: Vec<(f64, f64)>,
    pub below_threshold: Vec<(f64, f64)>,
    pub above_threshold: Vec<(f64, f64)>,
}

impl Series {
    /// `[min, max]` of the index axis, `None` when there are no points
    pub fn x_bounds(&self) -> Option<[f64; 2]> {
        bounds(self.raw.iter().map(|(x, _)| *x))
    }

    /// `[min, max]` over every plotted value, `None` when there are no points
    pub fn y_bounds(&self) -> Option<[f64; 2]> {
        bounds(
            self.raw
                .iter()
                .chain(&self.below_threshold)
                .chain(&self.above_threshold)
                .map(|(_, y)| *y),
        )
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<[f64; 2]> {
    values.fold(None, |acc, value| match acc {
        None => Some([value, value]),
        Some([min, max]) => Some([min.min(value), max.max(value)]),
    })
}

/// Everything a channel card needs to render
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelView {
    pub channel: String,
    pub phase: ConnectionPhase,
    pub health: HealthStatus,

    /// `raw` of the newest buffered sample
    pub last_raw: Option<f64>,

    /// Horizontal reference line, present once a threshold is known
    pub threshold_line: Option<f64>,

    /// Vertical SoD marker at this index
    pub degradation_marker: Option<u64>,

    pub sample_count: usize,
    pub finished: bool,
    pub last_error: Option<String>,

    /// Arrival time of the last accepted frame
    pub last_update: Option<DateTime<Utc>>,

    pub retention: RetentionPolicy,

    /// Samples of this epoch dropped by the retention policy
    pub evicted: u64,

    pub series: Series,
}

impl ChannelView {
    pub fn from_state(state: &ChannelState) -> Self {
        let mut series = Series::default();
        for sample in state.samples() {
            let x = sample.index as f64;
            series.raw.push((x, sample.raw));
            if let Some(value) = sample.below_threshold {
                series.below_threshold.push((x, value));
            }
            if let Some(value) = sample.above_threshold {
                series.above_threshold.push((x, value));
            }
        }

        Self {
            channel: state.key.channel.clone(),
            phase: state.phase,
            health: if state.is_degraded() {
                HealthStatus::Degraded
            } else {
                HealthStatus::Healthy
            },
            last_raw: state.last_sample().map(|sample| sample.raw),
            threshold_line: state.threshold.filter(|threshold| *threshold > 0.0),
            degradation_marker: state.sod_index,
            sample_count: state.buffer.len(),
            finished: state.terminal,
            last_error: state.last_error.clone(),
            last_update: state.last_message_at,
            retention: state.buffer.policy(),
            evicted: state.buffer.evicted(),
            series,
        }
    }

    pub fn connection_label(&self) -> &'static str {
        self.phase.label()
    }

    /// Last raw value with three decimals, or "N/A"
    pub fn last_raw_label(&self) -> String {
        match self.last_raw {
            Some(value) => format!("{:.3}", value),
            None => "N/A".to_string(),
        }
    }

    pub fn threshold_label(&self) -> Option<String> {
        self.threshold_line
            .map(|threshold| format!("Threshold ({:.2})", threshold))
    }

    pub fn marker_label(&self) -> Option<String> {
        self.degradation_marker.map(|index| format!("SoD @ {}", index))
    }

    pub fn last_update_label(&self) -> Option<String> {
        self.last_update
            .map(|at| format!("Updated {}", at.format("%H:%M:%S")))
    }

    /// Note about evicted samples, `None` while nothing was evicted
    pub fn evicted_label(&self) -> Option<String> {
        if self.evicted == 0 {
            return None;
        }

        Some(match self.retention {
            RetentionPolicy::Capacity { max_samples } => {
                format!("{} evicted (keeping {})", self.evicted, max_samples)
            }
            RetentionPolicy::Window { seconds } => {
                format!("{} evicted ({}s window)", self.evicted, seconds)
            }
            RetentionPolicy::Unbounded => format!("{} evicted", self.evicted),
        })
    }

    pub fn is_live(&self) -> bool {
        self.phase == ConnectionPhase::Open
    }
}
