//! Sample buffer with an explicit retention policy

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::protocol::StreamSample;

/// How many samples a channel keeps within one epoch
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum RetentionPolicy {
    /// Keep every sample until the next epoch
    #[default]
    Unbounded,

    /// Ring buffer holding the newest `max_samples`
    Capacity { max_samples: usize },

    /// Keep samples that arrived within `seconds` of the newest one
    Window { seconds: u64 },
}

/// Append-only sample buffer
///
/// Samples are kept in arrival order. Eviction (if the policy allows any)
/// only ever drops from the front.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: VecDeque<StreamSample>,
    arrivals: VecDeque<Instant>,
    policy: RetentionPolicy,
    evicted: u64,
}

impl SampleBuffer {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            samples: VecDeque::new(),
            arrivals: VecDeque::new(),
            policy,
            evicted: 0,
        }
    }

    /// Append a sample that arrived at `now`
    pub fn push(&mut self, sample: StreamSample, now: Instant) {
        self.samples.push_back(sample);
        self.arrivals.push_back(now);
        self.prune(now);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.arrivals.clear();
        self.evicted = 0;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&StreamSample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StreamSample> {
        self.samples.iter()
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Samples dropped by retention since the epoch began
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    fn prune(&mut self, newest: Instant) {
        match self.policy {
            RetentionPolicy::Unbounded => {}
            RetentionPolicy::Capacity { max_samples } => {
                while self.samples.len() > max_samples {
                    self.pop_front();
                }
            }
            RetentionPolicy::Window { seconds } => {
                let window = Duration::from_secs(seconds);
                while let Some(front) = self.arrivals.front() {
                    if newest.duration_since(*front) > window {
                        self.pop_front();
                    } else {
                        break;
                    }
                }
            }
        }
    }

    fn pop_front(&mut self) {
        self.samples.pop_front();
        self.arrivals.pop_front();
        self.evicted += 1;
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}
