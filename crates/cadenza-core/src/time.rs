//! Render timestamps.

use serde::{Deserialize, Serialize};

/// Point in time a render call produces audio for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderTime {
    /// Position in samples on the render clock.
    pub sample_time: i64,
    pub sample_rate: f64,
    /// Platform host clock reading, when the backend provides one.
    pub host_time: Option<u64>,
}

impl RenderTime {
    pub fn new(sample_time: i64, sample_rate: f64) -> Self {
        Self {
            sample_time,
            sample_rate,
            host_time: None,
        }
    }

    pub fn with_host_time(mut self, host_time: u64) -> Self {
        self.host_time = Some(host_time);
        self
    }

    /// Position in seconds.
    pub fn seconds(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.sample_time as f64 / self.sample_rate
        } else {
            0.0
        }
    }

    /// The time `frames` samples later.
    pub fn advanced(&self, frames: u64) -> Self {
        Self {
            sample_time: self.sample_time + frames as i64,
            ..*self
        }
    }
}
