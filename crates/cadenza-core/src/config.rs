//! Engine configuration.

use crate::format::Format;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the render engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub sample_rate: f64,
    pub channels: u32,
    /// Frames rendered per graph pull. Larger device buffers are split into chunks of this size.
    pub frames_per_buffer: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            channels: 2,
            frames_per_buffer: 512,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate < 8000.0 || self.sample_rate > 384000.0 {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if self.channels == 0 || self.channels > 64 {
            return Err(Error::InvalidConfig(format!(
                "channels {} out of range (1-64)",
                self.channels
            )));
        }
        if self.frames_per_buffer == 0 || self.frames_per_buffer > 8192 {
            return Err(Error::InvalidConfig(format!(
                "frames_per_buffer {} out of range (1-8192)",
                self.frames_per_buffer
            )));
        }
        Ok(())
    }

    /// Planar float format the graph renders in.
    pub fn output_format(&self) -> Format {
        Format::float32(self.sample_rate, self.channels)
    }
}
