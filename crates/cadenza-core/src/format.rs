//! Stream format descriptors.
//!
//! A [`Format`] is compared, never converted: both ends of a connection must agree on it.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Sample representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PcmFormat {
    Float32,
    Float64,
    Int16,
    Fixed824,
}

impl PcmFormat {
    pub fn bytes_per_sample(self) -> u32 {
        match self {
            PcmFormat::Float32 | PcmFormat::Fixed824 => 4,
            PcmFormat::Float64 => 8,
            PcmFormat::Int16 => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Format {
    sample_rate: f64,
    channel_count: u32,
    pcm_format: PcmFormat,
    interleaved: bool,
}

impl Format {
    pub fn new(
        sample_rate: f64,
        channel_count: u32,
        pcm_format: PcmFormat,
        interleaved: bool,
    ) -> Result<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(Error::InvalidFormat(format!(
                "sample_rate must be positive, got {}",
                sample_rate
            )));
        }
        if channel_count == 0 {
            return Err(Error::InvalidFormat(
                "channel_count must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            sample_rate,
            channel_count,
            pcm_format,
            interleaved,
        })
    }

    /// Non-interleaved 32-bit float, the format the render path works in.
    pub fn float32(sample_rate: f64, channel_count: u32) -> Self {
        Self {
            sample_rate,
            channel_count,
            pcm_format: PcmFormat::Float32,
            interleaved: false,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> u32 {
        self.channel_count
    }

    pub fn pcm_format(&self) -> PcmFormat {
        self.pcm_format
    }

    pub fn is_interleaved(&self) -> bool {
        self.interleaved
    }

    /// Number of separate sample planes a buffer of this format holds.
    pub fn buffer_count(&self) -> u32 {
        if self.interleaved {
            1
        } else {
            self.channel_count
        }
    }

    /// Samples between two consecutive frames within one plane.
    pub fn stride(&self) -> u32 {
        if self.interleaved {
            self.channel_count
        } else {
            1
        }
    }

    /// Same format with a different channel count.
    pub fn with_channel_count(&self, channel_count: u32) -> Self {
        Self {
            channel_count,
            ..*self
        }
    }
}
