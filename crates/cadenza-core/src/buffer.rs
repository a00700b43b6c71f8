//! Planar sample buffers handed through the render path.

use crate::format::{Format, PcmFormat};
use crate::{Error, Result};

/// Buffer a node renders into.
///
/// Channel accessors return `None` for channels the buffer does not expose. Remapped views use
/// that to drop writes for channels with no destination.
pub trait AudioBuffer {
    fn format(&self) -> &Format;

    /// Number of valid frames.
    fn frame_length(&self) -> usize;

    fn channel(&self, channel: usize) -> Option<&[f32]>;

    fn channel_mut(&mut self, channel: usize) -> Option<&mut [f32]>;

    fn channel_count(&self) -> usize {
        self.format().channel_count() as usize
    }

    /// Zero every exposed channel.
    fn clear(&mut self) {
        for ch in 0..self.channel_count() {
            if let Some(samples) = self.channel_mut(ch) {
                samples.fill(0.0);
            }
        }
    }
}

/// Owned, non-interleaved `f32` buffer.
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    format: Format,
    frame_capacity: usize,
    frame_length: usize,
    data: Vec<f32>,
}

impl PcmBuffer {
    /// Allocate a zeroed buffer. Only non-interleaved `Float32` formats are accepted.
    pub fn new(format: Format, frame_capacity: usize) -> Result<Self> {
        if format.is_interleaved() {
            return Err(Error::InvalidFormat(
                "PcmBuffer stores planar samples; interleaved formats are not supported"
                    .to_string(),
            ));
        }
        if format.pcm_format() != PcmFormat::Float32 {
            return Err(Error::InvalidFormat(format!(
                "PcmBuffer stores Float32 samples, got {:?}",
                format.pcm_format()
            )));
        }
        let channels = format.channel_count() as usize;
        Ok(Self {
            format,
            frame_capacity,
            frame_length: frame_capacity,
            data: vec![0.0; channels * frame_capacity],
        })
    }

    pub fn frame_capacity(&self) -> usize {
        self.frame_capacity
    }

    /// Set the number of valid frames, clamped to the capacity.
    pub fn set_frame_length(&mut self, frames: usize) {
        self.frame_length = frames.min(self.frame_capacity);
    }

    /// Copy `source` channel by channel. Channels missing on either side are left untouched.
    pub fn copy_from(&mut self, source: &dyn AudioBuffer) {
        let frames = self.frame_length.min(source.frame_length());
        for ch in 0..self.channel_count() {
            let Some(src) = source.channel(ch) else {
                continue;
            };
            if let Some(dst) = self.channel_mut(ch) {
                dst[..frames].copy_from_slice(&src[..frames]);
            }
        }
    }

    /// Write the valid frames into an interleaved slice with `channels` samples per frame.
    ///
    /// Extra output channels are zeroed; extra buffer channels are dropped. Returns frames written.
    pub fn write_interleaved(&self, out: &mut [f32], channels: usize) -> usize {
        if channels == 0 {
            return 0;
        }
        let frames = self.frame_length.min(out.len() / channels);
        let own = self.channel_count();
        for (frame, chunk) in out.chunks_exact_mut(channels).take(frames).enumerate() {
            for (ch, sample) in chunk.iter_mut().enumerate() {
                *sample = if ch < own {
                    self.data[ch * self.frame_capacity + frame]
                } else {
                    0.0
                };
            }
        }
        frames
    }

    /// Load frames from an interleaved slice, setting the frame length to what was read.
    pub fn read_interleaved(&mut self, input: &[f32], channels: usize) -> usize {
        if channels == 0 {
            self.frame_length = 0;
            return 0;
        }
        let frames = self.frame_capacity.min(input.len() / channels);
        let own = self.channel_count();
        for ch in 0..own {
            let plane = &mut self.data[ch * self.frame_capacity..][..frames];
            for (frame, sample) in plane.iter_mut().enumerate() {
                *sample = if ch < channels {
                    input[frame * channels + ch]
                } else {
                    0.0
                };
            }
        }
        self.frame_length = frames;
        frames
    }
}

impl AudioBuffer for PcmBuffer {
    fn format(&self) -> &Format {
        &self.format
    }

    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn channel(&self, channel: usize) -> Option<&[f32]> {
        if channel >= self.channel_count() {
            return None;
        }
        let start = channel * self.frame_capacity;
        Some(&self.data[start..start + self.frame_length])
    }

    fn channel_mut(&mut self, channel: usize) -> Option<&mut [f32]> {
        if channel >= self.channel_count() {
            return None;
        }
        let start = channel * self.frame_capacity;
        Some(&mut self.data[start..start + self.frame_length])
    }
}

/// A view over another buffer with channels reindexed.
///
/// `map(ch)` gives the underlying channel for view channel `ch`, or `None` to discard it.
/// The view reports `format` (typically the upstream connection's format) so sources render as
/// if into a buffer of their own channel count.
pub struct RemappedBuffer<'a, F>
where
    F: Fn(usize) -> Option<usize>,
{
    inner: &'a mut dyn AudioBuffer,
    format: Format,
    map: F,
}

impl<'a, F> RemappedBuffer<'a, F>
where
    F: Fn(usize) -> Option<usize>,
{
    pub fn new(inner: &'a mut dyn AudioBuffer, channel_count: u32, map: F) -> Self {
        let format = inner.format().with_channel_count(channel_count);
        Self { inner, format, map }
    }
}

impl<F> AudioBuffer for RemappedBuffer<'_, F>
where
    F: Fn(usize) -> Option<usize>,
{
    fn format(&self) -> &Format {
        &self.format
    }

    fn frame_length(&self) -> usize {
        self.inner.frame_length()
    }

    fn channel(&self, channel: usize) -> Option<&[f32]> {
        if channel >= self.channel_count() {
            return None;
        }
        (self.map)(channel).and_then(|ch| self.inner.channel(ch))
    }

    fn channel_mut(&mut self, channel: usize) -> Option<&mut [f32]> {
        if channel >= self.channel_count() {
            return None;
        }
        match (self.map)(channel) {
            Some(ch) => self.inner.channel_mut(ch),
            None => None,
        }
    }
}
