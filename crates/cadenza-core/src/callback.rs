//! Real-time callback that drives the graph from a device buffer.

use crate::buffer::{AudioBuffer, PcmBuffer};
use crate::compat::Arc;
use crate::config::EngineConfig;
use crate::graph::Graph;
use crate::time::RenderTime;
use crate::Result;

/// Everything the device callback needs, allocated up front.
///
/// Device buffers larger than `frames_per_buffer` are rendered in chunks; the sample clock
/// advances by the frames actually produced.
pub struct RenderCallback {
    graph: Arc<Graph>,
    scratch: PcmBuffer,
    sample_rate: f64,
    sample_time: i64,
}

impl RenderCallback {
    pub fn new(graph: Arc<Graph>, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let scratch = PcmBuffer::new(config.output_format(), config.frames_per_buffer as usize)?;
        Ok(Self {
            graph,
            scratch,
            sample_rate: config.sample_rate,
            sample_time: 0,
        })
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// Position of the next frame to render.
    pub fn sample_time(&self) -> i64 {
        self.sample_time
    }

    pub fn channels(&self) -> usize {
        self.scratch.format().channel_count() as usize
    }

    /// Fill an interleaved output slice with `channels` samples per frame.
    pub fn process_interleaved(&mut self, output: &mut [f32], channels: usize) {
        self.process_duplex(&[], 0, output, channels);
    }

    /// Fill `output` after exposing interleaved device `input` on the I/O node's capture bus.
    pub fn process_duplex(
        &mut self,
        input: &[f32],
        input_channels: usize,
        output: &mut [f32],
        channels: usize,
    ) {
        if channels == 0 {
            return;
        }
        let capacity = self.scratch.frame_capacity();
        let total = output.len() / channels;
        let mut done = 0;

        while done < total {
            let frames = (total - done).min(capacity);
            self.scratch.set_frame_length(frames);
            let when = RenderTime::new(self.sample_time, self.sample_rate);

            let rendered = if input_channels > 0 {
                let start = (done * input_channels).min(input.len());
                let end = ((done + frames) * input_channels).min(input.len());
                self.graph.render_duplex(
                    &input[start..end],
                    input_channels,
                    &mut self.scratch,
                    &when,
                )
            } else {
                self.graph.render(&mut self.scratch, &when)
            };
            if !rendered {
                self.scratch.clear();
            }

            let out = &mut output[done * channels..(done + frames) * channels];
            self.scratch.write_interleaved(out, channels);

            self.sample_time += frames as i64;
            done += frames;
        }

        output[total * channels..].fill(0.0);
    }
}
