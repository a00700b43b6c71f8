//! Rendering the graph without a device.

use crate::callback::RenderCallback;
use crate::compat::Arc;
use crate::config::EngineConfig;
use crate::graph::Graph;
use crate::Result;

/// Pulls the graph block by block on the calling thread.
///
/// The graph must be started with [`Graph::start_render`] for anything but silence to come out.
pub struct OfflineRenderer {
    callback: RenderCallback,
    block: Vec<f32>,
}

impl OfflineRenderer {
    pub fn new(graph: Arc<Graph>, config: &EngineConfig) -> Result<Self> {
        let callback = RenderCallback::new(graph, config)?;
        let block = vec![0.0; config.frames_per_buffer as usize * config.channels as usize];
        Ok(Self { callback, block })
    }

    pub fn channels(&self) -> usize {
        self.callback.channels()
    }

    pub fn sample_time(&self) -> i64 {
        self.callback.sample_time()
    }

    /// Render `frames` frames, handing each interleaved block to `sink` with its start time.
    pub fn render(&mut self, frames: usize, mut sink: impl FnMut(&[f32], i64)) {
        let channels = self.channels();
        let block_frames = self.block.len() / channels;
        let mut remaining = frames;

        while remaining > 0 {
            let count = remaining.min(block_frames);
            let start = self.callback.sample_time();
            let out = &mut self.block[..count * channels];
            self.callback.process_interleaved(out, channels);
            sink(out, start);
            remaining -= count;
        }
    }

    /// Render `frames` frames into one interleaved vector.
    pub fn render_to_vec(&mut self, frames: usize) -> Vec<f32> {
        let mut samples = Vec::with_capacity(frames * self.channels());
        self.render(frames, |block, _| samples.extend_from_slice(block));
        samples
    }
}
