//! Builder for configuring and constructing a `CadenzaEngine`.

use crate::core::{AudioBackend, EngineConfig, Graph};
use crate::{CadenzaEngine, Result};
use cadenza_core::Arc;

/// Without an explicit backend the engine is headless unless the `cpal` feature is enabled,
/// in which case the default (or selected) output device is opened.
///
/// When a backend is present its sample rate and channel count override the configured ones.
///
/// # Example
///
/// ```ignore
/// use cadenza::prelude::*;
///
/// let engine = CadenzaEngine::builder()
///     .sample_rate(48000.0)
///     .channels(2)
///     .headless()
///     .build()?;
///
/// let samples = engine.render_offline(4800)?;
/// ```
pub struct CadenzaEngineBuilder {
    config: EngineConfig,
    backend: Option<Box<dyn AudioBackend>>,
    headless: bool,

    #[cfg(feature = "cpal")]
    output_device: Option<usize>,
}

impl Default for CadenzaEngineBuilder {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            backend: None,
            headless: false,

            #[cfg(feature = "cpal")]
            output_device: None,
        }
    }
}

impl CadenzaEngineBuilder {
    /// Default: 44100.0
    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    /// Default: 2
    pub fn channels(mut self, channels: u32) -> Self {
        self.config.channels = channels;
        self
    }

    /// Default: 512
    pub fn frames_per_buffer(mut self, frames: u32) -> Self {
        self.config.frames_per_buffer = frames;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn backend(mut self, backend: Box<dyn AudioBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Never open an audio device.
    pub fn headless(mut self) -> Self {
        self.headless = true;
        self
    }

    #[cfg(feature = "cpal")]
    pub fn output_device(mut self, index: usize) -> Self {
        self.output_device = Some(index);
        self
    }

    pub fn build(self) -> Result<CadenzaEngine> {
        let mut config = self.config;

        #[allow(unused_mut)]
        let mut backend = if self.headless { None } else { self.backend };

        #[cfg(feature = "cpal")]
        if backend.is_none() && !self.headless {
            let output = crate::core::AudioOutput::new(crate::core::AudioOutputConfig {
                output_device_index: self.output_device,
            })?;
            backend = Some(Box::new(output) as Box<dyn AudioBackend>);
        }

        if let Some(backend) = &backend {
            config.sample_rate = backend.sample_rate();
            config.channels = backend.channels() as u32;
        }
        config.validate()?;

        let graph = Arc::new(Graph::new());
        let output = graph.add_io();
        output.set_device_format(Some(config.output_format()));

        tracing::debug!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            frames_per_buffer = config.frames_per_buffer,
            backend = ?backend.as_ref().map(|b| b.name()),
            "engine built"
        );

        Ok(CadenzaEngine::from_parts(graph, output, config, backend))
    }
}
