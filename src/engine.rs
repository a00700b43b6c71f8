//! CadenzaEngine: the graph plus whatever drives it.

use crate::core::{
    AudioBackend, Connection, EngineConfig, Format, Graph, GraphEvent, IoNode, Node,
    OfflineRenderer, RenderCallback,
};
use crate::{Error, Result};
use cadenza_core::compat::Mutex;
use cadenza_core::Arc;
use crossbeam_channel::Receiver;

/// Owns the [`Graph`], its designated output node and an optional [`AudioBackend`].
///
/// # Example
///
/// ```ignore
/// use cadenza::prelude::*;
///
/// let engine = CadenzaEngine::builder().headless().build()?;
/// let tone = Node::with_render_fn(NodeArgs::generator(), |cx| { /* ... */ });
/// engine.connect_to_output(&tone)?;
/// let samples = engine.render_offline(1024)?;
/// ```
pub struct CadenzaEngine {
    graph: Arc<Graph>,
    output: IoNode,
    config: EngineConfig,
    backend: Mutex<Option<Box<dyn AudioBackend>>>,
}

impl CadenzaEngine {
    pub fn builder() -> crate::CadenzaEngineBuilder {
        crate::CadenzaEngineBuilder::default()
    }

    pub(crate) fn from_parts(
        graph: Arc<Graph>,
        output: IoNode,
        config: EngineConfig,
        backend: Option<Box<dyn AudioBackend>>,
    ) -> Self {
        Self {
            graph,
            output,
            config,
            backend: Mutex::new(backend),
        }
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// The graph's I/O node. Whatever feeds its input bus is what the device plays.
    pub fn output(&self) -> &IoNode {
        &self.output
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    pub fn channels(&self) -> u32 {
        self.config.channels
    }

    /// Format connections into the output node must use.
    pub fn output_format(&self) -> Format {
        self.config.output_format()
    }

    pub fn subscribe(&self) -> Receiver<GraphEvent> {
        self.graph.subscribe()
    }

    /// Connect `node`'s next free output to the output node at the engine format.
    pub fn connect_to_output(&self, node: &Arc<Node>) -> Result<Arc<Connection>> {
        Ok(self
            .graph
            .connect(node, self.output.node(), self.output_format())?)
    }

    pub fn has_backend(&self) -> bool {
        self.backend.lock().is_some()
    }

    /// Start the backend and the graph's render path.
    pub fn start(&self) -> Result<()> {
        let mut backend = self.backend.lock();
        let backend = backend.as_mut().ok_or(Error::NoBackend)?;
        if backend.is_running() {
            return Ok(());
        }

        let callback = RenderCallback::new(self.graph.clone(), &self.config)?;
        self.graph.start_render()?;
        if let Err(err) = backend.start(callback) {
            self.graph.stop_render();
            return Err(err.into());
        }
        tracing::debug!(backend = %backend.name(), "engine started");
        Ok(())
    }

    pub fn stop(&self) {
        if let Some(backend) = self.backend.lock().as_mut() {
            backend.stop();
        }
        self.graph.stop_render();
    }

    pub fn is_running(&self) -> bool {
        self.graph.is_running()
    }

    /// Renderer that pulls the graph on the calling thread. The caller starts the graph.
    pub fn offline_renderer(&self) -> Result<OfflineRenderer> {
        Ok(OfflineRenderer::new(self.graph.clone(), &self.config)?)
    }

    /// Render `frames` interleaved frames without a device.
    ///
    /// Fails with `AlreadyRunning` while a backend is driving the graph.
    pub fn render_offline(&self, frames: usize) -> Result<Vec<f32>> {
        let mut renderer = self.offline_renderer()?;
        self.graph.start_render()?;
        let samples = renderer.render_to_vec(frames);
        self.graph.stop_render();
        Ok(samples)
    }
}

impl Drop for CadenzaEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
