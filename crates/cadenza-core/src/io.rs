//! The graph's designated hardware endpoint.
//!
//! An [`IoNode`] has one input bus, rendered by the platform bridge into the device output
//! buffer, and one output bus exposed at index 1 that replays whatever the bridge captured from
//! the device input during the current callback. Requests for output bus 0 land on bus 1.

use crate::buffer::{AudioBuffer, PcmBuffer};
use crate::compat::{Arc, Mutex};
use crate::format::Format;
use crate::node::{Extension, Node, NodeArgs, NodeKind};
use crate::time::RenderTime;
use crate::Result;

/// Output bus carrying captured device input.
pub const CAPTURE_BUS: u32 = 1;

#[derive(Debug, Default)]
struct Captured {
    buffer: Option<PcmBuffer>,
    when: Option<RenderTime>,
}

/// Device input captured for the current callback.
///
/// Written and read on the render thread only; the lock is never contended in steady state.
#[derive(Debug, Default)]
pub struct CaptureSlot {
    inner: Mutex<Captured>,
}

impl CaptureSlot {
    /// Allocate room for `frames` frames of `format`. Management side.
    pub fn prepare(&self, format: Format, frames: usize) -> Result<()> {
        let buffer = PcmBuffer::new(format, frames)?;
        let mut inner = self.inner.lock();
        inner.buffer = Some(buffer);
        inner.when = None;
        Ok(())
    }

    /// Store interleaved device input. Ignored when no buffer was prepared.
    pub fn write_interleaved(&self, input: &[f32], channels: usize, when: &RenderTime) {
        let mut guard = self.inner.lock();
        let captured = &mut *guard;
        if let Some(buffer) = captured.buffer.as_mut() {
            buffer.read_interleaved(input, channels);
            captured.when = Some(*when);
        }
    }

    /// Copy the captured frames into `target`, or clear it when nothing was captured.
    pub fn read_into(&self, target: &mut dyn AudioBuffer) {
        let inner = self.inner.lock();
        let Some(captured) = inner.buffer.as_ref().filter(|_| inner.when.is_some()) else {
            target.clear();
            return;
        };
        let frames = target.frame_length().min(captured.frame_length());
        for ch in 0..target.channel_count() {
            let Some(dst) = target.channel_mut(ch) else {
                continue;
            };
            match captured.channel(ch) {
                Some(src) => {
                    dst[..frames].copy_from_slice(&src[..frames]);
                    dst[frames..].fill(0.0);
                }
                None => dst.fill(0.0),
            }
        }
    }

    pub fn last_capture_time(&self) -> Option<RenderTime> {
        self.inner.lock().when
    }

    /// Forget the last capture so later reads render silence.
    pub fn invalidate(&self) {
        self.inner.lock().when = None;
    }
}

/// Handle to the graph's hardware endpoint node.
#[derive(Debug, Clone)]
pub struct IoNode {
    node: Arc<Node>,
    capture: Arc<CaptureSlot>,
}

impl IoNode {
    pub fn new() -> Self {
        let capture = Arc::new(CaptureSlot::default());
        let args = NodeArgs {
            override_output_bus: Some(CAPTURE_BUS),
            ..NodeArgs::new(1, 1)
        };
        let node = Node::with_extension(
            NodeKind::Io,
            args,
            Extension::Io {
                device_format: None,
                capture: capture.clone(),
            },
        );
        Self { node, capture }
    }

    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    pub fn capture(&self) -> &Arc<CaptureSlot> {
        &self.capture
    }

    /// Format the device runs at. Connections to or from this node must match it.
    pub fn device_format(&self) -> Option<Format> {
        self.node.read_extension(|ext| match ext {
            Extension::Io { device_format, .. } => *device_format,
            _ => None,
        })
    }

    pub fn set_device_format(&self, format: Option<Format>) {
        self.node.update_extension(|ext| {
            if let Extension::Io { device_format, .. } = ext {
                *device_format = format;
            }
        });
    }
}

impl Default for IoNode {
    fn default() -> Self {
        Self::new()
    }
}

impl core::ops::Deref for IoNode {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}
