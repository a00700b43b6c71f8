//! Seam between the graph and whatever drives its render callback.

use crate::callback::RenderCallback;
use crate::Result;

/// A device (or device-like driver) that periodically invokes a [`RenderCallback`].
///
/// Engines receive a backend at construction instead of reaching for a process-wide device
/// registry.
pub trait AudioBackend: Send {
    /// Human-readable device name.
    fn name(&self) -> String;

    fn sample_rate(&self) -> f64;

    fn channels(&self) -> usize;

    /// Begin invoking `callback`. Starting a running backend is a no-op.
    fn start(&mut self, callback: RenderCallback) -> Result<()>;

    fn stop(&mut self);

    fn is_running(&self) -> bool;
}
