//! Test helpers and fixtures for cadenza integration tests
//!
//! Engines are always headless so tests run without audio hardware.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (passthrough, routing)
//! - `DSP_EPSILON` (1e-4): Generated signals
//! - `SILENCE_THRESHOLD` (0.0001): Silence detection (-80dB)

#![allow(dead_code)]

pub mod tolerances;

use cadenza::prelude::*;

/// Default test sample rate (matches common hardware)
pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Standard buffer size for deterministic testing
pub const TEST_BUFFER_SIZE: u32 = 512;

/// Send engine logs to the test harness output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Headless stereo engine.
pub fn test_engine() -> CadenzaEngine {
    test_engine_with_channels(2)
}

pub fn test_engine_with_channels(channels: u32) -> CadenzaEngine {
    init_tracing();
    CadenzaEngine::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .channels(channels)
        .frames_per_buffer(TEST_BUFFER_SIZE)
        .headless()
        .build()
        .expect("Failed to create test engine")
}

pub fn stereo() -> Format {
    Format::float32(TEST_SAMPLE_RATE, 2)
}

pub fn mono() -> Format {
    Format::float32(TEST_SAMPLE_RATE, 1)
}

/// Generator writing `value + channel index` to every channel.
pub fn constant_node(value: f32) -> Arc<Node> {
    Node::with_render_fn(NodeArgs::generator(), move |cx| {
        for ch in 0..cx.buffer().channel_count() {
            if let Some(samples) = cx.buffer_mut().channel_mut(ch) {
                samples.fill(value + ch as f32);
            }
        }
    })
}

/// Sine generator driven by the render clock, same signal on every channel.
pub fn sine_node(frequency: f64) -> Arc<Node> {
    Node::with_render_fn(NodeArgs::generator(), move |cx| {
        let start = cx.when().sample_time;
        let sample_rate = cx.when().sample_rate;
        for ch in 0..cx.buffer().channel_count() {
            if let Some(samples) = cx.buffer_mut().channel_mut(ch) {
                for (i, s) in samples.iter_mut().enumerate() {
                    let t = (start + i as i64) as f64 / sample_rate;
                    *s = (2.0 * std::f64::consts::PI * frequency * t).sin() as f32;
                }
            }
        }
    })
}

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// One channel out of an interleaved signal.
pub fn channel(samples: &[f32], channels: usize, index: usize) -> Vec<f32> {
    samples
        .iter()
        .skip(index)
        .step_by(channels)
        .copied()
        .collect()
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0, f32::max)
}

pub fn is_silent(samples: &[f32]) -> bool {
    peak(samples) < tolerances::SILENCE_THRESHOLD
}
