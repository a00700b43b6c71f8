//! Engine lifecycle integration tests
//!
//! Uses a manually cycled backend so nothing touches audio hardware.

use crate::helpers::tolerances::FLOAT_EPSILON;
use crate::helpers::*;
use approx::assert_abs_diff_eq;
use cadenza::core::compat::Mutex;
use cadenza::prelude::*;
use cadenza::{AudioBackend, BusSide, RenderCallback};

/// Backend that hands its callback back to the test to cycle by hand.
struct ManualBackend {
    sample_rate: f64,
    channels: usize,
    slot: Arc<Mutex<Option<RenderCallback>>>,
}

impl ManualBackend {
    fn new(sample_rate: f64, channels: usize) -> (Self, Arc<Mutex<Option<RenderCallback>>>) {
        let slot = Arc::new(Mutex::new(None));
        (
            Self {
                sample_rate,
                channels,
                slot: slot.clone(),
            },
            slot,
        )
    }
}

impl AudioBackend for ManualBackend {
    fn name(&self) -> String {
        "manual".to_string()
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn start(&mut self, callback: RenderCallback) -> cadenza::core::Result<()> {
        *self.slot.lock() = Some(callback);
        Ok(())
    }

    fn stop(&mut self) {
        self.slot.lock().take();
    }

    fn is_running(&self) -> bool {
        self.slot.lock().is_some()
    }
}

#[test]
fn test_headless_engine_defaults() {
    let engine = test_engine();
    assert_eq!(engine.sample_rate(), TEST_SAMPLE_RATE);
    assert_eq!(engine.channels(), 2);
    assert!(!engine.has_backend());
    assert!(!engine.is_running());
    assert!(engine.graph().contains(engine.output().node()));
    assert_eq!(engine.output().device_format(), Some(stereo()));
}

#[test]
fn test_invalid_config_is_rejected() {
    let result = CadenzaEngine::builder()
        .sample_rate(100.0)
        .headless()
        .build();
    assert!(matches!(
        result,
        Err(Error::Core(cadenza::core::Error::InvalidConfig(_)))
    ));
}

#[test]
fn test_start_without_backend_fails() {
    let engine = test_engine();
    assert!(matches!(engine.start(), Err(Error::NoBackend)));
}

#[test]
fn test_offline_render_of_empty_graph_is_silent() {
    let engine = test_engine();
    let samples = engine.render_offline(1000).unwrap();
    assert_eq!(samples.len(), 2000);
    assert!(is_silent(&samples));
    assert!(!engine.is_running());
}

#[test]
fn test_offline_render_follows_sine() {
    let engine = test_engine_with_channels(1);
    let tone = sine_node(440.0);
    engine.connect_to_output(&tone).unwrap();

    let samples = engine.render_offline(2048).unwrap();
    let expected = generate_sine(440.0, TEST_SAMPLE_RATE, 2048);
    for (got, want) in samples.iter().zip(&expected) {
        assert_abs_diff_eq!(got, want, epsilon = tolerances::DSP_EPSILON);
    }
    assert!(rms(&samples) > 0.6);
}

#[test]
fn test_output_format_is_enforced() {
    let engine = test_engine();
    let tone = constant_node(0.5);
    let err = engine
        .graph()
        .connect(&tone, engine.output().node(), mono())
        .unwrap_err();
    assert!(matches!(
        err,
        cadenza::core::Error::FormatMismatch {
            side: BusSide::Input,
            ..
        }
    ));
}

#[test]
fn test_injected_backend_drives_graph() {
    let (backend, slot) = ManualBackend::new(44100.0, 2);
    let engine = CadenzaEngine::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .backend(Box::new(backend))
        .build()
        .unwrap();
    assert_eq!(engine.sample_rate(), 44100.0);

    let tone = constant_node(0.25);
    engine.connect_to_output(&tone).unwrap();
    engine.start().unwrap();
    assert!(engine.is_running());
    engine.start().unwrap();

    let mut out = vec![0.0f32; 256 * 2];
    slot.lock()
        .as_mut()
        .expect("backend started")
        .process_interleaved(&mut out, 2);
    for &s in &channel(&out, 2, 0) {
        assert_abs_diff_eq!(s, 0.25, epsilon = FLOAT_EPSILON);
    }
    for &s in &channel(&out, 2, 1) {
        assert_abs_diff_eq!(s, 1.25, epsilon = FLOAT_EPSILON);
    }

    assert!(matches!(
        engine.render_offline(16),
        Err(Error::Core(cadenza::core::Error::AlreadyRunning))
    ));

    engine.stop();
    assert!(!engine.is_running());
    assert!(slot.lock().is_none());
}

#[test]
fn test_events_reach_subscribers() {
    let engine = test_engine();
    let events = engine.subscribe();
    let tone = constant_node(0.1);
    let conn = engine.connect_to_output(&tone).unwrap();
    engine.graph().disconnect(&conn).unwrap();

    let changes = events
        .try_iter()
        .filter(|e| *e == GraphEvent::ConfigurationChanged)
        .count();
    assert_eq!(changes, 2);
}
