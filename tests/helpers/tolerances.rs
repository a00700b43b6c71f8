//! Tolerance constants for audio testing.

/// Floating point rounding errors (for passthrough, exact routing).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Tolerance for signals generated through f64 -> f32 conversion.
pub const DSP_EPSILON: f32 = 1e-4;

/// Silence threshold (~-80dB).
/// Values below this are considered silent.
pub const SILENCE_THRESHOLD: f32 = 0.0001;
