//! Error types for cadenza-core.

use crate::format::Format;
use thiserror::Error;

/// Which side of a node a bus belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusSide {
    Input,
    Output,
}

impl core::fmt::Display for BusSide {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BusSide::Input => f.write_str("input"),
            BusSide::Output => f.write_str("output"),
        }
    }
}

/// Error type for cadenza-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Node has been released")]
    NodeReleased,

    #[error("{side} bus {bus} is already occupied")]
    BusOccupied { side: BusSide, bus: u32 },

    #[error("{side} bus {bus} is out of range")]
    BusOutOfRange { side: BusSide, bus: u32 },

    #[error("No {side} bus available")]
    BusExhausted { side: BusSide },

    #[error("Format mismatch on {side} bus {bus}: node reports {expected:?}, connection uses {actual:?}")]
    FormatMismatch {
        side: BusSide,
        bus: u32,
        expected: Format,
        actual: Format,
    },

    #[error("Connection would create a cycle")]
    CycleDetected,

    #[error("Node is already attached to the graph")]
    NodeAlreadyAttached,

    #[error("Node is not attached to the graph")]
    NodeNotAttached,

    #[error("Connection is not part of the graph")]
    ConnectionNotFound,

    #[error("Rendering is already running")]
    AlreadyRunning,

    #[error("Invalid device: {0}")]
    InvalidDevice(String),

    #[cfg(feature = "cpal")]
    #[error("Audio device not available")]
    DeviceNotAvailable(#[from] cpal::DefaultStreamConfigError),

    #[cfg(feature = "cpal")]
    #[error("Failed to build audio stream")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[cfg(feature = "cpal")]
    #[error("Failed to play audio stream")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[cfg(feature = "cpal")]
    #[error("Failed to enumerate devices")]
    DevicesError(#[from] cpal::DevicesError),

    #[cfg(feature = "cpal")]
    #[error("Failed to get device name")]
    DeviceNameError(#[from] cpal::DeviceNameError),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
