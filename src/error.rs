//! Centralized error type for the cadenza umbrella crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] cadenza_core::Error),

    #[error("No audio backend configured; use render_offline or supply a backend")]
    NoBackend,
}

pub type Result<T> = std::result::Result<T, Error>;
