//! Errors raised while assembling the core runtime.

use thiserror::Error;

/// Failures surfaced during configuration and runtime setup.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value failed validation.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A required host capability was never injected.
    ///
    /// The message names a concrete implementation the host can provide.
    #[error("Missing capability {capability}: {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
