//! Runtime error types.

use thiserror::Error;

use marvin_core::ModuleError;
use marvin_transport::TransportError;

use crate::config::ConfigError;

/// Errors that end a runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A module could not be configured or loaded.
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// The transport could not be set up.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Every allowed connection attempt failed.
    #[error("Giving up after {attempts} failed connection attempt(s)")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Error of the last attempt.
        #[source]
        last: TransportError,
    },
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
