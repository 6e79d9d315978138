//! Transport error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building a connector or opening a connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The TCP connection could not be established.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Target address.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The connection attempt did not finish in time.
    #[error("connection to {addr} timed out")]
    Timeout {
        /// Target address.
        addr: String,
    },

    /// The TLS handshake failed.
    #[error("TLS handshake with {addr} failed: {source}")]
    Handshake {
        /// Target address.
        addr: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configured trust root could not be loaded.
    #[error("invalid certificate file {path}: {reason}")]
    Certificate {
        /// Path of the PEM file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// The transport configuration is unusable.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

impl TransportError {
    /// Returns `true` for errors caused by configuration rather than the
    /// network. These cannot be fixed by retrying.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Certificate { .. } | Self::InvalidConfig(_))
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
