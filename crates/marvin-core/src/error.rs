//! Error types for the protocol engine.

use thiserror::Error;

/// Errors returned by [`Client::write`](crate::Client::write).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport rejected the write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client was closed, usually because its connection was replaced.
    #[error("connection closed")]
    Closed,
}

/// Errors raised while loading a [`Module`](crate::Module).
#[derive(Debug, Error)]
pub enum ModuleError {
    /// The module's configuration section could not be used.
    #[error("invalid configuration for module '{module}': {reason}")]
    Config {
        /// Module name.
        module: String,
        /// What was wrong.
        reason: String,
    },

    /// Any other load failure.
    #[error("module '{module}' failed to load: {reason}")]
    Load {
        /// Module name.
        module: String,
        /// What went wrong.
        reason: String,
    },
}

impl ModuleError {
    /// Creates a configuration error.
    pub fn config(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            module: module.into(),
            reason: reason.into(),
        }
    }

    /// Creates a load error.
    pub fn load(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            module: module.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type for module loading.
pub type ModuleResult<T> = Result<T, ModuleError>;
