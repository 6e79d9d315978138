//! Configuration for the marvin runtime.
//!
//! Settings are layered with figment: built-in defaults, then `marvin.toml`,
//! then `MARVIN_*` environment variables, then programmatic overrides (the
//! command line).

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config, load_config_from_file};
pub use schema::{
    IdentityConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, MarvinConfig, ReconnectConfig,
    ServerConfig,
};
pub use validation::validate_config;
