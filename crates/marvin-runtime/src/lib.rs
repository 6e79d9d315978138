//! # marvin-runtime
//!
//! Everything around the protocol engine that turns it into a running bot:
//!
//! - Configuration loading and validation ([`config`])
//! - Logging setup ([`logging`])
//! - The module set and the `!help` command ([`ModuleSet`])
//! - Connection supervision with reconnect backoff ([`Supervisor`])
//! - Hook outcome logging ([`run_reporter`])
//! - The [`MarvinRuntime`] facade tying them together
//!
//! ```ignore
//! use marvin_runtime::MarvinRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = MarvinRuntime::builder().build()?;
//!     runtime.register_module::<marvin_modules::Time>()?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod modules;
pub mod reporter;
pub mod runtime;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use codec::LineCodec;
pub use config::{ConfigError, ConfigLoader, ConfigResult, MarvinConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use modules::ModuleSet;
pub use reporter::{ReporterStats, run_reporter};
pub use runtime::{MarvinRuntime, RuntimeBuilder, wait_for_shutdown};
pub use supervisor::{Backoff, Supervisor, SupervisorSettings, SupervisorState};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
