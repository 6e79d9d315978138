//! # marvin
//!
//! A modular IRC bot that keeps one connection alive and reacts to server
//! traffic through modules.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐     ┌────────────┐     ┌─────────────────────────────────────┐
//! │ Supervisor │────▶│   Client   │────▶│ built-in hooks (PING, NICK, JOIN, …) │  inline
//! │ (backoff)  │     │ (session)  │────▶│ module hooks ("autojoin", "remind") │  own task each
//! └────────────┘     └────────────┘     └─────────────────────────────────────┘
//!        ▲                                               │ outcomes
//!        └── reconnect on read failure        reporter ◀─┘
//! ```
//!
//! - **Supervisor**: connects, backs off, and builds a fresh Client per connection
//! - **Client**: owns the write half, the session state and the hook registry
//! - **Modules**: register hooks keyed by IRC command
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use marvin::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = MarvinRuntime::builder().with_current_dir().build()?;
//!     runtime.register_module::<Time>()?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `json-log`: Enable JSON log output

pub use marvin_core as core;
pub use marvin_modules as modules;
pub use marvin_runtime as runtime;
pub use marvin_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use marvin::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use marvin_runtime::{MarvinConfig, MarvinRuntime};

    // Module authoring
    pub use marvin_core::prelude::*;

    // Bundled modules
    pub use marvin_modules::{Autojoin, NickServ, Rejoin, Remind, Time};
}
