//! # marvin-core
//!
//! The protocol engine of the marvin IRC bot.
//!
//! - **Codec**: [`Message::decode`] turns a raw line into a [`Message`];
//!   [`encode!`] and [`sanitize`] build injection-safe outgoing lines.
//! - **Hooks**: [`HookRegistry`] maps lowercase commands to [`Hook`]s.
//! - **Session**: [`Session`] tracks the nickname and joined channels.
//! - **Client**: [`Client`] ties one transport, one registry and one session
//!   together and dispatches lines to hooks concurrently.
//! - **Modules**: the [`Module`] trait is how features plug into the bot.
//!
//! ```text
//! line ──▶ Message::decode ──▶ built-ins (inline) ──▶ hook task ──▶ Client::write ──▶ wire
//!                                                 └─▶ hook task ──▶ ...
//! ```
//!
//! Connection management lives in `marvin-runtime`; this crate does no I/O
//! beyond writing to the writer it is handed.

pub mod client;
pub mod encode;
pub mod error;
pub mod message;
pub mod module;
pub mod registry;
pub mod session;

pub use client::{BoxedWriter, Client, HookReport, Identity, ReportReceiver, ReportSender};
pub use encode::{LINE_TERMINATOR, Sanitized, sanitize};
pub use error::{ClientError, ClientResult, ModuleError, ModuleResult};
pub use message::{Message, Sender};
pub use module::{BoxedModule, ConfigurableModule, Module};
pub use registry::{BoxError, BoxedHook, Hook, HookRegistry, HookResult};
pub use session::Session;

/// Prelude for module authors.
pub mod prelude {
    pub use crate::{
        BoxError, Client, ConfigurableModule, HookRegistry, HookResult, Message, Module,
        ModuleError, ModuleResult, encode, irc_write,
    };
    pub use std::sync::Arc;
}
