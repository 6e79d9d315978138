//! # marvin-transport
//!
//! Byte-stream transports for the marvin IRC bot.
//!
//! The supervisor only depends on the [`Connector`] trait; [`TcpConnector`]
//! is the production implementation (plain TCP or TLS via rustls). Tests plug
//! in their own connectors backed by in-memory pipes.

pub mod connection;
pub mod error;
pub mod tcp;

pub use connection::{BoxedReader, BoxedWriter, Connection, Connector};
pub use error::{TransportError, TransportResult};
pub use tcp::{TcpConfig, TcpConnector, load_pem_roots};
