//! Connection handles and the connector abstraction.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::TransportResult;

/// Type-erased read half of a connection.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Type-erased write half of a connection.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// An open, bidirectional byte stream split into halves.
///
/// The read half goes to the supervisor's read loop, the write half to the
/// client.
pub struct Connection {
    /// Read half.
    pub reader: BoxedReader,
    /// Write half.
    pub writer: BoxedWriter,
    /// Remote address, for logging.
    pub remote: String,
}

impl Connection {
    /// Wraps any stream, splitting it into independently owned halves.
    pub fn from_stream<S>(stream: S, remote: impl Into<String>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            remote: remote.into(),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("remote", &self.remote)
            .finish_non_exhaustive()
    }
}

/// Opens connections to one configured server.
///
/// Everything that can be validated up front (addresses, trust roots) is
/// validated when the connector is built, so [`connect`](Self::connect) only
/// fails for transient, retryable reasons.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a fresh connection.
    async fn connect(&self) -> TransportResult<Connection>;

    /// Human readable `host:port` of the target.
    fn target(&self) -> String;
}
