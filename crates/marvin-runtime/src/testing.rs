//! Test doubles for the supervisor and runtime tests.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use marvin_core::prelude::*;
use marvin_transport::{Connection, Connector, TransportError, TransportResult};
use parking_lot::Mutex;
use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf, duplex,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

const MOCK_ADDR: &str = "mock.example.net:6697";

/// Connector that fails a fixed number of times, then hands out in-memory
/// pipes whose far ends are sent to the test.
pub(crate) struct MockConnector {
    failures: AtomicU32,
    misconfigured: bool,
    attempts: Mutex<Vec<Instant>>,
    servers: mpsc::UnboundedSender<DuplexStream>,
}

impl MockConnector {
    pub fn failing(failures: u32) -> (Arc<Self>, mpsc::UnboundedReceiver<DuplexStream>) {
        Self::build(failures, false)
    }

    pub fn misconfigured() -> (Arc<Self>, mpsc::UnboundedReceiver<DuplexStream>) {
        Self::build(0, true)
    }

    fn build(failures: u32, misconfigured: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<DuplexStream>) {
        let (servers, rx) = mpsc::unbounded_channel();
        let connector = Self {
            failures: AtomicU32::new(failures),
            misconfigured,
            attempts: Mutex::new(Vec::new()),
            servers,
        };
        (Arc::new(connector), rx)
    }

    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> TransportResult<Connection> {
        self.attempts.lock().push(Instant::now());

        if self.misconfigured {
            return Err(TransportError::InvalidConfig("bad trust root".into()));
        }
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(TransportError::Connect {
                addr: MOCK_ADDR.into(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            });
        }

        let (ours, theirs) = duplex(4096);
        let _ = self.servers.send(theirs);
        Ok(Connection::from_stream(ours, MOCK_ADDR))
    }

    fn target(&self) -> String {
        MOCK_ADDR.to_string()
    }
}

/// The server end of a mock connection.
pub(crate) struct FakeServer {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl FakeServer {
    pub fn new(stream: DuplexStream) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    pub async fn expect(&mut self, line: &str) {
        let got = self.lines.next_line().await.unwrap();
        assert_eq!(got.as_deref(), Some(line));
    }

    pub async fn send(&mut self, line: &str) {
        self.send_raw(format!("{line}\r\n").as_bytes()).await;
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
    }
}

/// Module reporting the client's channel list on every `PRIVMSG`.
pub(crate) struct Probe(mpsc::UnboundedSender<Vec<String>>);

impl Probe {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<String>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }
}

impl Module for Probe {
    fn name(&self) -> &str {
        "probe"
    }

    fn help(&self) -> &str {
        "Reports channels."
    }

    fn load(self: Arc<Self>, hooks: &mut HookRegistry) -> ModuleResult<()> {
        hooks.register("privmsg", move |client: Client, _msg: Arc<Message>| {
            let _ = self.0.send(client.channels());
            async { Ok::<(), BoxError>(()) }
        });
        Ok(())
    }
}
