//! In-memory client harness for module tests.

use std::sync::Arc;
use std::time::Duration;

use marvin_core::{Client, HookRegistry, HookReport, Module, ReportReceiver};
use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream, Lines, duplex};
use tokio::sync::mpsc;

pub(crate) struct Harness {
    pub client: Client,
    wire: Lines<BufReader<DuplexStream>>,
    reports: ReportReceiver,
}

impl Harness {
    /// Loads `module` into a fresh registry and wraps it in a client whose
    /// nickname is `marvin`.
    pub fn load<M: Module>(module: M) -> Self {
        let mut hooks = HookRegistry::new();
        Arc::new(module).load(&mut hooks).unwrap();

        let (ours, theirs) = duplex(4096);
        let (tx, reports) = mpsc::unbounded_channel();
        Self {
            client: Client::new(ours, "marvin", hooks, tx),
            wire: BufReader::new(theirs).lines(),
            reports,
        }
    }

    pub async fn feed(&self, line: &str) {
        self.client.dispatch(line).await;
    }

    pub async fn next_line(&mut self) -> String {
        tokio::time::timeout(Duration::from_secs(3600), self.wire.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
            .expect("wire closed")
    }

    pub async fn assert_silent(&mut self) {
        let next = tokio::time::timeout(Duration::from_millis(100), self.wire.next_line()).await;
        assert!(next.is_err(), "unexpected line: {next:?}");
    }

    pub async fn next_report(&mut self) -> HookReport {
        self.reports.recv().await.expect("report channel closed")
    }
}
