//! Connection supervision.
//!
//! The [`Supervisor`] owns the read loop of the bot:
//!
//! ```text
//! Disconnected ─▶ Connecting ─▶ Handshaking ─▶ Streaming ─▶ Reconnecting ─┐
//!                     ▲                                                   │
//!                     └───────────────────────────────────────────────────┘
//! ```
//!
//! Every connection gets a brand-new [`Client`] with a fresh hook registry and
//! session, so nothing learned on a dead connection leaks into the next one.
//! The current state is published on a `watch` channel.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use marvin_core::{Client, Identity, ReportSender};
use marvin_transport::{BoxedReader, Connection, Connector};

use crate::codec::LineCodec;
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging::WIRE_TARGET;
use crate::modules::ModuleSet;

/// Where the supervisor currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorState {
    /// Not started yet.
    Disconnected,
    /// Opening a transport.
    Connecting {
        /// 1-based attempt number since the last successful connection.
        attempt: u32,
    },
    /// Transport is open, registration is being sent.
    Handshaking {
        /// Remote address.
        remote: String,
    },
    /// Reading and dispatching lines.
    Streaming {
        /// Remote address.
        remote: String,
    },
    /// The connection ended; a new one is about to be opened.
    Reconnecting {
        /// Remote address of the connection that ended.
        previous: String,
    },
    /// Terminal state.
    Stopped,
}

/// Linear reconnect policy.
///
/// The first attempt is made immediately. After failed attempt `i` the
/// supervisor waits `i * base_delay` before attempt `i + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay unit.
    pub base_delay: Duration,
    /// Maximum number of consecutive attempts. Unbounded if `None`.
    pub max_attempts: Option<u32>,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(3),
            max_attempts: None,
        }
    }
}

impl Backoff {
    /// Delay after failed attempt `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Whether attempt number `attempt` may be made.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max)
    }
}

/// Per-bot settings the supervisor needs.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Registration identity.
    pub identity: Identity,
    /// Server host name sent with `USER`.
    pub server_host: String,
    /// Reconnect policy.
    pub backoff: Backoff,
    /// Log every received line.
    pub verbose: bool,
}

enum StreamEnd {
    Shutdown,
    Closed,
    Failed(String),
}

/// Drives one bot connection for its whole lifetime.
pub struct Supervisor {
    connector: Arc<dyn Connector>,
    modules: ModuleSet,
    settings: SupervisorSettings,
    reports: ReportSender,
    state: watch::Sender<SupervisorState>,
    shutdown: CancellationToken,
}

impl Supervisor {
    /// Creates a supervisor.
    ///
    /// Hook outcomes of every client it builds are sent to `reports`.
    pub fn new(
        connector: Arc<dyn Connector>,
        modules: ModuleSet,
        settings: SupervisorSettings,
        reports: ReportSender,
    ) -> Self {
        let (state, _) = watch::channel(SupervisorState::Disconnected);
        Self {
            connector,
            modules,
            settings,
            reports,
            state,
            shutdown: CancellationToken::new(),
        }
    }

    /// Publishes state changes on `state` instead of a private channel.
    pub fn with_state(mut self, state: watch::Sender<SupervisorState>) -> Self {
        self.state = state;
        self
    }

    /// Stops when `token` is cancelled.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    /// Token that stops the supervisor when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs until shutdown, a configuration error or retry exhaustion.
    pub async fn run(self) -> RuntimeResult<()> {
        let result = self.supervise().await;
        if let Err(e) = &result {
            error!(error = %e, "Supervisor stopped");
        }
        self.set_state(SupervisorState::Stopped);
        result
    }

    async fn supervise(&self) -> RuntimeResult<()> {
        loop {
            let Some(conn) = self.connect_with_backoff().await? else {
                return Ok(());
            };
            let Connection {
                reader,
                writer,
                remote,
            } = conn;

            self.set_state(SupervisorState::Handshaking {
                remote: remote.clone(),
            });
            let hooks = self.modules.build_registry()?;
            let client = Client::new(
                writer,
                &self.settings.identity.nickname,
                hooks,
                self.reports.clone(),
            );

            let end = async {
                if let Err(e) = client
                    .handshake(&self.settings.identity, &self.settings.server_host)
                    .await
                {
                    return StreamEnd::Failed(format!("handshake failed: {e}"));
                }
                debug!(nickname = %self.settings.identity.nickname, "Registration sent");

                self.set_state(SupervisorState::Streaming {
                    remote: remote.clone(),
                });
                self.stream(&client, reader).await
            }
            .instrument(info_span!("connection", remote = %remote))
            .await;

            client.close().await;

            match end {
                StreamEnd::Shutdown => {
                    info!(remote = %remote, "Disconnected on shutdown");
                    return Ok(());
                }
                StreamEnd::Closed => info!(remote = %remote, "Server closed the connection"),
                StreamEnd::Failed(reason) => {
                    warn!(remote = %remote, error = %reason, "Connection lost")
                }
            }

            self.set_state(SupervisorState::Reconnecting { previous: remote });
        }
    }

    /// Opens a connection, retrying transient failures per the backoff
    /// policy. Returns `None` on shutdown.
    async fn connect_with_backoff(&self) -> RuntimeResult<Option<Connection>> {
        let backoff = self.settings.backoff;
        let server = self.connector.target();
        let mut attempt = 1;

        loop {
            self.set_state(SupervisorState::Connecting { attempt });
            info!(server = %server, attempt, "Connecting");

            let result = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Ok(None),
                result = self.connector.connect() => result,
            };

            let error = match result {
                Ok(conn) => {
                    info!(remote = %conn.remote, attempt, "Connected");
                    return Ok(Some(conn));
                }
                Err(e) if e.is_config() => return Err(e.into()),
                Err(e) => e,
            };

            if !backoff.allows(attempt + 1) {
                return Err(RuntimeError::RetriesExhausted {
                    attempts: attempt,
                    last: error,
                });
            }

            let delay = backoff.delay_after(attempt);
            warn!(server = %server, attempt, delay = ?delay, error = %error, "Connection failed, retrying");

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Ok(None),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    /// Reads lines until the connection ends or shutdown is requested.
    async fn stream(&self, client: &Client, reader: BoxedReader) -> StreamEnd {
        let mut lines = FramedRead::new(reader, LineCodec::new());

        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return StreamEnd::Shutdown,
                next = lines.next() => next,
            };

            match next {
                Some(Ok(line)) => {
                    if self.settings.verbose {
                        debug!(target: WIRE_TARGET, line = %line, "Received");
                    }
                    client.dispatch(&line).await;
                }
                Some(Err(e)) => return StreamEnd::Failed(e.to_string()),
                None => return StreamEnd::Closed,
            }
        }
    }

    fn set_state(&self, state: SupervisorState) {
        debug!(state = ?state, "Supervisor state changed");
        self.state.send_replace(state);
    }
}
