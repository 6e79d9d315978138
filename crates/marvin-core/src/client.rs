//! The per-connection client.
//!
//! A [`Client`] owns the write half of one transport, the frozen
//! [`HookRegistry`] and the [`Session`] for that connection. It is cheap to
//! clone; every clone refers to the same connection. The supervisor builds a new
//! one for each connection and never reuses an old one.
//!
//! # Dispatch
//!
//! [`Client::dispatch`] decodes one line and then:
//!
//! 1. runs the built-in hooks for the command inline (keep-alive and session
//!    bookkeeping), so they observe lines in wire order and `PING` is answered
//!    before anything else happens;
//! 2. spawns every registered hook for the command as its own task.
//!
//! Spawned hooks report their outcome on the report channel handed to
//! [`Client::new`]. The read loop never waits for them.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, trace, warn};

use crate::error::{ClientError, ClientResult};
use crate::irc_write;
use crate::message::Message;
use crate::registry::{BoxError, HookRegistry, HookResult};
use crate::session::Session;

/// Type-erased write half of a transport.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Sender half of the hook report channel.
pub type ReportSender = mpsc::UnboundedSender<HookReport>;

/// Receiver half of the hook report channel.
pub type ReportReceiver = mpsc::UnboundedReceiver<HookReport>;

/// Rejected nicknames tolerated before registration gives up on `433`.
const MAX_NICK_ATTEMPTS: u32 = 8;

/// Attempts that append `_` before switching to a numeric suffix.
const UNDERSCORE_ATTEMPTS: u32 = 3;

/// Outcome of one hook invocation.
#[derive(Debug)]
pub struct HookReport {
    /// Command the hook was registered for.
    pub command: String,
    /// What the hook returned. Panics are converted into errors.
    pub outcome: HookResult,
}

/// Identity presented to the server during the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Requested nickname.
    pub nickname: String,
    /// Username (ident) sent with `USER`.
    pub username: String,
    /// Free-form real name sent with `USER`.
    pub realname: String,
}

impl Identity {
    /// Creates an identity whose username equals the nickname.
    pub fn new(nickname: impl Into<String>, realname: impl Into<String>) -> Self {
        let nickname = nickname.into();
        Self {
            username: nickname.clone(),
            nickname,
            realname: realname.into(),
        }
    }
}

struct ClientInner {
    writer: Mutex<Option<BoxedWriter>>,
    hooks: HookRegistry,
    session: Session,
    reports: ReportSender,
}

/// Handle to one live connection.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Creates a client writing to `writer`.
    ///
    /// `nickname` seeds the session and should match the nickname sent in the
    /// handshake.
    pub fn new<W>(writer: W, nickname: &str, hooks: HookRegistry, reports: ReportSender) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            inner: Arc::new(ClientInner {
                writer: Mutex::new(Some(Box::new(writer))),
                hooks,
                session: Session::new(nickname),
                reports,
            }),
        }
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Writes one encoded line to the transport.
    ///
    /// Build `line` with [`encode!`](crate::encode!), or use
    /// [`irc_write!`](crate::irc_write!) which does both. The whole line is
    /// written under the writer lock, so concurrent writers never interleave.
    pub async fn write(&self, line: Vec<u8>) -> ClientResult<()> {
        let mut guard = self.inner.writer.lock().await;
        let writer = guard.as_mut().ok_or(ClientError::Closed)?;
        writer.write_all(&line).await?;
        writer.flush().await?;

        trace!(
            target: "marvin::wire",
            line = %String::from_utf8_lossy(&line).trim_end(),
            "Sent"
        );
        Ok(())
    }

    /// Sends the `USER` and `NICK` registration commands.
    ///
    /// Does not wait for the server's answer.
    pub async fn handshake(&self, identity: &Identity, server_host: &str) -> ClientResult<()> {
        irc_write!(
            self,
            "USER {} {} * :{}",
            identity.username,
            server_host,
            identity.realname
        )
        .await?;
        irc_write!(self, "NICK {}", identity.nickname).await
    }

    /// Shuts down and drops the write half. Later writes fail with
    /// [`ClientError::Closed`].
    pub async fn close(&self) {
        let writer = self.inner.writer.lock().await.take();
        if let Some(mut writer) = writer
            && let Err(e) = writer.shutdown().await
        {
            debug!(error = %e, "Error while shutting down writer");
        }
    }

    /// Returns `true` once [`close`](Self::close) has run.
    pub async fn is_closed(&self) -> bool {
        self.inner.writer.lock().await.is_none()
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Feeds one inbound line through the built-in hooks and every matching
    /// registered hook.
    ///
    /// Returns once the built-ins are done and the registered hooks have been
    /// spawned; their results arrive later on the report channel.
    pub async fn dispatch(&self, line: &str) {
        let msg = Arc::new(Message::decode(line));
        if msg.is_empty() {
            return;
        }

        if let Err(e) = self.run_builtin(&msg).await {
            self.report(&msg.command, Err(e.into()));
        }

        for hook in self.inner.hooks.lookup(&msg.command) {
            let hook = Arc::clone(hook);
            let client = self.clone();
            let msg = Arc::clone(&msg);

            tokio::spawn(async move {
                let command = msg.command.clone();
                let outcome = AssertUnwindSafe(hook.call(client.clone(), msg))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(panic_error(panic)));
                client.report(&command, outcome);
            });
        }
    }

    fn report(&self, command: &str, outcome: HookResult) {
        let report = HookReport {
            command: command.to_string(),
            outcome,
        };
        if self.inner.reports.send(report).is_err() {
            warn!(command = %command, "Hook report dropped, no reporter running");
        }
    }

    async fn run_builtin(&self, msg: &Message) -> ClientResult<()> {
        let session = &self.inner.session;
        let from_self = session.is_self(&msg.sender.name);

        match msg.command.as_str() {
            "ping" => irc_write!(self, "PONG {}", msg.data).await?,
            "join" if from_self => {
                let channel = msg.channel();
                if session.join(channel) {
                    debug!(channel = %channel, "Joined channel");
                }
            }
            "part" if from_self => {
                let channel = msg.channel();
                if session.part(channel) {
                    debug!(channel = %channel, "Left channel");
                }
            }
            "kick" => {
                let kicked = msg.params().nth(1).unwrap_or(msg.data.as_str());
                if session.is_self(kicked) {
                    let channel = msg.channel();
                    session.part(channel);
                    warn!(channel = %channel, by = %msg.sender.name, "Kicked from channel");
                }
            }
            "quit" if from_self => session.clear(),
            "nick" if from_self => {
                let nickname = msg.data.split_whitespace().next().unwrap_or("");
                if !nickname.is_empty() {
                    debug!(from = %msg.sender.name, to = %nickname, "Nickname changed");
                    session.set_nickname(nickname);
                }
            }
            "001" => {
                if let Some(nickname) = msg.params().next() {
                    session.set_nickname(nickname);
                }
                session.set_registered();
                debug!(nickname = %session.nickname(), "Registration accepted");
            }
            "433" if !session.is_registered() => {
                let taken = msg
                    .params()
                    .nth(1)
                    .map(str::to_string)
                    .unwrap_or_else(|| session.nickname());
                let attempt = session.next_nick_attempt();
                if attempt > MAX_NICK_ATTEMPTS {
                    error!(taken = %taken, attempts = MAX_NICK_ATTEMPTS, "No free nickname found, giving up");
                    return Ok(());
                }
                let nickname = alternative_nickname(&taken, attempt);
                warn!(taken = %taken, retry = %nickname, attempt, "Nickname in use");
                session.set_nickname(nickname.as_str());
                irc_write!(self, "NICK {}", nickname).await?;
            }
            _ => {}
        }

        Ok(())
    }

    // =========================================================================
    // Session views
    // =========================================================================

    /// Returns `true` if the client believes it is in `channel`.
    pub fn connected(&self, channel: &str) -> bool {
        self.inner.session.is_member(channel)
    }

    /// Joined channels in sorted order.
    pub fn channels(&self) -> Vec<String> {
        self.inner.session.channels()
    }

    /// Current nickname.
    pub fn nickname(&self) -> String {
        self.inner.session.nickname()
    }

    /// Whether the server has accepted our registration.
    pub fn is_registered(&self) -> bool {
        self.inner.session.is_registered()
    }

}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("session", &self.inner.session)
            .field("hooks", &self.inner.hooks)
            .finish()
    }
}

fn panic_error(panic: Box<dyn Any + Send>) -> BoxError {
    let reason = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("hook panicked: {reason}").into()
}

/// Picks the nickname to try after `taken` was refused.
///
/// Early attempts append `_`. Later ones replace the tail with the attempt
/// number, keeping the length, so a server that truncates long nicknames
/// still sees a new name each time.
fn alternative_nickname(taken: &str, attempt: u32) -> String {
    if attempt <= UNDERSCORE_ATTEMPTS {
        return format!("{taken}_");
    }
    let suffix = attempt.to_string();
    let keep = taken.chars().count().saturating_sub(suffix.len()).max(1);
    let stem: String = taken.chars().take(keep).collect();
    format!("{stem}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream, Lines, duplex};

    struct Harness {
        client: Client,
        wire: Lines<BufReader<DuplexStream>>,
        reports: ReportReceiver,
    }

    impl Harness {
        fn new(hooks: HookRegistry) -> Self {
            let (ours, theirs) = duplex(4096);
            let (tx, reports) = mpsc::unbounded_channel();
            Self {
                client: Client::new(ours, "marvin", hooks, tx),
                wire: BufReader::new(theirs).lines(),
                reports,
            }
        }

        async fn sent(&mut self) -> String {
            tokio::time::timeout(Duration::from_secs(1), self.wire.next_line())
                .await
                .expect("timed out waiting for output")
                .unwrap()
                .expect("wire closed")
        }

        async fn report(&mut self) -> HookReport {
            tokio::time::timeout(Duration::from_secs(1), self.reports.recv())
                .await
                .expect("timed out waiting for report")
                .expect("report channel closed")
        }
    }

    #[tokio::test]
    async fn test_ping_is_answered_immediately() {
        let mut hooks = HookRegistry::new();
        hooks.register("ping", |_c: Client, _m: Arc<Message>| async {
            Err::<(), BoxError>("unrelated failure".into())
        });
        let mut h = Harness::new(hooks);

        h.client.dispatch("PING :abc").await;
        assert_eq!(h.sent().await, "PONG abc");
    }

    #[tokio::test]
    async fn test_handshake_sends_user_then_nick() {
        let mut h = Harness::new(HookRegistry::new());
        let identity = Identity::new("marvin", "Marvin Bot");
        h.client.handshake(&identity, "irc.example.net").await.unwrap();

        assert_eq!(h.sent().await, "USER marvin irc.example.net * :Marvin Bot");
        assert_eq!(h.sent().await, "NICK marvin");
    }

    #[tokio::test]
    async fn test_join_then_part_for_self() {
        let h = Harness::new(HookRegistry::new());
        h.client.dispatch(":marvin!bot@host JOIN #a").await;
        assert!(h.client.connected("#a"));

        h.client.dispatch(":marvin!bot@host PART #a :bye").await;
        assert!(!h.client.connected("#a"));
    }

    #[tokio::test]
    async fn test_kick_removes_channel() {
        let h = Harness::new(HookRegistry::new());
        h.client.dispatch(":marvin!bot@host JOIN #a").await;
        h.client.dispatch(":marvin!bot@host JOIN #b").await;

        h.client.dispatch(":op!o@host KICK #a marvin :reason").await;
        assert!(!h.client.connected("#a"));
        assert!(h.client.connected("#b"));

        h.client.dispatch(":op!o@host KICK #b :marvin").await;
        assert!(!h.client.connected("#b"));
    }

    #[tokio::test]
    async fn test_kick_of_someone_else_is_ignored() {
        let h = Harness::new(HookRegistry::new());
        h.client.dispatch(":marvin!bot@host JOIN #a").await;
        h.client.dispatch(":op!o@host KICK #a alice :reason").await;
        assert!(h.client.connected("#a"));
    }

    #[tokio::test]
    async fn test_self_quit_clears_channels() {
        let h = Harness::new(HookRegistry::new());
        h.client.dispatch(":marvin!bot@host JOIN #a").await;
        h.client.dispatch(":marvin!bot@host JOIN #b").await;
        h.client.dispatch(":marvin!bot@host QUIT :gone").await;
        assert!(h.client.channels().is_empty());
    }

    #[tokio::test]
    async fn test_other_nicknames_never_change_membership() {
        let h = Harness::new(HookRegistry::new());
        h.client.dispatch(":alice!a@host JOIN #a").await;
        assert!(!h.client.connected("#a"));

        h.client.dispatch(":marvin!bot@host JOIN #a").await;
        h.client.dispatch(":alice!a@host PART #a").await;
        h.client.dispatch(":alice!a@host QUIT :bye").await;
        assert_eq!(h.client.channels(), vec!["#a".to_string()]);
    }

    #[tokio::test]
    async fn test_nick_change_keeps_bookkeeping_working() {
        let h = Harness::new(HookRegistry::new());
        h.client.dispatch(":marvin!bot@host NICK :marvin2").await;
        assert_eq!(h.client.nickname(), "marvin2");

        h.client.dispatch(":marvin2!bot@host JOIN #a").await;
        assert!(h.client.connected("#a"));
    }

    #[tokio::test]
    async fn test_welcome_records_registered_nickname() {
        let h = Harness::new(HookRegistry::new());
        assert!(!h.client.is_registered());
        h.client.dispatch(":irc.example.net 001 marvin_ :Welcome").await;
        assert!(h.client.is_registered());
        assert_eq!(h.client.nickname(), "marvin_");
    }

    #[tokio::test]
    async fn test_nickname_in_use_retries_with_suffix() {
        let mut h = Harness::new(HookRegistry::new());
        h.client
            .dispatch(":irc.example.net 433 * marvin :Nickname is already in use")
            .await;
        assert_eq!(h.sent().await, "NICK marvin_");
        assert_eq!(h.client.nickname(), "marvin_");

        h.client.dispatch(":irc.example.net 001 marvin_ :Welcome").await;
        h.client
            .dispatch(":irc.example.net 433 marvin_ other :Nickname is already in use")
            .await;
        assert_eq!(h.client.nickname(), "marvin_");
    }

    #[test]
    fn test_alternative_nickname() {
        assert_eq!(alternative_nickname("marvin", 1), "marvin_");
        assert_eq!(alternative_nickname("marvin_", 3), "marvin__");
        assert_eq!(alternative_nickname("marvinbot", 4), "marvinbo4");
        assert_eq!(alternative_nickname("m", 12), "m12");
    }

    #[tokio::test]
    async fn test_nickname_retries_are_bounded() {
        let mut h = Harness::new(HookRegistry::new());
        // The server truncates every attempt back to the same nine characters.
        let refused = ":irc.example.net 433 * marvinbot :Nickname is already in use";

        for _ in 0..UNDERSCORE_ATTEMPTS {
            h.client.dispatch(refused).await;
            assert_eq!(h.sent().await, "NICK marvinbot_");
        }
        for attempt in UNDERSCORE_ATTEMPTS + 1..=MAX_NICK_ATTEMPTS {
            h.client.dispatch(refused).await;
            assert_eq!(h.sent().await, format!("NICK marvinbo{attempt}"));
        }

        h.client.dispatch(refused).await;
        h.client.dispatch("PING :still-here").await;
        assert_eq!(h.sent().await, "PONG still-here");
    }

    #[tokio::test]
    async fn test_dispatch_fans_out_and_isolates_errors() {
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let mut hooks = HookRegistry::new();
        hooks.register("privmsg", |_c: Client, _m: Arc<Message>| async {
            Err::<(), BoxError>("boom".into())
        });
        hooks.register("privmsg", move |_c: Client, m: Arc<Message>| {
            let seen_tx = seen_tx.clone();
            async move {
                let _ = seen_tx.send(m.data.clone());
                Ok::<(), BoxError>(())
            }
        });
        let mut h = Harness::new(hooks);

        h.client.dispatch(":alice!a@host PRIVMSG #a :hello").await;

        assert_eq!(seen_rx.recv().await.as_deref(), Some("hello"));
        let first = h.report().await;
        let second = h.report().await;
        let errors: Vec<_> = [first, second]
            .into_iter()
            .filter_map(|r| r.outcome.err().map(|e| e.to_string()))
            .collect();
        assert_eq!(errors, vec!["boom".to_string()]);
    }

    #[tokio::test]
    async fn test_panicking_hook_is_reported() {
        let mut hooks = HookRegistry::new();
        hooks.register("privmsg", |_c: Client, _m: Arc<Message>| async {
            if true {
                panic!("kaboom");
            }
            Ok::<(), BoxError>(())
        });
        let mut h = Harness::new(hooks);

        h.client.dispatch(":alice!a@host PRIVMSG #a :hi").await;
        let report = h.report().await;
        assert_eq!(report.command, "privmsg");
        assert!(report.outcome.unwrap_err().to_string().contains("kaboom"));
    }

    #[tokio::test]
    async fn test_slow_hook_does_not_block_dispatch() {
        let mut hooks = HookRegistry::new();
        hooks.register("privmsg", |_c: Client, _m: Arc<Message>| async {
            futures::future::pending::<()>().await;
            Ok::<(), BoxError>(())
        });
        let mut h = Harness::new(hooks);

        h.client.dispatch(":alice!a@host PRIVMSG #a :hi").await;
        h.client.dispatch("PING :still-alive").await;
        assert_eq!(h.sent().await, "PONG still-alive");
    }

    #[tokio::test]
    async fn test_hooks_can_write_back() {
        async fn echo(client: Client, msg: Arc<Message>) -> HookResult {
            irc_write!(client, "PRIVMSG {} :{}", msg.receiver, msg.data).await?;
            Ok(())
        }

        let mut hooks = HookRegistry::new();
        hooks.register("privmsg", echo);
        let mut h = Harness::new(hooks);

        h.client.dispatch(":alice!a@host PRIVMSG #a :hi there").await;
        assert_eq!(h.sent().await, "PRIVMSG #a :hi there");
        assert!(h.report().await.outcome.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_line_matches_nothing() {
        let mut hooks = HookRegistry::new();
        hooks.register("", |_c: Client, _m: Arc<Message>| async {
            Err::<(), BoxError>("should not run".into())
        });
        let mut h = Harness::new(hooks);

        h.client.dispatch("PING").await;
        h.client.dispatch("").await;
        assert!(h.reports.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let h = Harness::new(HookRegistry::new());
        h.client.close().await;
        assert!(h.client.is_closed().await);

        let err = irc_write!(h.client, "PRIVMSG {} :{}", "#a", "late")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Closed));
    }
}
