//! Command-keyed hook registry.
//!
//! Modules register their hooks during a single-threaded setup phase; the
//! registry is then frozen inside the [`Client`](crate::Client) and only read.
//!
//! ```rust,ignore
//! async fn pong(client: Client, msg: Arc<Message>) -> HookResult {
//!     if msg.data == "!ping" {
//!         irc_write!(client, "NOTICE {} :pong", msg.receiver).await?;
//!     }
//!     Ok(())
//! }
//!
//! let mut hooks = HookRegistry::new();
//! hooks.register("privmsg", pong);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::client::Client;
use crate::message::Message;

/// Boxed error returned by hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by hooks.
pub type HookResult = Result<(), BoxError>;

/// A function reacting to one decoded message.
///
/// Implemented for every `Fn(Client, Arc<Message>) -> impl Future<Output = HookResult>`
/// closure, so most hooks are plain async closures or functions.
pub trait Hook: Send + Sync + 'static {
    /// Runs the hook for one message.
    fn call(&self, client: Client, msg: Arc<Message>) -> BoxFuture<'static, HookResult>;
}

impl<F, Fut> Hook for F
where
    F: Fn(Client, Arc<Message>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult> + Send + 'static,
{
    fn call(&self, client: Client, msg: Arc<Message>) -> BoxFuture<'static, HookResult> {
        Box::pin(self(client, msg))
    }
}

/// Shared, type-erased hook.
pub type BoxedHook = Arc<dyn Hook>;

/// Mapping from lowercase command name to the hooks registered for it.
#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: HashMap<String, Vec<BoxedHook>>,
}

impl HookRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a hook for `command`.
    ///
    /// Commands are stored lowercase, matching what [`Message::decode`] produces.
    pub fn register<H: Hook>(&mut self, command: &str, hook: H) {
        self.register_boxed(command, Arc::new(hook));
    }

    /// Appends an already shared hook for `command`.
    pub fn register_boxed(&mut self, command: &str, hook: BoxedHook) {
        self.hooks
            .entry(command.to_lowercase())
            .or_default()
            .push(hook);
    }

    /// Returns the hooks for `command` in registration order.
    pub fn lookup(&self, command: &str) -> &[BoxedHook] {
        self.hooks.get(command).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the number of registered hooks across all commands.
    pub fn len(&self) -> usize {
        self.hooks.values().map(Vec::len).sum()
    }

    /// Returns `true` if no hook is registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Returns the commands that have at least one hook, sorted.
    pub fn commands(&self) -> Vec<&str> {
        let mut commands: Vec<&str> = self.hooks.keys().map(String::as_str).collect();
        commands.sort_unstable();
        commands
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<_> = self
            .hooks
            .iter()
            .map(|(command, hooks)| (command.as_str(), hooks.len()))
            .collect();
        counts.sort_unstable();
        f.debug_struct("HookRegistry")
            .field("hooks", &counts)
            .finish()
    }
}
