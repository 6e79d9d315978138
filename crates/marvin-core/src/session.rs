//! Per-connection session state.
//!
//! All mutation goes through the built-in hooks, which the read loop runs
//! inline in wire order, so writes are naturally serialized. User hooks only
//! read, concurrently, through the [`Client`](crate::Client) accessors.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::RwLock;

/// The client's view of its own nickname and channel memberships.
#[derive(Debug)]
pub struct Session {
    nickname: RwLock<String>,
    channels: RwLock<BTreeSet<String>>,
    registered: AtomicBool,
    nick_attempts: AtomicU32,
}

impl Session {
    /// Creates a session for the nickname sent during the handshake.
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            nickname: RwLock::new(nickname.into()),
            channels: RwLock::new(BTreeSet::new()),
            registered: AtomicBool::new(false),
            nick_attempts: AtomicU32::new(0),
        }
    }

    /// Current nickname.
    pub fn nickname(&self) -> String {
        self.nickname.read().clone()
    }

    /// Replaces the nickname.
    pub fn set_nickname(&self, nickname: impl Into<String>) {
        *self.nickname.write() = nickname.into();
    }

    /// Returns `true` if `name` is our own nickname.
    ///
    /// Nicknames compare ASCII case-insensitively.
    pub fn is_self(&self, name: &str) -> bool {
        !name.is_empty() && self.nickname.read().eq_ignore_ascii_case(name)
    }

    /// Joined channels in sorted order.
    pub fn channels(&self) -> Vec<String> {
        self.channels.read().iter().cloned().collect()
    }

    /// Returns `true` if the channel is in the joined set.
    pub fn is_member(&self, channel: &str) -> bool {
        self.channels.read().contains(channel)
    }

    /// Adds a channel. Returns `false` if it was already present.
    pub fn join(&self, channel: &str) -> bool {
        !channel.is_empty() && self.channels.write().insert(channel.to_string())
    }

    /// Removes a channel. Returns `false` if it was not present.
    pub fn part(&self, channel: &str) -> bool {
        self.channels.write().remove(channel)
    }

    /// Forgets every channel.
    pub fn clear(&self) {
        self.channels.write().clear();
    }

    /// Whether the server has accepted our registration (`001` seen).
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    pub(crate) fn set_registered(&self) {
        self.registered.store(true, Ordering::Release);
    }

    /// Counts one more rejected nickname and returns the new count.
    pub(crate) fn next_nick_attempt(&self) -> u32 {
        self.nick_attempts.fetch_add(1, Ordering::AcqRel).saturating_add(1)
    }
}
