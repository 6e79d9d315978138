//! `!remind DURATION MSG`: sends a message back after a while.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use marvin_core::prelude::*;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::duration::{format_duration, parse_duration};

/// Configuration for [`Remind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemindConfig {
    /// Longest accepted reminder, in hours.
    pub time_limit: u64,
    /// Pending reminders allowed per user host.
    pub user_limit: usize,
}

impl Default for RemindConfig {
    fn default() -> Self {
        Self {
            time_limit: 10,
            user_limit: 3,
        }
    }
}

/// Delivers reminders by private message.
///
/// Pending reminder counts are kept per sender host and survive reconnects.
#[derive(Debug, Default)]
pub struct Remind {
    config: RemindConfig,
    pending: Arc<Mutex<HashMap<String, usize>>>,
}

/// One pending reminder slot, released on drop.
struct Slot {
    pending: Arc<Mutex<HashMap<String, usize>>>,
    host: String,
}

impl Drop for Slot {
    fn drop(&mut self) {
        let mut pending = self.pending.lock();
        if let Some(count) = pending.get_mut(&self.host) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                pending.remove(&self.host);
            }
        }
    }
}

impl Remind {
    /// Number of reminders currently pending for `host`.
    pub fn pending(&self, host: &str) -> usize {
        self.pending.lock().get(host).copied().unwrap_or(0)
    }

    /// Longest accepted reminder.
    fn limit(&self) -> Duration {
        Duration::from_secs(self.config.time_limit.saturating_mul(3600))
    }

    fn try_reserve(&self, host: &str) -> Option<Slot> {
        let mut pending = self.pending.lock();
        let count = pending.entry(host.to_string()).or_default();
        if *count >= self.config.user_limit {
            return None;
        }
        *count += 1;
        Some(Slot {
            pending: Arc::clone(&self.pending),
            host: host.to_string(),
        })
    }

    async fn on_privmsg(self: Arc<Self>, client: Client, msg: Arc<Message>) -> HookResult {
        let mut fields = msg.data.split_whitespace();
        if fields.next() != Some("!remind") {
            return Ok(());
        }
        let Some(raw) = fields.next() else {
            return Ok(());
        };
        let reminder = fields.collect::<Vec<_>>().join(" ");
        if reminder.is_empty() {
            return Ok(());
        }

        let duration = parse_duration(raw)?;
        let target = msg.reply_target(&client.nickname()).to_string();

        if duration > self.limit() {
            irc_write!(
                client,
                "NOTICE {} :{} hours exceeds the limit of {} hours",
                target,
                duration.as_secs_f64() / 3600.0,
                self.config.time_limit
            )
            .await?;
            return Ok(());
        }

        let Some(_slot) = self.try_reserve(&msg.sender.host) else {
            irc_write!(
                client,
                "NOTICE {} :You can only run {} reminders at a time",
                target,
                self.config.user_limit
            )
            .await?;
            return Ok(());
        };

        irc_write!(
            client,
            "NOTICE {} :Reminder setup for {}",
            target,
            format_duration(duration)
        )
        .await?;
        debug!(sender = %msg.sender, after = ?duration, "Reminder scheduled");

        tokio::time::sleep(duration).await;
        irc_write!(client, "PRIVMSG {} :Reminder: {}", msg.sender.name, reminder).await?;
        Ok(())
    }
}

impl Module for Remind {
    fn name(&self) -> &str {
        "remind"
    }

    fn help(&self) -> &str {
        "USAGE: !remind DURATION MSG"
    }

    fn load(self: Arc<Self>, hooks: &mut HookRegistry) -> ModuleResult<()> {
        hooks.register("privmsg", move |client: Client, msg: Arc<Message>| {
            Arc::clone(&self).on_privmsg(client, msg)
        });
        Ok(())
    }
}

impl ConfigurableModule for Remind {
    type Config = RemindConfig;

    fn key() -> &'static str {
        "remind"
    }

    fn from_config(config: Self::Config) -> ModuleResult<Self> {
        if config.user_limit == 0 {
            return Err(ModuleError::config(Self::key(), "user_limit must be at least 1"));
        }
        Ok(Self {
            config,
            pending: Arc::default(),
        })
    }
}
