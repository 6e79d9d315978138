//! Rejoins a channel after being kicked from it.

use std::sync::Arc;
use std::time::Duration;

use marvin_core::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Configuration for [`Rejoin`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RejoinConfig {
    /// Pause before rejoining.
    #[serde(with = "crate::duration::as_string")]
    pub timeout: Duration,
}

impl Default for RejoinConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
        }
    }
}

/// Sends `JOIN <channel>` a little while after we were kicked from it.
#[derive(Debug, Default)]
pub struct Rejoin {
    config: RejoinConfig,
}

impl Rejoin {
    async fn on_kick(self: Arc<Self>, client: Client, msg: Arc<Message>) -> HookResult {
        let kicked = msg.params().nth(1).unwrap_or(msg.data.as_str());
        if !kicked.eq_ignore_ascii_case(&client.nickname()) {
            return Ok(());
        }

        let channel = msg.channel().to_string();
        tokio::time::sleep(self.config.timeout).await;

        info!(channel = %channel, "Rejoining after kick");
        irc_write!(client, "JOIN {}", channel).await?;
        Ok(())
    }
}

impl Module for Rejoin {
    fn name(&self) -> &str {
        "rejoin"
    }

    fn help(&self) -> &str {
        "Enables automatic reconnection on kick."
    }

    fn load(self: Arc<Self>, hooks: &mut HookRegistry) -> ModuleResult<()> {
        hooks.register("kick", move |client: Client, msg: Arc<Message>| {
            Arc::clone(&self).on_kick(client, msg)
        });
        Ok(())
    }
}

impl ConfigurableModule for Rejoin {
    type Config = RejoinConfig;

    fn key() -> &'static str {
        "rejoin"
    }

    fn from_config(config: Self::Config) -> ModuleResult<Self> {
        Ok(Self { config })
    }
}
