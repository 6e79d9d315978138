//! Joins the configured channels once the server has accepted us.

use std::sync::Arc;
use std::time::Duration;

use marvin_core::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Configuration for [`Autojoin`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutojoinConfig {
    /// Channels to join.
    pub channels: Vec<String>,

    /// Pause between the welcome reply and the `JOIN`.
    #[serde(with = "crate::duration::as_string")]
    pub delay: Duration,
}

impl Default for AutojoinConfig {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            delay: Duration::from_secs(3),
        }
    }
}

/// Sends one `JOIN` for every configured channel after `001`.
#[derive(Debug)]
pub struct Autojoin {
    config: AutojoinConfig,
}

impl Autojoin {
    /// Creates the module.
    pub fn new(config: AutojoinConfig) -> Self {
        Self { config }
    }

    /// Channels this module joins.
    pub fn channels(&self) -> &[String] {
        &self.config.channels
    }

    async fn on_welcome(self: Arc<Self>, client: Client, _msg: Arc<Message>) -> HookResult {
        if self.config.channels.is_empty() {
            return Ok(());
        }

        tokio::time::sleep(self.config.delay).await;

        let channels = self.config.channels.join(",");
        info!(channels = %channels, "Joining channels");
        irc_write!(client, "JOIN {}", channels).await?;
        Ok(())
    }
}

impl Module for Autojoin {
    fn name(&self) -> &str {
        "autojoin"
    }

    fn help(&self) -> &str {
        "Joins the configured channels after connecting."
    }

    fn load(self: Arc<Self>, hooks: &mut HookRegistry) -> ModuleResult<()> {
        hooks.register("001", move |client: Client, msg: Arc<Message>| {
            Arc::clone(&self).on_welcome(client, msg)
        });
        Ok(())
    }
}

impl ConfigurableModule for Autojoin {
    type Config = AutojoinConfig;

    fn key() -> &'static str {
        "autojoin"
    }

    fn from_config(config: Self::Config) -> ModuleResult<Self> {
        if let Some(bad) = config.channels.iter().find(|c| c.trim().is_empty()) {
            return Err(ModuleError::config(
                Self::key(),
                format!("invalid channel name {bad:?}"),
            ));
        }
        Ok(Self::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;

    fn autojoin(channels: &[&str]) -> Autojoin {
        Autojoin::new(AutojoinConfig {
            channels: channels.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_joins_all_channels_after_delay() {
        let mut h = Harness::load(autojoin(&["#a", "#b"]));
        let start = tokio::time::Instant::now();

        h.feed(":irc.example.net 001 marvin :Welcome").await;
        assert_eq!(h.next_line().await, "JOIN #a,#b");
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert!(h.next_report().await.outcome.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_channels_no_join() {
        let mut h = Harness::load(autojoin(&[]));
        h.feed(":irc.example.net 001 marvin :Welcome").await;
        assert!(h.next_report().await.outcome.is_ok());
        h.assert_silent().await;
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config: AutojoinConfig = serde_json::from_str(r##"{"channels":["#x"]}"##).unwrap();
        assert_eq!(config.delay, Duration::from_secs(3));

        let blank = AutojoinConfig {
            channels: vec![" ".into()],
            ..Default::default()
        };
        assert!(Autojoin::from_config(blank).is_err());
    }
}
