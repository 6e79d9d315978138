//! `!time`: tells the current UTC time.

use std::sync::Arc;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use marvin_core::prelude::*;
use serde::{Deserialize, Serialize};

/// RFC 1123 in `strftime` notation.
pub const RFC1123: &str = "%a, %d %b %Y %H:%M:%S UTC";

/// Configuration for [`Time`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// `strftime` format of the reply.
    pub format: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            format: RFC1123.to_string(),
        }
    }
}

/// Replies to `!time` with a `NOTICE` carrying the current UTC time.
#[derive(Debug, Default)]
pub struct Time {
    config: TimeConfig,
}

impl Time {
    /// Renders `now` with the configured format.
    pub fn render(&self, now: DateTime<Utc>) -> String {
        now.format(&self.config.format).to_string()
    }

    async fn on_privmsg(self: Arc<Self>, client: Client, msg: Arc<Message>) -> HookResult {
        if msg.data != "!time" {
            return Ok(());
        }

        let now = self.render(Utc::now());
        let target = msg.reply_target(&client.nickname()).to_string();
        irc_write!(client, "NOTICE {} :{}", target, now).await?;
        Ok(())
    }
}

impl Module for Time {
    fn name(&self) -> &str {
        "time"
    }

    fn help(&self) -> &str {
        "USAGE: !time"
    }

    fn load(self: Arc<Self>, hooks: &mut HookRegistry) -> ModuleResult<()> {
        hooks.register("privmsg", move |client: Client, msg: Arc<Message>| {
            Arc::clone(&self).on_privmsg(client, msg)
        });
        Ok(())
    }
}

impl ConfigurableModule for Time {
    type Config = TimeConfig;

    fn key() -> &'static str {
        "time"
    }

    fn from_config(config: Self::Config) -> ModuleResult<Self> {
        // Rendering an invalid format would panic later.
        if StrftimeItems::new(&config.format).any(|item| matches!(item, Item::Error)) {
            return Err(ModuleError::config(
                Self::key(),
                format!("invalid time format {:?}", config.format),
            ));
        }
        Ok(Self { config })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use chrono::TimeZone;

    #[test]
    fn test_render_rfc1123() {
        let now = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();
        assert_eq!(Time::default().render(now), "Mon, 02 Jan 2006 15:04:05 UTC");
    }

    #[test]
    fn test_custom_and_invalid_formats() {
        let iso = Time::from_config(TimeConfig {
            format: "%Y-%m-%d".into(),
        })
        .unwrap();
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap();
        assert_eq!(iso.render(now), "2024-02-29");

        let bad = TimeConfig {
            format: "%Q".into(),
        };
        assert!(Time::from_config(bad).is_err());
    }

    #[tokio::test]
    async fn test_replies_in_channel() {
        let mut h = Harness::load(Time::default());
        h.feed(":nick!u@h PRIVMSG #chan :!time").await;

        let line = h.next_line().await;
        assert!(line.starts_with("NOTICE #chan :"), "{line}");
        assert!(line.ends_with(" UTC"), "{line}");
    }

    #[tokio::test]
    async fn test_replies_to_sender_in_query() {
        let mut h = Harness::load(Time::default());
        h.feed(":nick!u@h PRIVMSG marvin :!time").await;
        assert!(h.next_line().await.starts_with("NOTICE nick :"));
    }

    #[tokio::test]
    async fn test_other_messages_ignored() {
        let mut h = Harness::load(Time::default());
        h.feed(":nick!u@h PRIVMSG #chan :what !time is it").await;
        h.next_report().await;
        h.assert_silent().await;
    }
}
