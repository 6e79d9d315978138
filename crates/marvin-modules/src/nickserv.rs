//! Identifies with NickServ when asked to.

use std::sync::Arc;

use marvin_core::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Configuration for [`NickServ`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NickServConfig {
    /// Nickname of the services bot.
    pub nickserv: String,
    /// Account password. The module does nothing while this is empty.
    pub password: String,
    /// Text in the service's notice that triggers identification.
    pub keyword: String,
}

impl Default for NickServConfig {
    fn default() -> Self {
        Self {
            nickserv: "NickServ".to_string(),
            password: String::new(),
            keyword: "identify".to_string(),
        }
    }
}

/// Answers NickServ's identification request with the configured password.
#[derive(Default)]
pub struct NickServ {
    config: NickServConfig,
}

impl std::fmt::Debug for NickServ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NickServ")
            .field("nickserv", &self.config.nickserv)
            .field("keyword", &self.config.keyword)
            .finish_non_exhaustive()
    }
}

impl NickServ {
    async fn on_notice(self: Arc<Self>, client: Client, msg: Arc<Message>) -> HookResult {
        let config = &self.config;
        if !msg.sender.name.eq_ignore_ascii_case(&config.nickserv)
            || !msg.data.contains(config.keyword.as_str())
        {
            return Ok(());
        }

        info!(service = %config.nickserv, "Identifying with services");
        irc_write!(client, "PRIVMSG {} :identify {}", config.nickserv, config.password).await?;
        Ok(())
    }
}

impl Module for NickServ {
    fn name(&self) -> &str {
        "nickserv"
    }

    fn help(&self) -> &str {
        "Enables authentication with NickServ."
    }

    fn load(self: Arc<Self>, hooks: &mut HookRegistry) -> ModuleResult<()> {
        if self.config.password.is_empty() {
            debug!("No NickServ password configured, not registering hooks");
            return Ok(());
        }

        hooks.register("notice", move |client: Client, msg: Arc<Message>| {
            Arc::clone(&self).on_notice(client, msg)
        });
        Ok(())
    }
}

impl ConfigurableModule for NickServ {
    type Config = NickServConfig;

    fn key() -> &'static str {
        "nickserv"
    }

    fn from_config(config: Self::Config) -> ModuleResult<Self> {
        if config.keyword.is_empty() {
            return Err(ModuleError::config(Self::key(), "keyword must not be empty"));
        }
        Ok(Self { config })
    }
}
