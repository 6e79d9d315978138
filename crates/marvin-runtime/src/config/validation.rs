//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{IdentityConfig, LogOutput, MarvinConfig, ReconnectConfig, ServerConfig};

/// Channel name prefixes accepted in `channels`.
const CHANNEL_PREFIXES: [char; 4] = ['#', '&', '+', '!'];

/// Validates the entire configuration.
pub fn validate_config(config: &MarvinConfig) -> ConfigResult<()> {
    validate_server_config(&config.server)?;
    validate_identity_config(&config.identity)?;
    validate_channels(&config.channels)?;
    validate_reconnect_config(&config.reconnect)?;

    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    Ok(())
}

fn validate_server_config(server: &ServerConfig) -> ConfigResult<()> {
    if server.host.trim().is_empty() {
        return Err(ConfigError::missing_field("server.host"));
    }
    if server.port == 0 {
        return Err(ConfigError::InvalidPort(server.port));
    }
    if server.connect_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "Connect timeout must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_identity_config(identity: &IdentityConfig) -> ConfigResult<()> {
    if identity.nickname.is_empty() {
        return Err(ConfigError::missing_field("identity.nickname"));
    }
    if !is_word(&identity.nickname) {
        return Err(ConfigError::validation(format!(
            "Nickname {:?} must be a single word",
            identity.nickname
        )));
    }
    if let Some(username) = &identity.username
        && !is_word(username)
    {
        return Err(ConfigError::validation(format!(
            "Username {username:?} must be a single word"
        )));
    }
    Ok(())
}

fn validate_channels(channels: &[String]) -> ConfigResult<()> {
    if channels.is_empty() {
        return Err(ConfigError::validation("At least one channel is required"));
    }
    for channel in channels {
        if !channel.starts_with(CHANNEL_PREFIXES) || !is_word(channel) || channel.contains(',') {
            return Err(ConfigError::validation(format!(
                "Invalid channel name: {channel:?}"
            )));
        }
    }
    Ok(())
}

fn validate_reconnect_config(reconnect: &ReconnectConfig) -> ConfigResult<()> {
    if reconnect.base_delay_secs == 0 {
        return Err(ConfigError::validation(
            "Reconnect base delay must be greater than 0",
        ));
    }
    if reconnect.max_attempts == Some(0) {
        return Err(ConfigError::validation(
            "Reconnect max_attempts must be at least 1",
        ));
    }
    Ok(())
}

fn is_word(value: &str) -> bool {
    !value.is_empty() && !value.chars().any(|c| c.is_whitespace() || c.is_control())
}
