//! Configuration loader using figment.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Config file (`marvin.toml` in the search paths, or an explicit file)
//! 3. Environment variables (`MARVIN_*`)
//! 4. Programmatic overrides (command line flags)
//!
//! # Environment Variable Mapping
//!
//! Environment variables are mapped using the `MARVIN_` prefix with `__` as separator:
//!
//! - `MARVIN_SERVER__HOST=irc.libera.chat` → `server.host = "irc.libera.chat"`
//! - `MARVIN_RECONNECT__MAX_ATTEMPTS=10` → `reconnect.max_attempts = 10`
//! - `MARVIN_MODULES__NICKSERV__PASSWORD=xxx` → `modules.nickserv.password = "xxx"`
//!
//! # Example
//!
//! ```rust,ignore
//! use marvin_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./marvin.toml")
//!     .set("identity.nickname", "marvin2")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::Serialize;
use tracing::{debug, info, trace};

use super::error::{ConfigError, ConfigResult};
use super::schema::MarvinConfig;

/// Base name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "marvin.toml";

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Search paths for configuration files.
    search_paths: Vec<PathBuf>,
    /// Whether to load environment variables.
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
    /// Overrides merged after everything else.
    overrides: Figment,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
            overrides: Figment::new(),
        }
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds current directory to search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.search_path(cwd)
        } else {
            self
        }
    }

    /// Adds the user config directory (`$XDG_CONFIG_HOME/marvin`) to search paths.
    pub fn with_user_config_dir(self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.search_path(config_dir.join("marvin"))
        } else {
            self
        }
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Overrides a single value by dotted key, e.g. `server.port`.
    ///
    /// Overrides win over the file and the environment.
    pub fn set<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.overrides = self.overrides.merge(Serialized::default(key, value));
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<MarvinConfig> {
        let figment = self.build_figment()?;
        let config: MarvinConfig = figment.extract()?;

        debug!(
            host = %config.server.host,
            port = config.server.port,
            nickname = %config.identity.nickname,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Builds the figment instance with all sources.
    fn build_figment(self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(MarvinConfig::default()));

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                return Err(ConfigError::UnsupportedFormat(path.clone()));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = figment.merge(Toml::file(path));
        } else if let Some(path) = self.find_config_file() {
            info!(path = %path.display(), "Loading configuration file");
            figment = figment.merge(Toml::file(path));
        } else {
            debug!("No configuration file found, using defaults");
        }

        if self.load_env {
            trace!("Loading environment variables with MARVIN_ prefix");
            figment = figment.merge(Env::prefixed("MARVIN_").split("__"));
        }

        Ok(figment.merge(self.overrides))
    }

    /// Resolves the effective list of search paths.
    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            let mut paths = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                paths.push(cwd);
            }
            if let Some(config_dir) = dirs::config_dir() {
                paths.push(config_dir.join("marvin"));
            }
            paths
        } else {
            self.search_paths.clone()
        }
    }

    /// First `marvin.toml` found in the search paths.
    fn find_config_file(&self) -> Option<PathBuf> {
        self.resolve_search_paths()
            .into_iter()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|path| path.exists())
    }
}

/// Loads configuration from the default locations and the environment.
pub fn load_config() -> ConfigResult<MarvinConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path` plus the environment.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<MarvinConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================
