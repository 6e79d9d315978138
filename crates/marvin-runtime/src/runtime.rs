//! The marvin runtime.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use marvin_runtime::MarvinRuntime;
//! use marvin_modules::{Remind, Time};
//!
//! let mut runtime = MarvinRuntime::builder()
//!     .config_file("marvin.toml")
//!     .build()?;
//!
//! runtime.register_module::<Time>()?;
//! runtime.register_module::<Remind>()?;
//!
//! // Runs until Ctrl+C or SIGTERM
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use marvin_core::{ConfigurableModule, Module, ModuleError};
use marvin_modules::{Autojoin, AutojoinConfig};
use marvin_transport::{Connector, TcpConnector};

use crate::config::{ConfigLoader, MarvinConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;
use crate::modules::ModuleSet;
use crate::reporter::run_reporter;
use crate::supervisor::{Supervisor, SupervisorSettings, SupervisorState};

/// A configured bot, ready to run.
///
/// `autojoin` is always loaded; other modules are added with
/// [`register_module`](Self::register_module) before calling
/// [`run`](Self::run).
pub struct MarvinRuntime {
    config: MarvinConfig,
    modules: ModuleSet,
    state: watch::Sender<SupervisorState>,
    shutdown: CancellationToken,
}

impl MarvinRuntime {
    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration.
    ///
    /// Validates the configuration, initializes logging and loads the
    /// `autojoin` module for the configured channels.
    pub fn from_config(config: MarvinConfig) -> RuntimeResult<Self> {
        validate_config(&config)?;
        logging::init_from_config(&config.logging);

        let (state, _) = watch::channel(SupervisorState::Disconnected);
        let mut runtime = Self {
            config,
            modules: ModuleSet::new(),
            state,
            shutdown: CancellationToken::new(),
        };

        let mut autojoin: AutojoinConfig = runtime.module_config(Autojoin::key())?;
        autojoin.channels.clone_from(&runtime.config.channels);
        runtime.add_module(Autojoin::from_config(autojoin)?)?;

        info!(
            server = %runtime.config.transport().addr(),
            nickname = %runtime.config.identity.nickname,
            log_level = %runtime.config.logging.level,
            "Runtime initialized from configuration"
        );

        Ok(runtime)
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &MarvinConfig {
        &self.config
    }

    /// Returns the loaded modules.
    pub fn modules(&self) -> &ModuleSet {
        &self.modules
    }

    /// Deserializes `[modules.<key>]`, or returns the defaults if it is absent.
    fn module_config<T>(&self, key: &str) -> RuntimeResult<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.config.modules.get(key) {
            Some(value) => value
                .deserialize()
                .map_err(|e| ModuleError::config(key, e.to_string()).into()),
            None => {
                debug!(module = key, "No configuration found for module, using defaults");
                Ok(T::default())
            }
        }
    }

    /// Builds module `M` from its configuration section and loads it.
    ///
    /// ```rust,ignore
    /// runtime.register_module::<Remind>()?;
    /// ```
    pub fn register_module<M>(&mut self) -> RuntimeResult<()>
    where
        M: ConfigurableModule,
    {
        let config = self.module_config::<M::Config>(M::key())?;
        self.add_module(M::from_config(config)?)?;
        info!(module = M::key(), "Registered module");
        Ok(())
    }

    /// Loads an already constructed module.
    pub fn add_module<M: Module>(&mut self, module: M) -> RuntimeResult<()> {
        self.modules.add(module)?;
        Ok(())
    }

    /// Subscribes to connection state changes.
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    /// Token that stops the runtime when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs the bot until a shutdown signal is received.
    pub async fn run(self) -> RuntimeResult<()> {
        info!("marvin is starting. Press Ctrl+C to stop.");
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs the bot until `shutdown` completes.
    pub async fn run_until<F>(self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let connector = TcpConnector::new(self.config.transport())?;
        self.run_with(Arc::new(connector), shutdown).await
    }

    /// Runs the bot over `connector` until `shutdown` completes.
    pub async fn run_with<F>(self, connector: Arc<dyn Connector>, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        // Surface module load errors before the first connection.
        self.modules.build_registry()?;
        self.warn_unknown_module_sections();

        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_reporter(reports_rx));

        let settings = SupervisorSettings {
            identity: self.config.identity(),
            server_host: self.config.server.host.clone(),
            backoff: self.config.backoff(),
            verbose: self.config.logging.verbose,
        };

        info!(
            server = %connector.target(),
            modules = ?self.modules.names(),
            "Starting supervisor"
        );

        let token = self.shutdown;
        let supervisor = Supervisor::new(connector, self.modules, settings, reports_tx)
            .with_state(self.state)
            .with_shutdown(token.clone());

        let supervised = supervisor.run();
        tokio::pin!(supervised);
        tokio::pin!(shutdown);

        tokio::select! {
            result = &mut supervised => return result,
            _ = &mut shutdown => {
                info!("Shutdown requested");
                token.cancel();
            }
        }

        supervised.await?;
        info!("Runtime stopped");
        Ok(())
    }

    fn warn_unknown_module_sections(&self) {
        for key in self.config.modules.keys() {
            if self.modules.get(key).is_none() {
                warn!(module = %key, "Configuration section for a module that is not loaded");
            }
        }
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                wait_for_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a `MarvinRuntime` with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = MarvinRuntime::builder()
///     .config_file("/etc/marvin/marvin.toml")
///     .set("server.port", 6667)
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Searches the current working directory for `marvin.toml`.
    pub fn with_current_dir(mut self) -> Self {
        self.config_loader = self.config_loader.with_current_dir();
        self
    }

    /// Searches the user configuration directory for `marvin.toml`.
    pub fn with_user_config_dir(mut self) -> Self {
        self.config_loader = self.config_loader.with_user_config_dir();
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Overrides a single configuration value by dotted key.
    pub fn set<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.config_loader = self.config_loader.set(key, value);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> RuntimeResult<MarvinRuntime> {
        let config = self.config_loader.load()?;
        MarvinRuntime::from_config(config)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::error::RuntimeError;
    use crate::testing::{FakeServer, MockConnector};
    use figment::Figment;
    use figment::providers::{Format, Serialized, Toml};
    use marvin_modules::{Remind, Time};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn config(toml: &str) -> MarvinConfig {
        Figment::from(Serialized::defaults(MarvinConfig::default()))
            .merge(Toml::string(toml))
            .extract()
            .unwrap()
    }

    #[test]
    fn test_autojoin_always_loaded() {
        let runtime = MarvinRuntime::from_config(config(r##"channels = ["#marvin"]"##)).unwrap();
        assert_eq!(runtime.modules().names(), vec!["autojoin"]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = MarvinRuntime::from_config(MarvinConfig::default()).err().unwrap();
        assert!(matches!(
            err,
            RuntimeError::Config(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_register_module_reads_section() {
        let mut runtime = MarvinRuntime::from_config(config(
            r##"
            channels = ["#marvin"]

            [modules.time]
            format = "%Y"
            "##,
        ))
        .unwrap();

        runtime.register_module::<Time>().unwrap();
        runtime.register_module::<Remind>().unwrap();
        assert_eq!(runtime.modules().names(), vec!["autojoin", "time", "remind"]);

        assert!(runtime.register_module::<Time>().is_err());
    }

    #[test]
    fn test_malformed_module_section_fails() {
        let mut runtime = MarvinRuntime::from_config(config(
            r##"
            channels = ["#marvin"]

            [modules.remind]
            user_limit = "many"
            "##,
        ))
        .unwrap();

        let err = runtime.register_module::<Remind>().unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Module(ModuleError::Config { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connects_registers_and_joins() {
        let runtime = MarvinRuntime::from_config(config(
            r##"
            channels = ["#one", "#two"]

            [identity]
            nickname = "marvin"
            realname = "Marvin Bot"

            [server]
            host = "irc.example.net"
            "##,
        ))
        .unwrap();
        let states = runtime.subscribe();

        let (connector, mut servers) = MockConnector::failing(0);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(runtime.run_with(connector, async {
            let _ = stop_rx.await;
        }));

        let mut server = FakeServer::new(servers.recv().await.unwrap());
        server.expect("USER marvin irc.example.net * :Marvin Bot").await;
        server.expect("NICK marvin").await;

        let start = tokio::time::Instant::now();
        server.send(":irc.example.net 001 marvin :Welcome").await;
        server.expect("JOIN #one,#two").await;
        assert!(start.elapsed() >= Duration::from_secs(3));

        stop_tx.send(()).unwrap();
        task.await.unwrap().unwrap();
        assert_eq!(*states.borrow(), SupervisorState::Stopped);
    }
}
