//! The capability set every bot module implements.

use std::sync::Arc;

use crate::error::ModuleResult;
use crate::registry::HookRegistry;

/// A pluggable bot feature.
///
/// Modules are constructed once from their configuration at startup and then
/// asked to register hooks for every new connection. State a module keeps in
/// `self` therefore survives reconnects, while anything registered in the
/// [`HookRegistry`] is rebuilt each time.
///
/// # Example
///
/// ```rust,ignore
/// struct Greeter;
///
/// impl Module for Greeter {
///     fn name(&self) -> &str { "greeter" }
///     fn help(&self) -> &str { "USAGE: !hello" }
///
///     fn load(self: Arc<Self>, hooks: &mut HookRegistry) -> ModuleResult<()> {
///         hooks.register("privmsg", hello);
///         Ok(())
///     }
/// }
/// ```
pub trait Module: Send + Sync + 'static {
    /// Unique, lowercase module name. Also the config section key.
    fn name(&self) -> &str;

    /// One-line usage text shown by `!help <name>`.
    fn help(&self) -> &str;

    /// Registers the module's hooks for a freshly built client.
    fn load(self: Arc<Self>, hooks: &mut HookRegistry) -> ModuleResult<()>;
}

/// Shared, type-erased module.
pub type BoxedModule = Arc<dyn Module>;

/// A module built from its `[modules.<key>]` configuration section.
///
/// Missing sections and missing fields fall back to `Config::default()`.
pub trait ConfigurableModule: Module {
    /// The configuration type.
    type Config: serde::de::DeserializeOwned + Default;

    /// Returns the config section key.
    fn key() -> &'static str
    where
        Self: Sized;

    /// Creates the module from its deserialized configuration.
    fn from_config(config: Self::Config) -> ModuleResult<Self>
    where
        Self: Sized;
}
