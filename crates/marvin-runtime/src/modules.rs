//! The set of loaded modules and the `!help` command.

use std::fmt;
use std::sync::Arc;

use marvin_core::prelude::*;
use marvin_core::BoxedModule;
use tracing::debug;

/// Loaded modules, in registration order.
///
/// Modules are built once at startup. For every new connection
/// [`build_registry`](Self::build_registry) asks each of them to register
/// its hooks into a fresh [`HookRegistry`] and adds the `!help` command.
#[derive(Default, Clone)]
pub struct ModuleSet {
    modules: Vec<BoxedModule>,
}

impl ModuleSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module. Names are unique.
    pub fn add<M: Module>(&mut self, module: M) -> ModuleResult<()> {
        self.add_boxed(Arc::new(module))
    }

    /// Adds an already shared module.
    pub fn add_boxed(&mut self, module: BoxedModule) -> ModuleResult<()> {
        if self.get(module.name()).is_some() {
            return Err(ModuleError::load(module.name(), "a module with this name is already loaded"));
        }
        debug!(module = %module.name(), "Module added");
        self.modules.push(module);
        Ok(())
    }

    /// Looks up a module by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&BoxedModule> {
        self.modules
            .iter()
            .find(|m| m.name().eq_ignore_ascii_case(name))
    }

    /// Module names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns `true` if no module is loaded.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Builds the hook registry for one connection.
    pub fn build_registry(&self) -> ModuleResult<HookRegistry> {
        let mut hooks = HookRegistry::new();
        for module in &self.modules {
            Arc::clone(module).load(&mut hooks)?;
        }

        let index = Arc::new(HelpIndex::new(&self.modules));
        hooks.register("privmsg", move |client: Client, msg: Arc<Message>| {
            help(Arc::clone(&index), client, msg)
        });

        debug!(hooks = hooks.len(), commands = ?hooks.commands(), "Hook registry built");
        Ok(hooks)
    }
}

impl fmt::Debug for ModuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleSet")
            .field("modules", &self.names())
            .finish()
    }
}

/// Names and help texts, snapshotted for the `!help` hook.
struct HelpIndex {
    entries: Vec<(String, String)>,
}

impl HelpIndex {
    fn new(modules: &[BoxedModule]) -> Self {
        Self {
            entries: modules
                .iter()
                .map(|m| (m.name().to_string(), m.help().to_string()))
                .collect(),
        }
    }

    fn overview(&self) -> String {
        let names: Vec<&str> = self.entries.iter().map(|(name, _)| name.as_str()).collect();
        format!("The following modules are available: {}", names.join(", "))
    }

    fn describe(&self, name: &str) -> String {
        match self.entries.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some((name, help)) => format!("{name}: {help}"),
            None => format!("Module {:?} isn't installed", name.to_lowercase()),
        }
    }
}

async fn help(index: Arc<HelpIndex>, client: Client, msg: Arc<Message>) -> HookResult {
    let mut fields = msg.data.split_whitespace();
    if fields.next() != Some("!help") {
        return Ok(());
    }

    let reply = match fields.next() {
        Some(name) => index.describe(name),
        None => index.overview(),
    };
    let target = msg.reply_target(&client.nickname()).to_string();
    irc_write!(client, "NOTICE {} :{}", target, reply).await?;
    Ok(())
}
